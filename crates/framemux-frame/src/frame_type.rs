//! Built-in frame types.
//!
//! Frame types 0-2 are reserved for built-in use.
//! Frame types 3-255 are available for application-defined use.

/// Completion status from a server; the payload is an error message string,
/// empty for success.
pub const ERROR: u8 = 0;

/// Log lines forwarded between peers.
pub const LOG: u8 = 1;

/// Operating-system signals forwarded between peers.
pub const SIGNAL: u8 = 2;

/// First user-defined frame type.
pub const USER_FRAME_TYPE_START: u8 = 3;

/// Returns a human-readable name for a frame type.
pub fn frame_type_name(frame_type: u8) -> &'static str {
    match frame_type {
        ERROR => "ERROR",
        LOG => "LOG",
        SIGNAL => "SIGNAL",
        _ => "USER",
    }
}

/// Returns true if the frame type is one of the built-in types.
pub fn is_reserved(frame_type: u8) -> bool {
    frame_type < USER_FRAME_TYPE_START
}
