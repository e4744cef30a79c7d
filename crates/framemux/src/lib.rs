//! Typed, frame-type multiplexed messaging over a single socket.
//!
//! framemux carries many independent streams of serde values over one TCP
//! or Unix domain socket. Each value travels in a frame tagged with an 8-bit
//! frame type, and the receiving side routes it to whatever receiver is
//! registered for that type.
//!
//! # Crate Structure
//!
//! - [`transport`]: the connected socket handle (TCP, Unix domain sockets)
//! - [`frame`]: frame envelopes and the pluggable bincode/JSON/MessagePack codecs
//! - [`conn`]: connections, receivers and the client/server completion
//!   protocol (behind the `conn` feature)

/// Re-export transport types.
pub mod transport {
    pub use framemux_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use framemux_frame::*;
}

/// Re-export connection types (requires `conn` feature).
#[cfg(feature = "conn")]
pub mod conn {
    pub use framemux_conn::*;
}
