use std::fmt;
use std::io;

use framemux_conn::ConnError;
use framemux_frame::FrameError;
use framemux_transport::TransportError;

// Exit codes follow sysexits/coreutils conventions where one exists.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::BrokenPipe => FAILURE,
        io::ErrorKind::AddrInUse | io::ErrorKind::AddrNotAvailable => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::PayloadTooLarge { .. }
        | FrameError::InvalidMagic
        | FrameError::Encode { .. }
        | FrameError::Decode { .. } => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

pub fn conn_error(context: &str, err: ConnError) -> CliError {
    match err {
        ConnError::Transport(err) => transport_error(context, err),
        ConnError::Frame(err) => frame_error(context, err),
        ConnError::Config(_) => CliError::new(USAGE, format!("{context}: {err}")),
        ConnError::Remote(message) => {
            CliError::new(FAILURE, format!("server reported failure: {message}"))
        }
        ConnError::Shutdown | ConnError::Disconnected => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_failure_keeps_server_message() {
        let err = conn_error("wait failed", ConnError::Remote("boom".to_string()));
        assert_eq!(err.code, FAILURE);
        assert!(err.message.ends_with("boom"));
    }

    #[test]
    fn timeouts_map_to_timeout_code() {
        let err = frame_error(
            "read failed",
            FrameError::Io(io::Error::from(io::ErrorKind::TimedOut)),
        );
        assert_eq!(err.code, TIMEOUT);
    }

    #[test]
    fn bad_config_is_usage_error() {
        let err = conn_error(
            "setup failed",
            ConnError::Config(framemux_conn::ConfigError::InvalidTimeout),
        );
        assert_eq!(err.code, USAGE);
    }
}
