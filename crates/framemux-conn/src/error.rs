/// Errors raised while validating a [`Config`](crate::Config).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The read timeout must be strictly positive.
    #[error("timeout must be greater than zero")]
    InvalidTimeout,

    /// A connection needs somewhere to send its logs.
    #[error("log sink must be set")]
    InvalidLogSink,

    /// The frame size cap must be strictly positive.
    #[error("max payload size must be greater than zero")]
    InvalidMaxPayload,
}

/// Errors that can occur in connection operations.
#[derive(Debug, thiserror::Error)]
pub enum ConnError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] framemux_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] framemux_frame::FrameError),

    /// Invalid connection configuration.
    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),

    /// The connection has been shut down.
    #[error("connection is shut down")]
    Shutdown,

    /// Another thread is already running the read loop.
    #[error("read loop already running on this connection")]
    AlreadyReceiving,

    /// The consuming end of a delivery channel was dropped.
    #[error("receiver for {0} values has been dropped")]
    ReceiverClosed(&'static str),

    /// The server finished with an error; the message is passed through as-is.
    #[error("{0}")]
    Remote(String),

    /// The connection ended before the server reported completion.
    #[error("connection closed before completion was reported")]
    Disconnected,
}

pub type Result<T> = std::result::Result<T, ConnError>;
