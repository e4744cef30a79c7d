/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The block header contains an invalid magic number.
    #[error("invalid frame magic (expected 0x464D \"FM\")")]
    InvalidMagic,

    /// The encoded envelope exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A value could not be serialized by the codec.
    #[error("{encoding} encode error: {message}")]
    Encode {
        encoding: &'static str,
        message: String,
    },

    /// Bytes could not be deserialized into the requested type.
    #[error("{encoding} decode error: {message}")]
    Decode {
        encoding: &'static str,
        message: String,
    },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

impl FrameError {
    pub(crate) fn encode(encoding: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Encode {
            encoding,
            message: err.to_string(),
        }
    }

    pub(crate) fn decode(encoding: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            encoding,
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
