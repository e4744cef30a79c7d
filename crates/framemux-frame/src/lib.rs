//! Typed frame envelopes and pluggable wire encodings.
//!
//! Every value crossing a framemux connection travels inside a [`Frame`]:
//! an 8-bit frame type that selects the receiver on the far side, and the
//! codec-encoded payload. The envelope goes through the same [`Encoding`]
//! as the payload and is wrapped in a small resumable block header:
//! - A 2-byte magic number ("FM") for stream synchronization
//! - A 4-byte little-endian envelope length
//!
//! Swapping bincode for JSON or MessagePack never touches the multiplexer.

pub mod codec;
pub mod encoding;
pub mod error;
pub mod frame_type;
pub mod reader;
pub mod writer;

pub use codec::{decode_frame, encode_frame, Frame, FrameConfig, DEFAULT_MAX_PAYLOAD, HEADER_SIZE};
#[cfg(feature = "bincode")]
pub use encoding::BincodeEncoding;
#[cfg(feature = "json")]
pub use encoding::JsonEncoding;
#[cfg(feature = "msgpack")]
pub use encoding::MsgPackEncoding;
pub use encoding::{BufferDecoder, BufferEncoder, Encoding};
pub use error::{FrameError, Result};
pub use frame_type::{ERROR, LOG, SIGNAL, USER_FRAME_TYPE_START};
pub use reader::FrameReader;
pub use writer::FrameWriter;
