use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::encoding::Encoding;
use crate::error::{FrameError, Result};

/// Block header: magic (2) + envelope length (4) = 6 bytes.
pub const HEADER_SIZE: usize = 6;

/// Magic bytes: "FM" (0x46 0x4D).
pub const MAGIC: [u8; 2] = [0x46, 0x4D];

/// Default maximum envelope size: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// A typed frame: the unit the multiplexer routes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Selects the receiver on the far side.
    pub frame_type: u8,
    /// Codec-encoded payload of exactly one value.
    pub data: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(frame_type: u8, data: impl Into<Bytes>) -> Self {
        Self {
            frame_type,
            data: data.into(),
        }
    }
}

/// Encode a frame envelope into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────┬───────────┬──────────────────────────────┐
/// │ Magic (2B)   │ Length    │ Envelope                     │
/// │ 0x46 0x4D    │ (4B LE)   │ encoding(Frame{type, data})  │
/// │ "FM"         │           │ (Length bytes)               │
/// └──────────────┴───────────┴──────────────────────────────┘
/// ```
///
/// The envelope is serialized straight into `dst` and the length is patched
/// in afterwards. On error `dst` is truncated back to its original length.
pub fn encode_frame<E: Encoding>(
    encoding: &E,
    frame: &Frame,
    dst: &mut BytesMut,
    max_payload: usize,
) -> Result<()> {
    let start = dst.len();
    dst.reserve(HEADER_SIZE + frame.data.len() + 16);
    dst.put_slice(&MAGIC);
    dst.put_u32_le(0);

    if let Err(err) = encoding.encode_into((&mut *dst).writer(), frame) {
        dst.truncate(start);
        return Err(err);
    }

    let envelope_len = dst.len() - start - HEADER_SIZE;
    if envelope_len > max_payload || envelope_len > u32::MAX as usize {
        dst.truncate(start);
        return Err(FrameError::PayloadTooLarge {
            size: envelope_len,
            max: max_payload.min(u32::MAX as usize),
        });
    }

    dst[start + 2..start + HEADER_SIZE].copy_from_slice(&(envelope_len as u32).to_le_bytes());
    Ok(())
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete block yet.
/// On success, consumes the block bytes from the buffer.
pub fn decode_frame<E: Encoding>(
    encoding: &E,
    src: &mut BytesMut,
    max_payload: usize,
) -> Result<Option<Frame>> {
    if src.len() < HEADER_SIZE {
        return Ok(None); // Need more data
    }

    if src[0..2] != MAGIC {
        return Err(FrameError::InvalidMagic);
    }

    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&src[2..HEADER_SIZE]);
    let envelope_len = u32::from_le_bytes(len_bytes) as usize;

    if envelope_len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: envelope_len,
            max: max_payload,
        });
    }

    let total = HEADER_SIZE + envelope_len;
    if src.len() < total {
        return Ok(None); // Need more data
    }

    src.advance(HEADER_SIZE);
    let envelope = src.split_to(envelope_len);
    encoding.decode::<Frame>(&envelope).map(Some)
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum encoded envelope size in bytes. Default: 16 MiB.
    pub max_payload_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}
