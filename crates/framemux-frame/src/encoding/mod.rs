//! Pluggable wire encodings.
//!
//! An [`Encoding`] is the factory a connection is built from. It turns
//! serde values into bytes and back, and hands out the four working objects
//! the multiplexer needs:
//!
//! - [`BufferEncoder`]: encodes one value into a standalone, reusable buffer
//!   before it is wrapped into a [`Frame`](crate::Frame)
//! - [`BufferDecoder`]: the receiver-side mirror: bytes in, one value out
//! - [`FrameWriter`]: frame envelopes straight onto a live transport
//! - [`FrameReader`]: frame envelopes straight off a live transport
//!
//! Call sites are generic over `E: Encoding` and never name a codec.

use std::io::{Read, Write};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::FrameConfig;
use crate::error::Result;
use crate::reader::FrameReader;
use crate::writer::FrameWriter;

#[cfg(feature = "bincode")]
mod bincode;
#[cfg(feature = "json")]
mod json;
#[cfg(feature = "msgpack")]
mod msgpack;

#[cfg(feature = "bincode")]
pub use self::bincode::BincodeEncoding;
#[cfg(feature = "json")]
pub use self::json::JsonEncoding;
#[cfg(feature = "msgpack")]
pub use self::msgpack::MsgPackEncoding;

const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// A wire codec.
///
/// Implementations only provide [`encode_into`](Encoding::encode_into) and
/// [`decode`](Encoding::decode); encode and decode failures are returned as
/// [`FrameError::Encode`](crate::FrameError::Encode) and
/// [`FrameError::Decode`](crate::FrameError::Decode), never panics.
pub trait Encoding: Clone + Send + Sync + 'static {
    /// Short codec name used in errors and logs.
    fn name(&self) -> &'static str;

    /// Serialize `value` onto `writer`.
    fn encode_into<W: Write, T: Serialize + ?Sized>(&self, writer: W, value: &T) -> Result<()>;

    /// Deserialize exactly one value from `bytes`.
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;

    /// Serialize `value` into a fresh byte vector.
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.encode_into(&mut out, value)?;
        Ok(out)
    }

    /// A buffer-backed encoder for standalone values.
    fn buffer_encoder(&self) -> BufferEncoder<Self> {
        BufferEncoder::new(self.clone())
    }

    /// A buffer-backed decoder for standalone values.
    fn buffer_decoder(&self) -> BufferDecoder<Self> {
        BufferDecoder::new(self.clone())
    }

    /// A frame encoder bound to a live writer.
    fn stream_encoder<W: Write>(&self, writer: W, config: FrameConfig) -> FrameWriter<W, Self> {
        FrameWriter::with_config(writer, self.clone(), config)
    }

    /// A frame decoder bound to a live reader.
    fn stream_decoder<R: Read>(&self, reader: R, config: FrameConfig) -> FrameReader<R, Self> {
        FrameReader::with_config(reader, self.clone(), config)
    }
}

/// Encodes values into a reusable in-memory buffer.
#[derive(Debug)]
pub struct BufferEncoder<E> {
    buf: Vec<u8>,
    encoding: E,
}

impl<E: Encoding> BufferEncoder<E> {
    pub fn new(encoding: E) -> Self {
        Self {
            buf: Vec::with_capacity(INITIAL_BUFFER_CAPACITY),
            encoding,
        }
    }

    /// Append the encoding of `value` to the buffer.
    ///
    /// On failure the buffer is rolled back to its previous contents.
    pub fn encode<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let start = self.buf.len();
        let result = self.encoding.encode_into(&mut self.buf, value);
        if result.is_err() {
            self.buf.truncate(start);
        }
        result
    }

    /// Append raw bytes to the buffer.
    pub fn write(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Buffered bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Clear the buffer, keeping its allocation.
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    pub fn encoding(&self) -> &E {
        &self.encoding
    }
}

/// Decodes values out of a reusable in-memory buffer.
#[derive(Debug)]
pub struct BufferDecoder<E> {
    buf: Vec<u8>,
    encoding: E,
}

impl<E: Encoding> BufferDecoder<E> {
    pub fn new(encoding: E) -> Self {
        Self {
            buf: Vec::with_capacity(INITIAL_BUFFER_CAPACITY),
            encoding,
        }
    }

    /// Append raw bytes to the buffer.
    pub fn write(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Decode one value from the buffered bytes. The buffer is left as is;
    /// callers [`reset`](Self::reset) it afterwards.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        self.encoding.decode(&self.buf)
    }

    /// Buffered bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Clear the buffer, keeping its allocation.
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    pub fn encoding(&self) -> &E {
        &self.encoding
    }
}
