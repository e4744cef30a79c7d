use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use tracing::trace;

use crate::codec::{decode_frame, Frame, FrameConfig};
use crate::encoding::Encoding;
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete frames from any `Read` stream.
///
/// Handles partial reads internally, so callers always get complete frames.
/// When the underlying read times out, the error is returned but any bytes
/// already received stay buffered, so the next call resumes mid-frame.
pub struct FrameReader<T, E> {
    inner: T,
    buf: BytesMut,
    encoding: E,
    config: FrameConfig,
}

impl<T: Read, E: Encoding> FrameReader<T, E> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T, encoding: E) -> Self {
        Self::with_config(inner, encoding, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, encoding: E, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            encoding,
            config,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) =
                decode_frame(&self.encoding, &mut self.buf, self.config.max_payload_size)?
            {
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    if !self.buf.is_empty() {
                        trace!(buffered = self.buf.len(), error = %err, "read stopped mid-frame, keeping partial input");
                    }
                    return Err(FrameError::Io(err));
                }
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Bytes received but not yet decoded into a frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
