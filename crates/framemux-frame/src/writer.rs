use std::io::{ErrorKind, Write};

use bytes::{Bytes, BytesMut};

use crate::codec::{encode_frame, Frame, FrameConfig};
use crate::encoding::Encoding;
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes complete frames to any `Write` stream.
///
/// Each frame is encoded into an internal buffer first and then written in
/// full, so a frame never reaches the wire half-serialized.
pub struct FrameWriter<T, E> {
    inner: T,
    buf: BytesMut,
    encoding: E,
    config: FrameConfig,
}

impl<T: Write, E: Encoding> FrameWriter<T, E> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T, encoding: E) -> Self {
        Self::with_config(inner, encoding, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, encoding: E, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            encoding,
            config,
        }
    }

    /// Write a complete frame (blocking).
    ///
    /// Only `Interrupted` is retried. A write timeout surfaces as
    /// `FrameError::Io` with the partial frame already on the wire, so the
    /// stream is not usable for further frames afterwards.
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.buf.clear();
        encode_frame(
            &self.encoding,
            frame,
            &mut self.buf,
            self.config.max_payload_size,
        )?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Wrap already-encoded payload bytes into a frame and write it.
    pub fn send(&mut self, frame_type: u8, data: &[u8]) -> Result<()> {
        self.write_frame(&Frame::new(frame_type, Bytes::copy_from_slice(data)))
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
