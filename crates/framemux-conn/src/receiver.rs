//! Typed sinks for inbound frames.
//!
//! The read loop hands each frame's payload to the [`Receiver`] registered
//! for its frame type. The stock receiver decodes exactly one value with the
//! connection's encoding and delivers it on a bounded channel; delivery
//! blocks, so a slow consumer slows the whole inbound side down.

use std::any::type_name;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::SyncSender;
use std::sync::{Mutex, MutexGuard, PoisonError};

use framemux_frame::{BufferDecoder, Encoding};
use serde::de::DeserializeOwned;

use crate::error::{ConnError, Result};
use crate::signal::Signal;

/// Handles the payload of frames of one frame type.
///
/// `close` may run on another thread while `receive` is blocked delivering a
/// value, and must not wait for that delivery to finish.
pub trait Receiver: Send + Sync {
    /// Handle one frame payload.
    fn receive(&self, data: &[u8]) -> Result<()>;

    /// Signal end-of-stream to whoever consumes this receiver's output.
    /// Calling it more than once is a no-op.
    fn close(&self) -> Result<()>;
}

/// Decodes one `T` per frame and sends it on a channel.
pub struct ValueReceiver<T, E> {
    dec: Mutex<BufferDecoder<E>>,
    tx: Mutex<Option<SyncSender<T>>>,
}

pub type StringReceiver<E> = ValueReceiver<String, E>;
pub type SignalReceiver<E> = ValueReceiver<Signal, E>;
pub type BytesReceiver<E> = ValueReceiver<Vec<u8>, E>;

impl<T, E> ValueReceiver<T, E>
where
    T: DeserializeOwned + Send,
    E: Encoding,
{
    pub fn new(encoding: &E, tx: SyncSender<T>) -> Self {
        Self {
            dec: Mutex::new(encoding.buffer_decoder()),
            tx: Mutex::new(Some(tx)),
        }
    }

    /// Whether [`close`](Receiver::close) has been called.
    pub fn is_closed(&self) -> bool {
        lock(&self.tx).is_none()
    }
}

impl<T, E> Receiver for ValueReceiver<T, E>
where
    T: DeserializeOwned + Send,
    E: Encoding,
{
    fn receive(&self, data: &[u8]) -> Result<()> {
        let value = decode_one::<T, E>(&mut lock(&self.dec), data)?;
        // Clone the sender out so a blocked send never holds the lock `close` needs.
        let tx = lock(&self.tx)
            .clone()
            .ok_or(ConnError::ReceiverClosed(type_name::<T>()))?;
        tx.send(value)
            .map_err(|_| ConnError::ReceiverClosed(type_name::<T>()))
    }

    fn close(&self) -> Result<()> {
        lock(&self.tx).take();
        Ok(())
    }
}

/// Decodes one `T` per frame and hands it to a callback.
///
/// Once closed, further frames are decoded but discarded.
pub struct FnReceiver<T, E, F> {
    dec: Mutex<BufferDecoder<E>>,
    handler: Mutex<F>,
    closed: AtomicBool,
    _value: PhantomData<fn() -> T>,
}

impl<T, E, F> FnReceiver<T, E, F>
where
    T: DeserializeOwned,
    E: Encoding,
    F: FnMut(T) -> Result<()> + Send,
{
    pub fn new(encoding: &E, handler: F) -> Self {
        Self {
            dec: Mutex::new(encoding.buffer_decoder()),
            handler: Mutex::new(handler),
            closed: AtomicBool::new(false),
            _value: PhantomData,
        }
    }
}

impl<T, E, F> Receiver for FnReceiver<T, E, F>
where
    T: DeserializeOwned,
    E: Encoding,
    F: FnMut(T) -> Result<()> + Send,
{
    fn receive(&self, data: &[u8]) -> Result<()> {
        let value = decode_one::<T, E>(&mut lock(&self.dec), data)?;
        if self.closed.load(Ordering::Acquire) {
            return Ok(());
        }
        let mut handler = lock(&self.handler);
        (*handler)(value)
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

/// Decode exactly one value; the buffer is reset whatever the outcome.
fn decode_one<T, E>(dec: &mut BufferDecoder<E>, data: &[u8]) -> Result<T>
where
    T: DeserializeOwned,
    E: Encoding,
{
    dec.write(data);
    let result = dec.decode::<T>();
    dec.reset();
    result.map_err(ConnError::from)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
