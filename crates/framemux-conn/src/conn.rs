use std::collections::HashMap;
use std::io::ErrorKind;
use std::sync::mpsc::SyncSender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::Duration;

use bytes::Bytes;
use framemux_frame::frame_type::frame_type_name;
use framemux_frame::{BufferEncoder, Encoding, Frame, FrameError, FrameReader, FrameWriter};
use framemux_transport::MuxStream;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, info, trace, warn, Dispatch};

use crate::config::Config;
use crate::error::{ConfigError, ConnError, Result};
use crate::receiver::{Receiver, SignalReceiver, StringReceiver, ValueReceiver};
use crate::shutdown::ShutdownSignal;

type SharedReceiver = Arc<dyn Receiver>;

/// Everything one `send` needs, behind a single lock so two frames never
/// interleave on the wire.
struct SendState<E> {
    buf: BufferEncoder<E>,
    wire: FrameWriter<MuxStream, E>,
}

/// A frame-type multiplexed connection over one byte stream.
///
/// Any number of threads may [`send`](Conn::send) concurrently. Exactly one
/// thread runs [`recv`](Conn::recv), which routes each inbound frame to the
/// [`Receiver`] registered for its frame type. [`shutdown`](Conn::shutdown)
/// tears everything down once; the connection cannot be restarted.
pub struct Conn<E: Encoding> {
    stream: MuxStream,
    writer: Mutex<SendState<E>>,
    reader: Mutex<FrameReader<MuxStream, E>>,
    receivers: Mutex<HashMap<u8, SharedReceiver>>,
    signal: ShutdownSignal,
    timeout: Duration,
    encoding: E,
    dispatch: Dispatch,
}

impl<E: Encoding> Conn<E> {
    /// Wrap a connected stream.
    pub fn new(stream: impl Into<MuxStream>, encoding: E, config: Config) -> Result<Self> {
        config.validate()?;
        let dispatch = config.dispatch.clone().ok_or(ConfigError::InvalidLogSink)?;

        let stream = stream.into();
        let frame_config = config.frame_config();
        let wire = encoding.stream_encoder(stream.try_clone()?, frame_config.clone());
        let reader = encoding.stream_decoder(stream.try_clone()?, frame_config);

        tracing::dispatcher::with_default(&dispatch, || {
            debug!(
                peer = %stream.peer_addr(),
                transport = stream.transport_name(),
                encoding = encoding.name(),
                "connection established"
            );
        });

        Ok(Self {
            writer: Mutex::new(SendState {
                buf: encoding.buffer_encoder(),
                wire,
            }),
            reader: Mutex::new(reader),
            receivers: Mutex::new(HashMap::new()),
            signal: ShutdownSignal::new(),
            timeout: config.timeout,
            stream,
            encoding,
            dispatch,
        })
    }

    /// Encode `value` and send it as one frame of `frame_type`.
    pub fn send<T: Serialize + ?Sized>(&self, frame_type: u8, value: &T) -> Result<()> {
        self.in_scope(|| {
            if self.is_shutdown() {
                return Err(ConnError::Shutdown);
            }

            let mut state = lock(&self.writer);
            let SendState { buf, wire } = &mut *state;

            buf.reset();
            buf.encode(value)?;
            let frame = Frame::new(frame_type, Bytes::copy_from_slice(buf.bytes()));
            buf.reset();

            match wire.write_frame(&frame) {
                Ok(()) => {
                    trace!(frame_type, len = frame.data.len(), "frame sent");
                    Ok(())
                }
                Err(_) if self.is_shutdown() => Err(ConnError::Shutdown),
                Err(err) => Err(err.into()),
            }
        })
    }

    /// Route frames of `frame_type` to `receiver`, replacing any receiver
    /// already registered for it.
    pub fn receive(&self, frame_type: u8, receiver: impl Receiver + 'static) {
        let shared: SharedReceiver = Arc::new(receiver);
        if lock(&self.receivers).insert(frame_type, shared).is_some() {
            self.in_scope(|| debug!(frame_type, "receiver replaced"));
        }
    }

    /// A receiver that decodes `T` values with this connection's encoding.
    pub fn value_receiver<T>(&self, tx: SyncSender<T>) -> ValueReceiver<T, E>
    where
        T: DeserializeOwned + Send,
    {
        ValueReceiver::new(&self.encoding, tx)
    }

    pub fn string_receiver(&self, tx: SyncSender<String>) -> StringReceiver<E> {
        self.value_receiver(tx)
    }

    pub fn signal_receiver(&self, tx: SyncSender<crate::Signal>) -> SignalReceiver<E> {
        self.value_receiver(tx)
    }

    /// Run the read loop until the connection ends.
    ///
    /// Returns `Ok(())` when the peer closes the connection or after
    /// [`shutdown`](Self::shutdown); any other read failure is returned as an
    /// error. Either way the connection is shut down on return.
    pub fn recv(&self) -> Result<()> {
        self.in_scope(|| {
            let mut reader = match self.reader.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
                Err(TryLockError::WouldBlock) => return Err(ConnError::AlreadyReceiving),
            };

            let result = self.read_loop(&mut reader);
            drop(reader);

            let shutdown = self.shutdown();
            result.and(shutdown)
        })
    }

    fn read_loop(&self, reader: &mut FrameReader<MuxStream, E>) -> Result<()> {
        if self.signal.is_triggered() {
            return Ok(());
        }
        reader.get_ref().set_read_timeout(Some(self.timeout))?;

        loop {
            match reader.read_frame() {
                Ok(frame) => self.route(frame),
                Err(err) if is_closed(&err) => {
                    debug!(peer = %self.stream.peer_addr(), "connection closed by peer");
                    return Ok(());
                }
                Err(err) if is_timeout(&err) => {
                    if self.signal.is_triggered() {
                        return Ok(());
                    }
                }
                Err(err) => {
                    if self.signal.is_triggered() {
                        return Ok(());
                    }
                    error!(peer = %self.stream.peer_addr(), error = %err, "read loop failed");
                    return Err(err.into());
                }
            }
        }
    }

    fn route(&self, frame: Frame) {
        let receiver = lock(&self.receivers).get(&frame.frame_type).cloned();
        let Some(receiver) = receiver else {
            warn!(
                frame_type = frame.frame_type,
                kind = frame_type_name(frame.frame_type),
                "no receiver registered, dropping frame"
            );
            return;
        };

        let delivered = receiver.receive(&frame.data);
        if let Err(err) = delivered {
            warn!(frame_type = frame.frame_type, error = %err, "receiver failed");
        }
    }

    /// Shut the connection down.
    ///
    /// The first call broadcasts the shutdown signal, closes every registered
    /// receiver, then closes the transport. Later calls return `Ok(())`.
    /// A delivery blocked on a full channel does not hold shutdown up; its
    /// value is still handed over if the consumer drains the channel.
    pub fn shutdown(&self) -> Result<()> {
        if !self.signal.trigger() {
            return Ok(());
        }

        self.in_scope(|| {
            let receivers: Vec<(u8, SharedReceiver)> = lock(&self.receivers)
                .iter()
                .map(|(frame_type, receiver)| (*frame_type, Arc::clone(receiver)))
                .collect();

            let mut first_err = None;
            for (frame_type, receiver) in receivers {
                if let Err(err) = receiver.close() {
                    warn!(frame_type, error = %err, "failed to close receiver");
                    first_err.get_or_insert(err);
                }
            }

            if let Err(err) = self.stream.close() {
                warn!(error = %err, "failed to close transport");
                first_err.get_or_insert(err.into());
            }

            info!(peer = %self.stream.peer_addr(), "connection shut down");
            first_err.map_or(Ok(()), Err)
        })
    }

    pub fn is_shutdown(&self) -> bool {
        self.signal.is_triggered()
    }

    /// A handle that can be waited on for this connection's shutdown.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.signal.clone()
    }

    pub fn encoding(&self) -> &E {
        &self.encoding
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn peer_addr(&self) -> String {
        self.stream.peer_addr()
    }

    fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }
}

impl<E: Encoding> std::fmt::Debug for Conn<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conn")
            .field("stream", &self.stream)
            .field("encoding", &self.encoding.name())
            .field("timeout", &self.timeout)
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn is_closed(err: &FrameError) -> bool {
    match err {
        FrameError::ConnectionClosed => true,
        FrameError::Io(err) => matches!(
            err.kind(),
            ErrorKind::UnexpectedEof
                | ErrorKind::ConnectionReset
                | ErrorKind::ConnectionAborted
                | ErrorKind::BrokenPipe
                | ErrorKind::NotConnected
        ),
        _ => false,
    }
}

fn is_timeout(err: &FrameError) -> bool {
    matches!(err, FrameError::Io(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut))
}

#[cfg(all(test, feature = "bincode"))]
mod tests {
    use std::net::{TcpListener, TcpStream};
    use std::sync::mpsc::sync_channel;
    use std::thread;

    use framemux_frame::BincodeEncoding;

    use super::*;
    use crate::receiver::FnReceiver;

    fn config() -> Config {
        Config::default().with_timeout(Duration::from_millis(20))
    }

    fn pair() -> (Conn<BincodeEncoding>, Conn<BincodeEncoding>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = thread::spawn(move || TcpStream::connect(addr).unwrap());
        let (server, _) = listener.accept().unwrap();
        (
            Conn::new(server, BincodeEncoding, config()).unwrap(),
            Conn::new(client.join().unwrap(), BincodeEncoding, config()).unwrap(),
        )
    }

    #[test]
    fn new_rejects_invalid_config() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let stream = TcpStream::connect(listener.local_addr().unwrap()).unwrap();

        let err = Conn::new(stream, BincodeEncoding, config().with_timeout(Duration::ZERO))
            .unwrap_err();
        assert!(matches!(err, ConnError::Config(ConfigError::InvalidTimeout)));
    }

    #[test]
    fn send_after_shutdown_is_rejected() {
        let (a, _b) = pair();
        a.shutdown().unwrap();

        let err = a.send(3, "late").unwrap_err();
        assert!(matches!(err, ConnError::Shutdown));
    }

    #[test]
    fn second_recv_is_rejected() {
        let (a, b) = pair();

        thread::scope(|s| {
            let first = s.spawn(|| a.recv());
            thread::sleep(Duration::from_millis(50));

            assert!(matches!(a.recv(), Err(ConnError::AlreadyReceiving)));

            a.shutdown().unwrap();
            first.join().unwrap().unwrap();
        });
        b.shutdown().unwrap();
    }

    #[test]
    fn replaced_receiver_gets_later_frames() {
        let (a, b) = pair();
        let (old_tx, old_rx) = sync_channel(1);
        let (new_tx, new_rx) = sync_channel(1);

        a.receive(5, a.string_receiver(old_tx));
        a.receive(5, a.string_receiver(new_tx));

        thread::scope(|s| {
            let reader = s.spawn(|| a.recv());
            b.send(5, "second").unwrap();

            assert_eq!(new_rx.recv().unwrap(), "second");
            assert!(old_rx.recv().is_err(), "replaced receiver is dropped");

            a.shutdown().unwrap();
            reader.join().unwrap().unwrap();
        });
    }

    #[test]
    fn receiver_error_does_not_stop_the_loop() {
        let (a, b) = pair();
        let (tx, rx) = sync_channel(4);

        a.receive(
            7,
            FnReceiver::new(a.encoding(), move |value: u32| {
                if value == 0 {
                    return Err(ConnError::Remote("zero".to_string()));
                }
                tx.send(value).map_err(|_| ConnError::ReceiverClosed("u32"))
            }),
        );

        thread::scope(|s| {
            let reader = s.spawn(|| a.recv());
            b.send(7, &0u32).unwrap();
            b.send(7, &1u8).unwrap();
            b.send(7, &9u32).unwrap();

            assert_eq!(rx.recv().unwrap(), 9);

            b.shutdown().unwrap();
            reader.join().unwrap().unwrap();
        });
        assert!(a.is_shutdown());
    }

    #[test]
    fn shutdown_signal_fires_when_peer_leaves() {
        let (a, b) = pair();
        let signal = a.shutdown_signal();

        thread::scope(|s| {
            let reader = s.spawn(|| a.recv());
            b.shutdown().unwrap();

            assert!(signal.wait_timeout(Duration::from_secs(5)));
            reader.join().unwrap().unwrap();
        });
    }

    #[test]
    fn corrupt_stream_is_fatal() {
        use std::io::Write;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut raw = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server, _) = listener.accept().unwrap();
        let conn = Conn::new(server, BincodeEncoding, config()).unwrap();

        raw.write_all(b"XX\x00\x00\x00\x00").unwrap();

        let err = conn.recv().unwrap_err();
        assert!(matches!(err, ConnError::Frame(FrameError::InvalidMagic)));
        assert!(conn.is_shutdown());
    }
}
