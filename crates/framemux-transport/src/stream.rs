use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};

/// A connected byte stream implementing Read + Write.
///
/// Clones made with [`MuxStream::try_clone`] share the underlying socket and
/// its closed state: closing any handle closes the connection for all of
/// them, which is how a blocked reader on another thread gets woken up.
pub struct MuxStream {
    inner: MuxStreamInner,
    closed: Arc<AtomicBool>,
}

enum MuxStreamInner {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
}

impl Read for MuxStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            MuxStreamInner::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            MuxStreamInner::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for MuxStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            MuxStreamInner::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            MuxStreamInner::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            MuxStreamInner::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            MuxStreamInner::Unix(stream) => stream.flush(),
        }
    }
}

impl From<TcpStream> for MuxStream {
    fn from(stream: TcpStream) -> Self {
        Self::new(MuxStreamInner::Tcp(stream))
    }
}

#[cfg(unix)]
impl From<std::os::unix::net::UnixStream> for MuxStream {
    fn from(stream: std::os::unix::net::UnixStream) -> Self {
        Self::new(MuxStreamInner::Unix(stream))
    }
}

impl MuxStream {
    fn new(inner: MuxStreamInner) -> Self {
        Self {
            inner,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Set read timeout on the underlying stream.
    ///
    /// Reads that exceed the timeout fail with `WouldBlock` or `TimedOut`
    /// depending on the platform.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            MuxStreamInner::Tcp(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            MuxStreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            MuxStreamInner::Tcp(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            MuxStreamInner::Unix(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
        }
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        let inner = match &self.inner {
            MuxStreamInner::Tcp(stream) => MuxStreamInner::Tcp(stream.try_clone()?),
            #[cfg(unix)]
            MuxStreamInner::Unix(stream) => MuxStreamInner::Unix(stream.try_clone()?),
        };
        Ok(Self {
            inner,
            closed: Arc::clone(&self.closed),
        })
    }

    /// Close both directions of the connection.
    ///
    /// Only the first call on any handle sharing this socket does work;
    /// later calls return `Ok(())`. A socket the peer already tore down
    /// (`NotConnected`) counts as closed.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let result = match &self.inner {
            MuxStreamInner::Tcp(stream) => stream.shutdown(Shutdown::Both),
            #[cfg(unix)]
            MuxStreamInner::Unix(stream) => stream.shutdown(Shutdown::Both),
        };

        match result {
            Ok(()) => {
                debug!(peer = %self.peer_addr(), "transport closed");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotConnected => Ok(()),
            Err(err) => Err(TransportError::Io(err)),
        }
    }

    /// Whether [`close`](Self::close) has been called on this socket.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Human-readable description of the remote end, for diagnostics.
    pub fn peer_addr(&self) -> String {
        match &self.inner {
            MuxStreamInner::Tcp(stream) => match stream.peer_addr() {
                Ok(addr) => format!("tcp:{addr}"),
                Err(_) => "tcp:unknown".to_string(),
            },
            #[cfg(unix)]
            MuxStreamInner::Unix(stream) => match stream.peer_addr() {
                Ok(addr) => match addr.as_pathname() {
                    Some(path) => format!("unix:{}", path.display()),
                    None => "unix:unnamed".to_string(),
                },
                Err(_) => "unix:unknown".to_string(),
            },
        }
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match &self.inner {
            MuxStreamInner::Tcp(_) => "tcp",
            #[cfg(unix)]
            MuxStreamInner::Unix(_) => "unix-domain-socket",
        }
    }
}

impl std::fmt::Debug for MuxStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MuxStream")
            .field("type", &self.transport_name())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn tcp_pair() -> (MuxStream, MuxStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = std::thread::spawn(move || TcpStream::connect(addr).unwrap());
        let (server, _) = listener.accept().unwrap();
        (MuxStream::from(server), MuxStream::from(client.join().unwrap()))
    }

    #[test]
    fn tcp_roundtrip() {
        let (mut server, mut client) = tcp_pair();

        client.write_all(b"hello").unwrap();
        let mut buf = [0u8; 5];
        server.read_exact(&mut buf).unwrap();

        assert_eq!(&buf, b"hello");
        assert_eq!(server.transport_name(), "tcp");
        assert!(client.peer_addr().starts_with("tcp:127.0.0.1:"));
    }

    #[test]
    fn read_timeout_surfaces_as_timeout_error() {
        let (mut server, _client) = tcp_pair();
        server
            .set_read_timeout(Some(Duration::from_millis(10)))
            .unwrap();

        let mut buf = [0u8; 1];
        let err = server.read(&mut buf).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::WouldBlock | ErrorKind::TimedOut
        ));
    }

    #[test]
    fn close_is_idempotent() {
        let (server, _client) = tcp_pair();

        server.close().unwrap();
        server.close().unwrap();
        assert!(server.is_closed());
    }

    #[test]
    fn close_wakes_reader_on_cloned_handle() {
        let (server, _client) = tcp_pair();
        let mut reader = server.try_clone().unwrap();

        let handle = std::thread::spawn(move || {
            let mut buf = [0u8; 1];
            reader.read(&mut buf)
        });

        std::thread::sleep(Duration::from_millis(20));
        server.close().unwrap();

        let read = handle.join().unwrap().unwrap();
        assert_eq!(read, 0);
    }

    #[test]
    fn try_clone_after_close_is_rejected() {
        let (server, _client) = tcp_pair();
        server.close().unwrap();

        assert!(matches!(server.try_clone(), Err(TransportError::Closed)));
    }

    #[test]
    fn peer_close_reads_eof() {
        let (mut server, client) = tcp_pair();
        client.close().unwrap();

        let mut buf = [0u8; 4];
        assert_eq!(server.read(&mut buf).unwrap(), 0);
    }

    #[test]
    #[cfg(unix)]
    fn unix_pair_roundtrip() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut left = MuxStream::from(left);
        let mut right = MuxStream::from(right);

        left.write_all(b"uds").unwrap();
        let mut buf = [0u8; 3];
        right.read_exact(&mut buf).unwrap();

        assert_eq!(&buf, b"uds");
        assert_eq!(right.transport_name(), "unix-domain-socket");
        assert_eq!(right.peer_addr(), "unix:unnamed");
    }
}
