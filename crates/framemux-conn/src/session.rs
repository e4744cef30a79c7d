//! Client/server completion protocol on top of [`Conn`].
//!
//! When a server is finished it reports its outcome on the `ERROR` frame
//! type: an empty string for success, the error message otherwise. The
//! client blocks in [`Client::wait`] for that report and then shuts down.

use std::ops::Deref;
use std::sync::mpsc::{self, sync_channel};
use std::sync::{Mutex, PoisonError};

use framemux_frame::{Encoding, ERROR};
use framemux_transport::MuxStream;
use tracing::debug;

use crate::config::Config;
use crate::conn::Conn;
use crate::error::{ConnError, Result};

/// Server side of a connection.
#[derive(Debug)]
pub struct Server<E: Encoding> {
    conn: Conn<E>,
}

impl<E: Encoding> Server<E> {
    pub fn new(stream: impl Into<MuxStream>, encoding: E, config: Config) -> Result<Self> {
        Ok(Self {
            conn: Conn::new(stream, encoding, config)?,
        })
    }

    /// Report completion to the client: success when `err` is `None`,
    /// otherwise the error's message.
    pub fn done(&self, err: Option<&dyn std::error::Error>) -> Result<()> {
        let message = err.map(ToString::to_string).unwrap_or_default();
        self.conn.send(ERROR, &message)
    }

    pub fn into_conn(self) -> Conn<E> {
        self.conn
    }
}

#[cfg(feature = "bincode")]
impl Server<framemux_frame::BincodeEncoding> {
    /// Bincode encoding and default configuration.
    pub fn with_defaults(stream: impl Into<MuxStream>) -> Result<Self> {
        Self::new(stream, framemux_frame::BincodeEncoding, Config::default())
    }
}

impl<E: Encoding> Deref for Server<E> {
    type Target = Conn<E>;

    fn deref(&self) -> &Conn<E> {
        &self.conn
    }
}

/// Client side of a connection.
#[derive(Debug)]
pub struct Client<E: Encoding> {
    conn: Conn<E>,
    completion: Mutex<mpsc::Receiver<String>>,
}

impl<E: Encoding> Client<E> {
    pub fn new(stream: impl Into<MuxStream>, encoding: E, config: Config) -> Result<Self> {
        let conn = Conn::new(stream, encoding, config)?;
        let (tx, rx) = sync_channel(1);
        conn.receive(ERROR, conn.string_receiver(tx));
        Ok(Self {
            conn,
            completion: Mutex::new(rx),
        })
    }

    /// Block until the server reports completion, then shut down.
    ///
    /// Someone must be running [`recv`](Conn::recv) for the report to
    /// arrive. A non-empty report comes back as [`ConnError::Remote`].
    pub fn wait(&self) -> Result<()> {
        let outcome = self
            .completion
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .recv();
        let shutdown = self.conn.shutdown();

        match outcome {
            Ok(message) if message.is_empty() => shutdown,
            Ok(message) => {
                debug!(error = %message, "server reported failure");
                Err(ConnError::Remote(message))
            }
            Err(mpsc::RecvError) => Err(ConnError::Disconnected),
        }
    }

    pub fn into_conn(self) -> Conn<E> {
        self.conn
    }
}

#[cfg(feature = "bincode")]
impl Client<framemux_frame::BincodeEncoding> {
    /// Bincode encoding and default configuration.
    pub fn with_defaults(stream: impl Into<MuxStream>) -> Result<Self> {
        Self::new(stream, framemux_frame::BincodeEncoding, Config::default())
    }
}

impl<E: Encoding> Deref for Client<E> {
    type Target = Conn<E>;

    fn deref(&self) -> &Conn<E> {
        &self.conn
    }
}
