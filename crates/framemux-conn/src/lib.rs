//! Frame-type multiplexed connections.
//!
//! A [`Conn`] carries many independent logical streams over one socket.
//! Every value travels in a frame tagged with an 8-bit frame type; the read
//! loop decodes each frame and hands the payload to the [`Receiver`]
//! registered for that type, which typically delivers the decoded value on a
//! channel. [`Client`] and [`Server`] add a one-shot completion report on the
//! reserved `ERROR` frame type.
//!
//! ```no_run
//! use std::net::TcpStream;
//! use std::sync::mpsc::sync_channel;
//!
//! use framemux_conn::Client;
//!
//! fn run() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::with_defaults(TcpStream::connect("127.0.0.1:7070")?)?;
//!     let (tx, logs) = sync_channel::<String>(16);
//!     client.receive(framemux_frame::LOG, client.string_receiver(tx));
//!
//!     std::thread::scope(|s| {
//!         s.spawn(|| client.recv());
//!         s.spawn(move || logs.iter().for_each(|line| println!("{line}")));
//!         client.send(3, "hello")?;
//!         client.wait()
//!     })?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod conn;
pub mod error;
pub mod receiver;
pub mod session;
pub mod shutdown;
pub mod signal;

pub use config::{Config, DEFAULT_TIMEOUT};
pub use conn::Conn;
pub use error::{ConfigError, ConnError, Result};
pub use receiver::{BytesReceiver, FnReceiver, Receiver, SignalReceiver, StringReceiver, ValueReceiver};
pub use session::{Client, Server};
pub use shutdown::ShutdownSignal;
pub use signal::Signal;
