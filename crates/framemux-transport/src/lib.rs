//! Byte-stream transport handle for framemux.
//!
//! The multiplexer never acquires transports itself. Callers dial or accept
//! a TCP or Unix domain socket and hand the connected stream over as a
//! [`MuxStream`], which exposes exactly what the connection layer needs:
//! read/write, read timeouts, a second handle for the read side, and an
//! idempotent close.

pub mod error;
pub mod stream;

pub use error::{Result, TransportError};
pub use stream::MuxStream;
