//! Error types shared by the transport and body layers.
//!
//! End-of-stream is deliberately absent here: it travels as a value
//! (`Chunk::EndOfStream`, `Written::EndOfStream`) and never as an error.

use std::fmt;
use std::io;
use std::time::Duration;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Socket operation that a timeout can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Connect,
    Handshake,
    Read,
    Write,
}

impl Operation {
    /// Stable lowercase name, used for log fields and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Connect => "connect",
            Operation::Handshake => "handshake",
            Operation::Read => "read",
            Operation::Write => "write",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordering violations on a response body. These are caller bugs and are
/// never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// The connection has moved on to another request/response cycle.
    #[error("sequence id {bound} does not match {current}; the previous response body must be read in full")]
    SequenceMismatch { bound: u64, current: u64 },

    /// Materialization was requested while the body is being streamed.
    #[error("body is being streamed")]
    Streaming,

    /// The raw bytes of the body have already been read off the connection.
    #[error("body has already been consumed")]
    Consumed,

    /// A new exchange was started before the previous response body was read.
    #[error("a response is pending; read off the body before starting another exchange")]
    ResponsePending,
}

/// Errors produced by the transport, the connection and the body.
#[derive(Debug, Error)]
pub enum Error {
    /// A connect, handshake, read or write exceeded its configured bound.
    #[error("{operation} timed out after {} seconds", .limit.as_secs_f64())]
    Timeout { operation: Operation, limit: Duration },

    /// Body used out of order or after its exchange ended.
    #[error(transparent)]
    State(#[from] StateError),

    /// TLS protocol failure reported by rustls.
    #[error("tls error: {0}")]
    Tls(#[from] rustls::Error),

    /// An operation that needs a socket was called before `connect`.
    #[error("not connected")]
    NotConnected,

    /// Underlying socket failure, propagated unchanged.
    #[error("io error: {0}")]
    Io(#[source] io::Error),
}

// TLS sockets speak `io::Error`; a rustls failure travels inside one and is
// unwrapped here.
impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        match err.get_ref().and_then(|inner| inner.downcast_ref::<rustls::Error>()) {
            Some(tls) => Error::Tls(tls.clone()),
            None => Error::Io(err),
        }
    }
}

impl Error {
    pub fn timeout(operation: Operation, limit: Duration) -> Self {
        Error::Timeout { operation, limit }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    pub fn is_state(&self) -> bool {
        matches!(self, Error::State(_))
    }

    /// The state violation carried by this error, if any.
    pub fn as_state(&self) -> Option<&StateError> {
        match self {
            Error::State(e) => Some(e),
            _ => None,
        }
    }
}
