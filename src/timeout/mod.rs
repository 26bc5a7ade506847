//! Timeout policies for socket operations.
//!
//! # Data Flow
//! ```text
//! Connection
//!     → TimeoutPolicy::connect        (Connector::open, bounded by connect timeout)
//!     → TimeoutPolicy::connect_secure (handshake steps, each wait bounded by read/write timeout)
//!     → TimeoutPolicy::read_partial   (try_read → readable wait → retry)
//!     → TimeoutPolicy::write          (try_write → writable wait → retry)
//! ```
//!
//! # Design Decisions
//! - Connect, read and write are bounded independently so a slow handshake,
//!   a slow server and a slow local writer show up as different failures
//! - The bound applies to each readiness wait, not to the whole operation
//! - End-of-stream is a value, never an error
//! - `Null` calls the blocking primitives once, with no deadline

mod null;
mod per_operation;

#[cfg(test)]
pub(crate) mod mock;

use std::future::Future;
use std::io;
use std::time::Duration;

use bytes::Bytes;

use crate::config::schema::DEFAULT_BUFFER_SIZE;
use crate::config::{TimeoutConfig, TimeoutMode};
use crate::error::{Error, Operation, Result};
use crate::net::{Connector, Socket};
use crate::observability::metrics;

pub use null::NullTimeout;
pub use per_operation::PerOperationTimeout;

/// Largest buffer a single `read_partial` allocates; larger requests are
/// served at most this many bytes at a time.
pub const MAX_READ_SIZE: usize = 4 * DEFAULT_BUFFER_SIZE;

/// Result of a partial read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    /// Bytes read; never more than requested.
    Data(Bytes),
    /// The peer has finished sending.
    EndOfStream,
}

impl Chunk {
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Chunk::EndOfStream)
    }

    pub fn into_data(self) -> Option<Bytes> {
        match self {
            Chunk::Data(bytes) => Some(bytes),
            Chunk::EndOfStream => None,
        }
    }
}

/// Result of a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Written {
    /// Every byte was accepted by the socket.
    Complete,
    /// The socket stopped accepting bytes.
    EndOfStream,
}

/// Strategy bounding connect, handshake, read and write on one socket.
///
/// A policy owns the socket from `connect` until `take_socket` or drop.
pub trait TimeoutPolicy: Send {
    type Socket: Socket;

    /// Open a socket through `connector` and keep it.
    fn connect<C>(
        &mut self,
        connector: &C,
        host: &str,
        port: u16,
    ) -> impl Future<Output = Result<()>> + Send
    where
        C: Connector<Socket = Self::Socket>;

    /// Drive the socket's secure-channel handshake to completion.
    fn connect_secure(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Read up to `max` bytes, capped at `MAX_READ_SIZE`.
    fn read_partial(&mut self, max: usize) -> impl Future<Output = Result<Chunk>> + Send;

    /// Write all of `data`.
    fn write(&mut self, data: &[u8]) -> impl Future<Output = Result<Written>> + Send;

    fn socket(&self) -> Option<&Self::Socket>;

    /// Give up ownership of the socket; the policy is disconnected afterwards.
    fn take_socket(&mut self) -> Option<Self::Socket>;

    fn is_connected(&self) -> bool {
        self.socket().is_some()
    }
}

/// Policy chosen from configuration at connect time.
#[derive(Debug)]
pub enum Timeout<S> {
    Null(NullTimeout<S>),
    PerOperation(PerOperationTimeout<S>),
}

impl<S: Socket> Timeout<S> {
    pub fn from_config(config: &TimeoutConfig) -> Self {
        match config.mode {
            TimeoutMode::Null => Timeout::Null(NullTimeout::new()),
            TimeoutMode::PerOperation => Timeout::PerOperation(PerOperationTimeout::new(config)),
        }
    }
}

impl<S: Socket> TimeoutPolicy for Timeout<S> {
    type Socket = S;

    async fn connect<C>(&mut self, connector: &C, host: &str, port: u16) -> Result<()>
    where
        C: Connector<Socket = Self::Socket>,
    {
        match self {
            Timeout::Null(policy) => policy.connect(connector, host, port).await,
            Timeout::PerOperation(policy) => policy.connect(connector, host, port).await,
        }
    }

    async fn connect_secure(&mut self) -> Result<()> {
        match self {
            Timeout::Null(policy) => policy.connect_secure().await,
            Timeout::PerOperation(policy) => policy.connect_secure().await,
        }
    }

    async fn read_partial(&mut self, max: usize) -> Result<Chunk> {
        match self {
            Timeout::Null(policy) => policy.read_partial(max).await,
            Timeout::PerOperation(policy) => policy.read_partial(max).await,
        }
    }

    async fn write(&mut self, data: &[u8]) -> Result<Written> {
        match self {
            Timeout::Null(policy) => policy.write(data).await,
            Timeout::PerOperation(policy) => policy.write(data).await,
        }
    }

    fn socket(&self) -> Option<&S> {
        match self {
            Timeout::Null(policy) => policy.socket(),
            Timeout::PerOperation(policy) => policy.socket(),
        }
    }

    fn take_socket(&mut self) -> Option<S> {
        match self {
            Timeout::Null(policy) => policy.take_socket(),
            Timeout::PerOperation(policy) => policy.take_socket(),
        }
    }
}

/// Bound one readiness wait.
pub(crate) async fn wait_ready<F>(ready: F, operation: Operation, limit: Duration) -> Result<()>
where
    F: Future<Output = io::Result<()>>,
{
    match tokio::time::timeout(limit, ready).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(timed_out(operation, limit)),
    }
}

pub(crate) fn timed_out(operation: Operation, limit: Duration) -> Error {
    tracing::warn!(
        operation = operation.as_str(),
        limit_ms = limit.as_millis() as u64,
        "Socket operation timed out"
    );
    metrics::record_timeout(operation);
    Error::timeout(operation, limit)
}
