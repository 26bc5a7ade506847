//! A persistent connection serving one request/response exchange at a time.

use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Mutex;

use crate::client::{BodySource, SharedClient};
use crate::config::schema::DEFAULT_BUFFER_SIZE;
use crate::error::{Error, Result, StateError};
use crate::net::Connector;
use crate::observability::metrics;
use crate::timeout::{Chunk, TimeoutPolicy, Written};

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection, used in log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// How the end of the current response body is recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Exactly this many bytes follow.
    Length(u64),
    /// The body runs until the peer closes the connection.
    UntilClose,
}

/// Progress through the current exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exchange {
    /// No body outstanding.
    Idle,
    /// A length-delimited body with this many bytes still unread.
    Remaining(u64),
    /// A close-delimited body that has not hit end-of-stream yet.
    UntilClose,
}

/// Owns the socket (through its timeout policy) and the sequence counter.
pub struct Connection<P> {
    id: ConnectionId,
    policy: P,
    host: String,
    port: u16,
    secure: bool,
    sequence_id: u64,
    exchange: Exchange,
    peer_closed: bool,
    buffer_size: usize,
}

impl<P: TimeoutPolicy> Connection<P> {
    /// Connect through `policy`, bounded by its connect timeout.
    pub async fn open<C>(mut policy: P, connector: &C, host: &str, port: u16) -> Result<Self>
    where
        C: Connector<Socket = P::Socket>,
    {
        policy.connect(connector, host, port).await?;
        metrics::record_connection(false);
        Ok(Self::from_policy(policy, host, port, false))
    }

    /// Connect, then drive the socket's handshake under the read/write bounds.
    pub async fn open_secure<C>(mut policy: P, connector: &C, host: &str, port: u16) -> Result<Self>
    where
        C: Connector<Socket = P::Socket>,
    {
        policy.connect(connector, host, port).await?;
        policy.connect_secure().await?;
        metrics::record_connection(true);
        Ok(Self::from_policy(policy, host, port, true))
    }

    /// Wrap a policy whose socket is already connected.
    pub fn from_policy(policy: P, host: &str, port: u16, secure: bool) -> Self {
        let connection = Self {
            id: ConnectionId::new(),
            policy,
            host: host.to_string(),
            port,
            secure,
            sequence_id: 0,
            exchange: Exchange::Idle,
            peer_closed: false,
            buffer_size: DEFAULT_BUFFER_SIZE,
        };
        tracing::debug!(connection_id = %connection.id, host, port, secure, "Connection ready");
        connection
    }

    /// Bytes requested per socket read when draining.
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    pub fn sequence_id(&self) -> u64 {
        self.sequence_id
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// True while a response body is still outstanding.
    pub fn is_response_pending(&self) -> bool {
        match self.exchange {
            Exchange::Idle => false,
            Exchange::Remaining(n) => n > 0,
            Exchange::UntilClose => true,
        }
    }

    /// Whether another exchange can run on this socket.
    pub fn is_reusable(&self) -> bool {
        self.policy.is_connected() && !self.peer_closed && !self.is_response_pending()
    }

    /// Write an already-serialized request.
    ///
    /// Fails with a state error while the previous response body is unread:
    /// its bytes would otherwise be taken for the next response.
    pub async fn send(&mut self, request: &[u8]) -> Result<Written> {
        if self.is_response_pending() {
            return Err(StateError::ResponsePending.into());
        }
        let written = self.policy.write(request).await?;
        tracing::trace!(
            connection_id = %self.id,
            bytes = request.len(),
            outcome = ?written,
            "Request written"
        );
        Ok(written)
    }

    /// Start a new exchange. Bodies created earlier become stale.
    ///
    /// Fails with a state error while the previous body still has unread
    /// bytes: they would be taken for the start of the new body.
    pub fn begin_response(&mut self, framing: Framing) -> Result<u64> {
        if self.is_response_pending() {
            return Err(StateError::ResponsePending.into());
        }
        self.sequence_id += 1;
        self.exchange = match framing {
            Framing::Length(n) => Exchange::Remaining(n),
            Framing::UntilClose => Exchange::UntilClose,
        };
        tracing::debug!(
            connection_id = %self.id,
            sequence_id = self.sequence_id,
            framing = ?framing,
            "Response started"
        );
        Ok(self.sequence_id)
    }

    /// Next slice of the current body; never reads past its end.
    pub async fn read_partial(&mut self, max: usize) -> Result<Chunk> {
        let chunk = match self.exchange {
            Exchange::Idle | Exchange::Remaining(0) => {
                self.exchange = Exchange::Idle;
                Chunk::EndOfStream
            }
            Exchange::Remaining(left) => {
                let want = usize::try_from(left).map_or(max, |left| left.min(max));
                match self.policy.read_partial(want).await? {
                    Chunk::Data(bytes) => {
                        self.exchange = Exchange::Remaining(left - bytes.len() as u64);
                        Chunk::Data(bytes)
                    }
                    Chunk::EndOfStream => {
                        self.peer_closed = true;
                        return Err(Error::Io(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            format!("connection closed with {} body bytes outstanding", left),
                        )));
                    }
                }
            }
            Exchange::UntilClose => match self.policy.read_partial(max).await? {
                Chunk::Data(bytes) => Chunk::Data(bytes),
                Chunk::EndOfStream => {
                    self.peer_closed = true;
                    self.exchange = Exchange::Idle;
                    Chunk::EndOfStream
                }
            },
        };

        if let Chunk::Data(bytes) = &chunk {
            tracing::trace!(
                connection_id = %self.id,
                sequence_id = self.sequence_id,
                bytes = bytes.len(),
                "Body chunk read"
            );
        }
        Ok(chunk)
    }

    /// Read off whatever is left of the current body and discard it.
    /// Returns the number of bytes skipped.
    pub async fn finish_response(&mut self) -> Result<u64> {
        let mut skipped = 0u64;
        let size = self.buffer_size;
        while let Chunk::Data(bytes) = self.read_partial(size).await? {
            skipped += bytes.len() as u64;
        }
        if skipped > 0 {
            tracing::debug!(connection_id = %self.id, skipped, "Discarded unread body bytes");
        }
        Ok(skipped)
    }

    /// Read and return the rest of the current body without a `Body`.
    pub async fn read_to_end(&mut self) -> Result<Bytes> {
        let mut buf = bytes::BytesMut::new();
        let size = self.buffer_size;
        while let Chunk::Data(bytes) = self.read_partial(size).await? {
            buf.extend_from_slice(&bytes);
        }
        Ok(buf.freeze())
    }

    /// Drop the socket. Later reads see end-of-stream; writes fail.
    pub fn close(&mut self) -> Option<P::Socket> {
        self.exchange = Exchange::Idle;
        let socket = self.policy.take_socket();
        if socket.is_some() {
            tracing::debug!(connection_id = %self.id, "Connection closed");
        }
        socket
    }

    /// Share the connection so response bodies can reach it.
    pub fn into_shared(self) -> SharedClient<Self> {
        Arc::new(Mutex::new(self))
    }
}

impl<P: TimeoutPolicy> BodySource for Connection<P> {
    fn sequence_id(&self) -> u64 {
        self.sequence_id
    }

    async fn read_partial(&mut self, max: usize) -> Result<Chunk> {
        Connection::read_partial(self, max).await
    }
}

impl<P> fmt::Debug for Connection<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("secure", &self.secure)
            .field("sequence_id", &self.sequence_id)
            .field("exchange", &self.exchange)
            .finish_non_exhaustive()
    }
}
