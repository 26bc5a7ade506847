//! Client side of a persistent connection.
//!
//! # Data Flow
//! ```text
//! Connection::open / open_secure   (TimeoutPolicy::connect [+ connect_secure])
//!     → send(request bytes)        (TimeoutPolicy::write)
//!     → begin_response(framing)    (sequence_id += 1)
//!     → Body::new(shared)          (snapshots sequence_id)
//!     → Body pulls read_partial    (bounded by the framing, then TimeoutPolicy::read_partial)
//!     → finish_response            (drain leftovers so the socket can be reused)
//! ```
//!
//! # Design Decisions
//! - The sequence id is the only thing tying a body to its exchange
//! - Framing comes from the caller; header parsing lives elsewhere
//! - A connection never reads past the current body

pub mod connection;

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::Result;
use crate::timeout::Chunk;

pub use connection::{Connection, ConnectionId, Framing};

/// Handle through which a body reaches the connection it came from.
pub type SharedClient<C> = Arc<Mutex<C>>;

/// What a response body needs from its connection.
pub trait BodySource: Send {
    /// Generation counter; grows every time the connection starts serving a
    /// new request/response cycle.
    fn sequence_id(&self) -> u64;

    /// Next slice of the current response body, at most `max` bytes.
    /// Returns `Chunk::EndOfStream` once the body has been delivered.
    fn read_partial(&mut self, max: usize) -> impl Future<Output = Result<Chunk>> + Send;
}
