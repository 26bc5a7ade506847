//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Connector::open(host, port)
//!     → socket.rs (Socket: non-blocking try_* primitives + readiness waits)
//!     → tls.rs (optional: rustls session driven over the same primitives)
//!     → owned by a TimeoutPolicy for the connection's lifetime
//! ```
//!
//! # Design Decisions
//! - Every socket exposes both non-blocking (`try_*`) and blocking primitives;
//!   the timeout policy decides which ones to use
//! - Readiness waits go through tokio's reactor, never a busy loop
//! - The TLS handshake is a resumable step function so it can be bounded per wait

pub mod connector;
pub mod socket;
pub mod tls;

pub use connector::{Connector, TcpConnector};
pub use socket::{Handshake, Socket, TcpSocket};
pub use tls::{TlsConnector, TlsSocket};
