//! Timeout-governed transport and sequence-checked response bodies for
//! persistent HTTP connections.
//!
//! # Architecture Overview
//!
//! ```text
//!   caller
//!     │  Body::read_partial / chunks / text
//!     ▼
//!   response::Body ──(sequence id check)──▶ client::Connection
//!                                              │  read_partial / send
//!                                              ▼
//!                                        timeout::TimeoutPolicy
//!                                        (Null | PerOperation)
//!                                              │  try_* + readiness waits
//!                                              ▼
//!                                        net::Socket (TCP | TLS)
//! ```
//!
//! A connection serves many request/response exchanges. Each exchange bumps
//! the connection's sequence id; a body remembers the id it was created
//! under and refuses to read once the connection has moved on.

pub mod client;
pub mod config;
pub mod error;
pub mod net;
pub mod observability;
pub mod response;
pub mod timeout;

pub use client::{BodySource, Connection, Framing, SharedClient};
pub use config::{SluiceConfig, TimeoutConfig, TimeoutMode};
pub use error::{Error, Operation, Result, StateError};
pub use response::{Body, BodyState};
pub use timeout::{Chunk, NullTimeout, PerOperationTimeout, Timeout, TimeoutPolicy, Written};
