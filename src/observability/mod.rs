//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! timeout policies, connection, body:
//!     → tracing events (structured fields: host, port, operation, sequence_id)
//!     → metrics.rs (counters through the `metrics` facade)
//!
//! Consumers:
//!     → logging.rs subscriber (stderr) when the binary or a test installs it
//!     → whatever metrics recorder the embedding application installs
//! ```
//!
//! # Design Decisions
//! - The library never installs a global subscriber or recorder by itself
//! - Metrics are cheap (no-ops until a recorder exists)

pub mod logging;
pub mod metrics;
