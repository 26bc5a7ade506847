//! Metrics collection.
//!
//! # Metrics
//! - `sluice_connections_total` (counter): connections opened, by `secure`
//! - `sluice_timeouts_total` (counter): bounded operations that expired, by `operation`
//! - `sluice_body_bytes_total` (counter): response body bytes handed to callers
//! - `sluice_stale_body_total` (counter): body operations rejected for a sequence mismatch

use crate::error::Operation;

pub const CONNECTIONS_TOTAL: &str = "sluice_connections_total";
pub const TIMEOUTS_TOTAL: &str = "sluice_timeouts_total";
pub const BODY_BYTES_TOTAL: &str = "sluice_body_bytes_total";
pub const STALE_BODY_TOTAL: &str = "sluice_stale_body_total";

/// Register descriptions with the installed recorder.
pub fn describe() {
    ::metrics::describe_counter!(CONNECTIONS_TOTAL, "Connections opened");
    ::metrics::describe_counter!(TIMEOUTS_TOTAL, "Socket operations that exceeded their bound");
    ::metrics::describe_counter!(
        BODY_BYTES_TOTAL,
        ::metrics::Unit::Bytes,
        "Response body bytes delivered"
    );
    ::metrics::describe_counter!(STALE_BODY_TOTAL, "Body operations on a stale sequence id");
}

pub fn record_connection(secure: bool) {
    let secure = if secure { "true" } else { "false" };
    ::metrics::counter!(CONNECTIONS_TOTAL, "secure" => secure).increment(1);
}

pub fn record_timeout(operation: Operation) {
    ::metrics::counter!(TIMEOUTS_TOTAL, "operation" => operation.as_str()).increment(1);
}

pub fn record_body_bytes(bytes: usize) {
    ::metrics::counter!(BODY_BYTES_TOTAL).increment(bytes as u64);
}

pub fn record_stale_body() {
    ::metrics::counter!(STALE_BODY_TOTAL).increment(1);
}
