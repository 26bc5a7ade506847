//! Response payload access.
//!
//! A `Body` is tied to one request/response exchange on a persistent
//! connection. It can be consumed exactly one way: streamed chunk by chunk,
//! or materialized in full and then re-read freely.

pub mod body;

pub use body::{Body, BodyState};
