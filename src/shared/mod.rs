//! Shared utilities used across the cache modules.
//!
//! This module provides:
//! - `error`: Result extension traits for error context
//! - `now_ms`: the wall-clock read used for recency bookkeeping

pub mod error;

pub use error::{OptionExt, ResultExt};

/// Get current timestamp in milliseconds
///
/// A clock stuck before the epoch degrades to 0 rather than failing;
/// recency bookkeeping never raises.
pub(crate) fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
