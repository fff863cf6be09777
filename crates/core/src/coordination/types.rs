//! Types for the shared coordination layer.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default lease timeout for search slots, in seconds.
pub const DEFAULT_LEASE_TIMEOUT_SECS: f64 = 300.0;

/// Default number of items per downstream ingestion batch.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// One outbound search-API request inside the rate window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestRecord {
    /// Opaque request token (`{query}:{offset}:{timestamp}`).
    pub token: String,
    /// Search query string.
    pub query: String,
    /// Result page offset.
    pub offset: u32,
    /// Result page size.
    pub limit: u32,
    /// Epoch seconds when the request was admitted.
    pub timestamp: f64,
    /// Number of artists the request ended up returning.
    pub result_count: u32,
}

/// Snapshot of the sliding-window rate limiter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitStatus {
    /// Window length in seconds.
    pub window_seconds: u64,
    /// Requests currently inside the window.
    pub current_requests: usize,
    /// Maximum requests allowed per window.
    pub max_requests: usize,
    /// Remaining admissions before the window is full.
    pub remaining_requests: usize,
    /// Seconds until the oldest entry leaves the window, when at
    /// capacity. Zero whenever capacity remains.
    pub time_until_next_request: f64,
    /// Epoch seconds of the window start.
    pub window_start: f64,
    /// Epoch seconds of the window end ("now" at snapshot time).
    pub window_end: f64,
}

/// Errors from the shared coordination store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Coordination store is closed")]
    Closed,

    #[error("Coordination store error: {0}")]
    Database(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// Current time as fractional epoch seconds.
///
/// All window and lease arithmetic in this module compares these
/// values; there are no background timers.
pub fn now_secs() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
