//! Shared-state coordination primitives.
//!
//! Independent crawl workers cooperate without a central scheduler by
//! going through the atomic operations in this module: a
//! sliding-window rate limiter for outbound API calls, a lease-based
//! slot registry bounding concurrent searches, and threshold-triggered
//! batch accumulators feeding the downstream ingestion API.
//!
//! Every admission-style call returns immediately with accept/reject
//! or batch/empty; backoff-and-retry is worker-loop policy, not
//! coordination-layer behavior.

mod batching;
mod db;
mod rate_limiter;
mod slots;
mod types;

pub use batching::{PendingArtistQueue, PendingGenreMap};
pub use db::CoordinationDb;
pub use rate_limiter::RateLimiter;
pub use slots::SearchSlotRegistry;
pub use types::*;
