//! Prometheus metrics for the coordination layer.
//!
//! This module provides metrics for:
//! - Rate limiter (admissions, rejections)
//! - Slot registry (acquisitions, rejections, lease expiry)
//! - Batch accumulators (drained batches)
//! - Seed generator (seeds handed out)
//! - Crawler (artists discovered, searches completed)

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Rate limiter
// =============================================================================

/// Search-API requests admitted through the rate window.
pub static REQUESTS_ADMITTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "crescendo_requests_admitted_total",
        "Total search API requests admitted by the rate limiter",
    )
    .unwrap()
});

/// Search-API requests rejected by the rate window.
pub static REQUESTS_REJECTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "crescendo_requests_rejected_total",
        "Total search API requests rejected by the rate limiter",
    )
    .unwrap()
});

// =============================================================================
// Slot registry
// =============================================================================

/// Search slots acquired.
pub static SLOTS_ACQUIRED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "crescendo_slots_acquired_total",
        "Total search slot leases acquired",
    )
    .unwrap()
});

/// Slot acquisitions rejected at capacity.
pub static SLOT_ACQUIRES_REJECTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "crescendo_slot_acquires_rejected_total",
        "Total slot acquisitions rejected because all slots were taken",
    )
    .unwrap()
});

/// Abandoned leases evicted by lazy expiry.
pub static LEASES_EXPIRED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "crescendo_leases_expired_total",
        "Total abandoned slot leases evicted after timeout",
    )
    .unwrap()
});

// =============================================================================
// Batch accumulators
// =============================================================================

/// Artist-ID batches drained for ingestion.
pub static ARTIST_BATCHES_DRAINED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "crescendo_artist_batches_drained_total",
        "Total artist ID batches drained for downstream ingestion",
    )
    .unwrap()
});

/// Genre batches drained for ingestion.
pub static GENRE_BATCHES_DRAINED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "crescendo_genre_batches_drained_total",
        "Total genre batches drained for downstream ingestion",
    )
    .unwrap()
});

// =============================================================================
// Seeder and crawler
// =============================================================================

/// Seeds handed out to workers.
pub static SEEDS_GENERATED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "crescendo_seeds_generated_total",
        "Total search seeds handed out to workers",
    )
    .unwrap()
});

/// Newly discovered artists.
pub static ARTISTS_DISCOVERED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "crescendo_artists_discovered_total",
        "Total artists seen for the first time",
    )
    .unwrap()
});

/// Completed seed crawls by result.
pub static SEARCHES_COMPLETED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "crescendo_searches_completed_total",
            "Total seed crawls completed",
        ),
        &["result"], // "ok", "failed"
    )
    .unwrap()
});

/// Artists returned per search page.
pub static SEARCH_PAGE_RESULTS: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "crescendo_search_page_results",
            "Number of artists returned per search API page",
        )
        .buckets(vec![0.0, 1.0, 5.0, 10.0, 25.0, 50.0]),
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(REQUESTS_ADMITTED.clone()),
        Box::new(REQUESTS_REJECTED.clone()),
        Box::new(SLOTS_ACQUIRED.clone()),
        Box::new(SLOT_ACQUIRES_REJECTED.clone()),
        Box::new(LEASES_EXPIRED.clone()),
        Box::new(ARTIST_BATCHES_DRAINED.clone()),
        Box::new(GENRE_BATCHES_DRAINED.clone()),
        Box::new(SEEDS_GENERATED.clone()),
        Box::new(ARTISTS_DISCOVERED.clone()),
        Box::new(SEARCHES_COMPLETED.clone()),
        Box::new(SEARCH_PAGE_RESULTS.clone()),
    ]
}
