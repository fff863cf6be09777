//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring a crescendo worker:
//! - HTTP request metrics for the status API
//! - Coordination state gauges (collected dynamically)
//! - Core crawl metrics, registered from the core crate

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "crescendo_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("crescendo_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

// =============================================================================
// Coordination gauges (collected dynamically)
// =============================================================================

/// Crawl runner running state (1 = running, 0 = stopped).
pub static CRAWLER_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "crescendo_crawler_running",
        "Whether the crawl runner is running (1) or stopped (0)",
    )
    .unwrap()
});

/// Requests currently inside the rate window.
pub static RATE_WINDOW_OCCUPANCY: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "crescendo_rate_window_occupancy",
        "Requests currently inside the sliding rate window",
    )
    .unwrap()
});

/// Searches currently holding a slot lease.
pub static SEARCHES_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "crescendo_searches_active",
        "Searches currently holding a concurrency slot",
    )
    .unwrap()
});

/// Artist IDs buffered below the ingestion threshold.
pub static PENDING_ARTISTS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "crescendo_pending_artists",
        "Artist IDs buffered awaiting a full ingestion batch",
    )
    .unwrap()
});

/// Genre associations buffered below the ingestion threshold.
pub static PENDING_GENRES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "crescendo_pending_genres",
        "Genre associations buffered awaiting a full ingestion batch",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();

    registry
        .register(Box::new(CRAWLER_RUNNING.clone()))
        .unwrap();
    registry
        .register(Box::new(RATE_WINDOW_OCCUPANCY.clone()))
        .unwrap();
    registry
        .register(Box::new(SEARCHES_ACTIVE.clone()))
        .unwrap();
    registry
        .register(Box::new(PENDING_ARTISTS.clone()))
        .unwrap();
    registry.register(Box::new(PENDING_GENRES.clone())).unwrap();

    // Core crawl metrics (rate limiter, slots, batching, seeder)
    for metric in crescendo_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so gauges reflect the coordination store at
/// scrape time.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let rate_status = state.rate_limiter().status();
    RATE_WINDOW_OCCUPANCY.set(rate_status.current_requests as i64);
    SEARCHES_ACTIVE.set(state.slots().count() as i64);
    PENDING_ARTISTS.set(state.artist_queue().count() as i64);
    PENDING_GENRES.set(state.genre_map().count() as i64);

    let running = state
        .runner()
        .map(|r| r.status().running)
        .unwrap_or(false);
    CRAWLER_RUNNING.set(if running { 1 } else { 0 });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("crescendo_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_coordination_gauges() {
        RATE_WINDOW_OCCUPANCY.set(0);
        SEARCHES_ACTIVE.set(0);
        PENDING_ARTISTS.set(0);
        PENDING_GENRES.set(0);
        CRAWLER_RUNNING.set(0);

        let output = encode_metrics();
        assert!(output.contains("crescendo_rate_window_occupancy"));
        assert!(output.contains("crescendo_searches_active"));
        assert!(output.contains("crescendo_pending_artists"));
        assert!(output.contains("crescendo_pending_genres"));
        assert!(output.contains("crescendo_crawler_running"));
    }
}
