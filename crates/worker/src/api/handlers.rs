use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crescendo_core::{Config, RateLimitStatus, RequestRecord};

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub store_open: bool,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        store_open: state.store_open(),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<Config> {
    Json(state.config().clone())
}

/// Combined coordination snapshot for dashboards.
#[derive(Serialize)]
pub struct StatusResponse {
    pub crawler_running: bool,
    pub active_searches: Vec<String>,
    pub pending_artists: usize,
    pub pending_genres: usize,
    pub rate_limit: RateLimitStatus,
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let crawler_running = state
        .runner()
        .map(|r| r.status().running)
        .unwrap_or(false);

    Json(StatusResponse {
        crawler_running,
        active_searches: state.slots().list_active(),
        pending_artists: state.artist_queue().count(),
        pending_genres: state.genre_map().count(),
        rate_limit: state.rate_limiter().status(),
    })
}

/// Rate window snapshot plus its live entries, newest first.
#[derive(Serialize)]
pub struct RateLimitResponse {
    #[serde(flatten)]
    pub status: RateLimitStatus,
    pub window: Vec<RequestRecord>,
}

pub async fn get_rate_limit(State(state): State<Arc<AppState>>) -> Json<RateLimitResponse> {
    Json(RateLimitResponse {
        status: state.rate_limiter().status(),
        window: state.rate_limiter().list_window(),
    })
}

#[derive(Serialize)]
pub struct ActiveSearchesResponse {
    pub count: usize,
    pub seeds: Vec<String>,
}

pub async fn list_searches(State(state): State<Arc<AppState>>) -> Json<ActiveSearchesResponse> {
    let seeds = state.slots().list_active();
    Json(ActiveSearchesResponse {
        count: seeds.len(),
        seeds,
    })
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> String {
    crate::metrics::collect_dynamic_metrics(&state);
    crate::metrics::encode_metrics()
}
