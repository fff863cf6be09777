//! Types for the external search/ingestion API boundary.
//!
//! Only the interface is defined here; concrete HTTP clients live
//! outside this crate. Tests use the mock in [`crate::testing`].

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

use crate::artist_store::ArtistRecord;

/// One page of artist search results.
#[derive(Debug, Clone)]
pub struct ArtistPage {
    /// Artists on this page.
    pub artists: Vec<ArtistRecord>,
    /// Total matches reported by the API, across all pages.
    pub total: u32,
}

/// Errors that can occur talking to the external APIs.
#[derive(Debug, Error)]
pub enum SearchApiError {
    #[error("Search API connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Search API error: {0}")]
    ApiError(String),

    #[error("Request timeout")]
    Timeout,
}

/// Trait for the external artist search and batch-ingestion APIs.
#[async_trait]
pub trait SearchApi: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &str;

    /// Search for artists matching `query`, one page at a time.
    async fn search_artists(
        &self,
        query: &str,
        offset: u32,
        limit: u32,
    ) -> Result<ArtistPage, SearchApiError>;

    /// Submit a full batch of artist IDs to the ingestion API.
    /// `max_albums` is the downstream per-artist album cap.
    async fn ingest_artists(&self, ids: &[String], max_albums: u32)
        -> Result<(), SearchApiError>;

    /// Submit a full batch of artist→genre associations.
    async fn ingest_genres(
        &self,
        genres: &HashMap<String, Vec<String>>,
    ) -> Result<(), SearchApiError>;
}
