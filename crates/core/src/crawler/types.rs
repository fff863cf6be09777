//! Types for the crawl runner.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while crawling a seed.
#[derive(Debug, Error)]
pub enum CrawlerError {
    /// Rate window stayed full through all admission retries.
    #[error("rate limit admission exhausted for seed '{query}' at offset {offset}")]
    AdmissionExhausted { query: String, offset: u32 },

    /// Search API error.
    #[error("search API error: {0}")]
    SearchApi(#[from] crate::search_api::SearchApiError),

    /// Artist store error.
    #[error("artist store error: {0}")]
    ArtistStore(#[from] crate::artist_store::ArtistStoreError),
}

/// Current status of the crawl runner.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlerStatus {
    /// Whether the crawl loop is running.
    pub running: bool,
    /// Seeds currently holding a search slot.
    pub active_slots: usize,
    /// Artist IDs buffered below the ingestion threshold.
    pub pending_artists: usize,
    /// Genre associations buffered below the ingestion threshold.
    pub pending_genres: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crawler_status_default() {
        let status = CrawlerStatus::default();
        assert!(!status.running);
        assert_eq!(status.active_slots, 0);
        assert_eq!(status.pending_artists, 0);
    }

    #[test]
    fn test_error_display() {
        let err = CrawlerError::AdmissionExhausted {
            query: "abba".to_string(),
            offset: 50,
        };
        assert_eq!(
            err.to_string(),
            "rate limit admission exhausted for seed 'abba' at offset 50"
        );
    }

    #[test]
    fn test_crawler_status_serialization() {
        let status = CrawlerStatus {
            running: true,
            active_slots: 3,
            pending_artists: 7,
            pending_genres: 2,
        };
        let json = serde_json::to_string(&status).unwrap();
        let parsed: CrawlerStatus = serde_json::from_str(&json).unwrap();
        assert!(parsed.running);
        assert_eq!(parsed.active_slots, 3);
        assert_eq!(parsed.pending_artists, 7);
    }
}
