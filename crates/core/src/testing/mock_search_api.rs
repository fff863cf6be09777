//! Mock search API for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::artist_store::ArtistRecord;
use crate::search_api::{ArtistPage, SearchApi, SearchApiError};

/// A recorded search call for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedSearch {
    pub query: String,
    pub offset: u32,
    pub limit: u32,
}

/// Mock implementation of the SearchApi trait.
///
/// Provides controllable behavior for testing:
/// - Return configurable per-query result sets, served page by page
/// - Track search and ingestion calls for assertions
/// - Simulate failures
pub struct MockSearchApi {
    /// Full result set per query; pages are sliced on demand.
    results: Arc<RwLock<HashMap<String, Vec<ArtistRecord>>>>,
    /// Recorded search calls.
    searches: Arc<RwLock<Vec<RecordedSearch>>>,
    /// Artist batches submitted for ingestion.
    artist_batches: Arc<RwLock<Vec<Vec<String>>>>,
    /// Genre batches submitted for ingestion.
    genre_batches: Arc<RwLock<Vec<HashMap<String, Vec<String>>>>>,
    /// If set, the next search will fail with this error.
    next_error: Arc<RwLock<Option<SearchApiError>>>,
}

impl std::fmt::Debug for MockSearchApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSearchApi").finish_non_exhaustive()
    }
}

impl Default for MockSearchApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSearchApi {
    /// Create a new mock with no results configured.
    pub fn new() -> Self {
        Self {
            results: Arc::new(RwLock::new(HashMap::new())),
            searches: Arc::new(RwLock::new(Vec::new())),
            artist_batches: Arc::new(RwLock::new(Vec::new())),
            genre_batches: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Configure the full result set for a query.
    pub async fn set_results(&self, query: &str, artists: Vec<ArtistRecord>) {
        self.results.write().await.insert(query.to_string(), artists);
    }

    /// Make the next search call fail with the given error.
    pub async fn fail_next(&self, error: SearchApiError) {
        *self.next_error.write().await = Some(error);
    }

    /// All recorded search calls, in order.
    pub async fn recorded_searches(&self) -> Vec<RecordedSearch> {
        self.searches.read().await.clone()
    }

    /// All artist batches submitted for ingestion, in order.
    pub async fn ingested_artist_batches(&self) -> Vec<Vec<String>> {
        self.artist_batches.read().await.clone()
    }

    /// All genre batches submitted for ingestion, in order.
    pub async fn ingested_genre_batches(&self) -> Vec<HashMap<String, Vec<String>>> {
        self.genre_batches.read().await.clone()
    }
}

#[async_trait]
impl SearchApi for MockSearchApi {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search_artists(
        &self,
        query: &str,
        offset: u32,
        limit: u32,
    ) -> Result<ArtistPage, SearchApiError> {
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        self.searches.write().await.push(RecordedSearch {
            query: query.to_string(),
            offset,
            limit,
        });

        let results = self.results.read().await;
        let all = results.get(query).map(Vec::as_slice).unwrap_or(&[]);
        let start = (offset as usize).min(all.len());
        let end = (start + limit as usize).min(all.len());

        Ok(ArtistPage {
            artists: all[start..end].to_vec(),
            total: all.len() as u32,
        })
    }

    async fn ingest_artists(
        &self,
        ids: &[String],
        _max_albums: u32,
    ) -> Result<(), SearchApiError> {
        self.artist_batches.write().await.push(ids.to_vec());
        Ok(())
    }

    async fn ingest_genres(
        &self,
        genres: &HashMap<String, Vec<String>>,
    ) -> Result<(), SearchApiError> {
        self.genre_batches.write().await.push(genres.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artists(count: usize) -> Vec<ArtistRecord> {
        (0..count)
            .map(|i| ArtistRecord {
                id: format!("id-{:02}", i),
                name: format!("Artist {}", i),
                genres: vec![],
                popularity: 0,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_pages_are_sliced_from_full_results() {
        let api = MockSearchApi::new();
        api.set_results("abba", artists(7)).await;

        let first = api.search_artists("abba", 0, 5).await.unwrap();
        assert_eq!(first.artists.len(), 5);
        assert_eq!(first.total, 7);

        let second = api.search_artists("abba", 5, 5).await.unwrap();
        assert_eq!(second.artists.len(), 2);
        assert_eq!(second.artists[0].id, "id-05");
    }

    #[tokio::test]
    async fn test_unknown_query_returns_empty_page() {
        let api = MockSearchApi::new();
        let page = api.search_artists("nobody", 0, 5).await.unwrap();
        assert!(page.artists.is_empty());
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_fail_next_applies_once() {
        let api = MockSearchApi::new();
        api.fail_next(SearchApiError::Timeout).await;

        assert!(api.search_artists("abba", 0, 5).await.is_err());
        assert!(api.search_artists("abba", 0, 5).await.is_ok());
        // The failed call was never recorded.
        assert_eq!(api.recorded_searches().await.len(), 1);
    }
}
