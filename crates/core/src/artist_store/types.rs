//! Types for artist persistence.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// An artist record as returned by the search API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtistRecord {
    /// Stable artist ID from the upstream catalog.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Genre tags, possibly empty.
    #[serde(default)]
    pub genres: Vec<String>,
    /// Popularity score 0-100.
    #[serde(default)]
    pub popularity: u32,
}

/// Errors from the artist persistence layer.
#[derive(Debug, Error)]
pub enum ArtistStoreError {
    #[error("Artist store error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<rusqlite::Error> for ArtistStoreError {
    fn from(e: rusqlite::Error) -> Self {
        ArtistStoreError::Database(e.to_string())
    }
}

/// Trait for artist persistence backends.
///
/// The coordination layer only depends on these narrow operations:
/// idempotent upsert, existence checks, and search-completion
/// bookkeeping for the seed generator.
pub trait ArtistStore: Send + Sync {
    /// Upsert artists, no-op on conflict. Returns the IDs that did not
    /// exist before this call.
    fn upsert_artists(&self, artists: &[ArtistRecord]) -> Result<HashSet<String>, ArtistStoreError>;

    /// Subset of `ids` already persisted.
    fn existing_ids(&self, ids: &[String]) -> Result<HashSet<String>, ArtistStoreError>;

    /// All search seeds that have been fully crawled.
    fn completed_seeds(&self) -> Result<HashSet<String>, ArtistStoreError>;

    /// Mark a search seed as fully crawled.
    fn record_search_completed(&self, query: &str, artists_found: u32)
        -> Result<(), ArtistStoreError>;
}
