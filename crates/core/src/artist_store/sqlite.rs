use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection, TransactionBehavior};
use tracing::info;

use super::{ArtistRecord, ArtistStore, ArtistStoreError};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS artists (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    genres TEXT NOT NULL,
    popularity INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS search_progress (
    query TEXT PRIMARY KEY,
    artists_found INTEGER NOT NULL DEFAULT 0,
    completed_at TEXT NOT NULL
);
"#;

/// SQLite-backed artist store
pub struct SqliteArtistStore {
    conn: Mutex<Connection>,
}

impl SqliteArtistStore {
    /// Create a new SQLite artist store, creating the database file and
    /// tables if needed
    pub fn new(path: &Path) -> Result<Self, ArtistStoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory artist store (useful for testing)
    pub fn in_memory() -> Result<Self, ArtistStoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl ArtistStore for SqliteArtistStore {
    fn upsert_artists(
        &self,
        artists: &[ArtistRecord],
    ) -> Result<HashSet<String>, ArtistStoreError> {
        if artists.is_empty() {
            return Ok(HashSet::new());
        }

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut new_ids = HashSet::new();
        {
            let mut exists = tx.prepare("SELECT 1 FROM artists WHERE id = ?1")?;
            let mut insert = tx.prepare(
                "INSERT OR IGNORE INTO artists (id, name, genres, popularity)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;

            for artist in artists {
                let already = exists.exists(params![artist.id])?;
                if !already {
                    new_ids.insert(artist.id.clone());
                }
                let genres = serde_json::to_string(&artist.genres)
                    .map_err(|e| ArtistStoreError::Serialization(e.to_string()))?;
                insert.execute(params![artist.id, artist.name, genres, artist.popularity])?;
            }
        }
        tx.commit()?;

        info!(
            upserted = artists.len(),
            new = new_ids.len(),
            "Upserted artists"
        );
        Ok(new_ids)
    }

    fn existing_ids(&self, ids: &[String]) -> Result<HashSet<String>, ArtistStoreError> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }

        let conn = self.conn.lock().unwrap();
        let mut existing = HashSet::new();
        let mut stmt = conn.prepare("SELECT 1 FROM artists WHERE id = ?1")?;
        for id in ids {
            if stmt.exists(params![id])? {
                existing.insert(id.clone());
            }
        }
        Ok(existing)
    }

    fn completed_seeds(&self) -> Result<HashSet<String>, ArtistStoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT query FROM search_progress")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut seeds = HashSet::new();
        for row in rows {
            seeds.insert(row?);
        }
        Ok(seeds)
    }

    fn record_search_completed(
        &self,
        query: &str,
        artists_found: u32,
    ) -> Result<(), ArtistStoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO search_progress (query, artists_found, completed_at)
             VALUES (?1, ?2, ?3)",
            params![query, artists_found, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}
