//! Threshold-triggered batch accumulators for downstream ingestion.
//!
//! Discovered artist IDs and artist→genre associations are buffered in
//! the coordination store until a full batch is available; the
//! length-check and drain happen inside one transaction, so concurrent
//! enqueuers can never drain overlapping or partial batches.
//!
//! The two accumulators deliberately differ: the artist queue drains
//! strictly in arrival order, the genre map drains in no particular
//! order.

use std::collections::HashMap;
use std::sync::Arc;

use rusqlite::params;
use tracing::{debug, error, info, warn};

use crate::metrics;

use super::CoordinationDb;

/// FIFO buffer of artist IDs awaiting batch ingestion.
pub struct PendingArtistQueue {
    db: Arc<CoordinationDb>,
    batch_size: usize,
}

impl PendingArtistQueue {
    pub fn new(db: Arc<CoordinationDb>, batch_size: usize) -> Self {
        Self { db, batch_size }
    }

    /// Append `ids` to the queue and drain one batch if the threshold
    /// is reached.
    ///
    /// Returns exactly `batch_size` IDs in original arrival order, or
    /// an empty vec when the queue is still below the threshold (or
    /// the store is unreachable).
    pub fn enqueue(&self, ids: &[String]) -> Vec<String> {
        if ids.is_empty() {
            return Vec::new();
        }

        let batch_size = self.batch_size;
        let result = self.db.with_tx(|tx| {
            {
                let mut insert =
                    tx.prepare("INSERT INTO pending_artists (artist_id) VALUES (?1)")?;
                for id in ids {
                    insert.execute(params![id])?;
                }
            }

            let count: i64 =
                tx.query_row("SELECT COUNT(*) FROM pending_artists", [], |row| row.get(0))?;
            debug!(count, "Pending artists after enqueue");

            if (count as usize) < batch_size {
                return Ok(Vec::new());
            }

            let head: Vec<(i64, String)> = {
                let mut stmt = tx.prepare(
                    "SELECT seq, artist_id FROM pending_artists ORDER BY seq ASC LIMIT ?1",
                )?;
                let rows = stmt.query_map(params![batch_size as i64], |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })?;
                rows.collect::<Result<Vec<_>, _>>()?
            };

            {
                let mut delete = tx.prepare("DELETE FROM pending_artists WHERE seq = ?1")?;
                for (seq, _) in &head {
                    delete.execute(params![seq])?;
                }
            }

            Ok(head.into_iter().map(|(_, id)| id).collect())
        });

        match result {
            Ok(batch) => {
                if !batch.is_empty() {
                    metrics::ARTIST_BATCHES_DRAINED.inc();
                    info!(size = batch.len(), "Drained artist batch for ingestion");
                }
                batch
            }
            Err(e) => {
                error!("Error enqueuing pending artists: {}", e);
                Vec::new()
            }
        }
    }

    /// Current queue length. Informational only.
    pub fn count(&self) -> usize {
        let result = self.db.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM pending_artists", [], |row| {
                row.get::<_, i64>(0)
            })
        });

        match result {
            Ok(n) => n as usize,
            Err(e) => {
                error!("Error counting pending artists: {}", e);
                0
            }
        }
    }
}

/// Accumulator of artist→genre associations awaiting batch ingestion.
///
/// Re-adding an artist before a drain overwrites its genre list.
pub struct PendingGenreMap {
    db: Arc<CoordinationDb>,
    batch_size: usize,
}

impl PendingGenreMap {
    pub fn new(db: Arc<CoordinationDb>, batch_size: usize) -> Self {
        Self { db, batch_size }
    }

    /// Merge `assoc` into the map and drain one batch if the threshold
    /// is reached.
    ///
    /// Returns exactly `batch_size` associations, removed atomically
    /// with the drain. Selection order is unspecified.
    pub fn enqueue(&self, assoc: &HashMap<String, Vec<String>>) -> HashMap<String, Vec<String>> {
        if assoc.is_empty() {
            return HashMap::new();
        }

        let batch_size = self.batch_size;
        let result = self.db.with_tx(|tx| {
            {
                let mut upsert = tx.prepare(
                    "INSERT OR REPLACE INTO pending_genres (artist_id, genres) VALUES (?1, ?2)",
                )?;
                for (artist_id, genres) in assoc {
                    let encoded = serde_json::to_string(genres).unwrap_or_else(|_| "[]".into());
                    upsert.execute(params![artist_id, encoded])?;
                }
            }

            let count: i64 =
                tx.query_row("SELECT COUNT(*) FROM pending_genres", [], |row| row.get(0))?;
            debug!(count, "Pending genre associations after enqueue");

            if (count as usize) < batch_size {
                return Ok(Vec::new());
            }

            // No ORDER BY: this structure makes no ordering promise.
            let taken: Vec<(String, String)> = {
                let mut stmt =
                    tx.prepare("SELECT artist_id, genres FROM pending_genres LIMIT ?1")?;
                let rows = stmt.query_map(params![batch_size as i64], |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })?;
                rows.collect::<Result<Vec<_>, _>>()?
            };

            {
                let mut delete = tx.prepare("DELETE FROM pending_genres WHERE artist_id = ?1")?;
                for (artist_id, _) in &taken {
                    delete.execute(params![artist_id])?;
                }
            }

            Ok(taken)
        });

        match result {
            Ok(taken) if taken.is_empty() => HashMap::new(),
            Ok(taken) => {
                let mut batch = HashMap::new();
                for (artist_id, encoded) in taken {
                    match serde_json::from_str::<Vec<String>>(&encoded) {
                        Ok(genres) => {
                            batch.insert(artist_id, genres);
                        }
                        Err(e) => {
                            warn!(artist_id, "Dropping unreadable genre record: {}", e);
                        }
                    }
                }
                metrics::GENRE_BATCHES_DRAINED.inc();
                info!(size = batch.len(), "Drained genre batch for ingestion");
                batch
            }
            Err(e) => {
                error!("Error enqueuing pending genres: {}", e);
                HashMap::new()
            }
        }
    }

    /// Current number of buffered associations. Informational only.
    pub fn count(&self) -> usize {
        let result = self.db.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM pending_genres", [], |row| {
                row.get::<_, i64>(0)
            })
        });

        match result {
            Ok(n) => n as usize,
            Err(e) => {
                error!("Error counting pending genres: {}", e);
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(range: std::ops::Range<u32>) -> Vec<String> {
        range.map(|i| format!("artist-{:02}", i)).collect()
    }

    fn artist_queue(batch_size: usize) -> PendingArtistQueue {
        let db = Arc::new(CoordinationDb::in_memory().unwrap());
        PendingArtistQueue::new(db, batch_size)
    }

    fn genre_map(batch_size: usize) -> PendingGenreMap {
        let db = Arc::new(CoordinationDb::in_memory().unwrap());
        PendingGenreMap::new(db, batch_size)
    }

    #[test]
    fn test_queue_below_threshold_returns_empty() {
        let queue = artist_queue(10);
        let batch = queue.enqueue(&ids(0..9));
        assert!(batch.is_empty());
        assert_eq!(queue.count(), 9);
    }

    #[test]
    fn test_queue_drains_in_arrival_order() {
        let queue = artist_queue(10);
        assert!(queue.enqueue(&ids(0..9)).is_empty());

        let batch = queue.enqueue(&[String::from("artist-09")]);
        assert_eq!(batch, ids(0..10));
        assert_eq!(queue.count(), 0);
    }

    #[test]
    fn test_queue_drains_exactly_batch_size() {
        let queue = artist_queue(10);
        // 25 at once: one drain of 10, remainder stays queued.
        let batch = queue.enqueue(&ids(0..25));
        assert_eq!(batch, ids(0..10));
        assert_eq!(queue.count(), 15);

        // A later enqueue pushes past the threshold again.
        let batch = queue.enqueue(&ids(25..26));
        assert_eq!(batch, ids(10..20));
        assert_eq!(queue.count(), 6);
    }

    #[test]
    fn test_queue_preserves_order_across_interleaved_enqueues() {
        let queue = artist_queue(4);
        assert!(queue.enqueue(&ids(0..2)).is_empty());
        assert!(queue.enqueue(&ids(2..3)).is_empty());
        let batch = queue.enqueue(&ids(3..4));
        assert_eq!(batch, ids(0..4));
    }

    #[test]
    fn test_queue_empty_input_is_noop() {
        let queue = artist_queue(1);
        assert!(queue.enqueue(&[]).is_empty());
        assert_eq!(queue.count(), 0);
    }

    #[test]
    fn test_queue_closed_store_returns_empty() {
        let db = Arc::new(CoordinationDb::in_memory().unwrap());
        let queue = PendingArtistQueue::new(Arc::clone(&db), 2);
        db.close();
        assert!(queue.enqueue(&ids(0..5)).is_empty());
        assert_eq!(queue.count(), 0);
    }

    fn assoc(range: std::ops::Range<u32>) -> HashMap<String, Vec<String>> {
        range
            .map(|i| {
                (
                    format!("artist-{:02}", i),
                    vec![format!("genre-{}", i % 3)],
                )
            })
            .collect()
    }

    #[test]
    fn test_genre_map_below_threshold_returns_empty() {
        let map = genre_map(10);
        assert!(map.enqueue(&assoc(0..9)).is_empty());
        assert_eq!(map.count(), 9);
    }

    #[test]
    fn test_genre_map_drains_full_batch_unordered() {
        let map = genre_map(10);
        assert!(map.enqueue(&assoc(0..9)).is_empty());

        let batch = map.enqueue(&assoc(9..10));
        // Key set matches the inputs; no ordering promise to check.
        assert_eq!(batch.len(), 10);
        for i in 0..10 {
            assert!(batch.contains_key(&format!("artist-{:02}", i)));
        }
        assert_eq!(map.count(), 0);
    }

    #[test]
    fn test_genre_map_last_write_wins() {
        let map = genre_map(10);
        let mut first = HashMap::new();
        first.insert("artist-00".to_string(), vec!["rock".to_string()]);
        assert!(map.enqueue(&first).is_empty());

        let mut second = HashMap::new();
        second.insert(
            "artist-00".to_string(),
            vec!["jazz".to_string(), "fusion".to_string()],
        );
        assert!(map.enqueue(&second).is_empty());
        assert_eq!(map.count(), 1);

        // Fill up to the threshold and inspect the drained entry.
        let batch = map.enqueue(&assoc(1..10));
        assert_eq!(
            batch.get("artist-00"),
            Some(&vec!["jazz".to_string(), "fusion".to_string()])
        );
    }

    #[test]
    fn test_genre_map_drains_exactly_batch_size() {
        let map = genre_map(5);
        let batch = map.enqueue(&assoc(0..12));
        assert_eq!(batch.len(), 5);
        assert_eq!(map.count(), 7);

        // Drained IDs are gone; no ID can appear in two drains.
        let second = map.enqueue(&assoc(12..17));
        assert_eq!(second.len(), 5);
        for key in second.keys() {
            assert!(!batch.contains_key(key));
        }
    }

    #[test]
    fn test_genre_map_closed_store_returns_empty() {
        let db = Arc::new(CoordinationDb::in_memory().unwrap());
        let map = PendingGenreMap::new(Arc::clone(&db), 2);
        db.close();
        assert!(map.enqueue(&assoc(0..5)).is_empty());
        assert_eq!(map.count(), 0);
    }
}
