//! Shared coordination store connection.
//!
//! All worker processes open the same SQLite database and synchronize
//! exclusively through the transactional operations in this module's
//! siblings (`rate_limiter`, `slots`, `batching`). Opening the store is
//! the one operation that fails loudly; everything built on top
//! degrades to safe defaults when the store is unreachable.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, TransactionBehavior};
use tracing::debug;

use super::StoreError;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS rate_window (
    token TEXT PRIMARY KEY,
    ts REAL NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_rate_window_ts ON rate_window(ts);

CREATE TABLE IF NOT EXISTS request_details (
    token TEXT PRIMARY KEY,
    query TEXT NOT NULL,
    start_offset INTEGER NOT NULL,
    page_limit INTEGER NOT NULL,
    ts REAL NOT NULL,
    result_count INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS slot_leases (
    token TEXT PRIMARY KEY,
    acquired_at REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS pending_artists (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    artist_id TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS pending_genres (
    artist_id TEXT PRIMARY KEY,
    genres TEXT NOT NULL
);
"#;

/// Handle to the shared coordination store.
///
/// Safe to share across tasks behind an `Arc`. `close` is idempotent;
/// operations attempted after close surface as `StoreError::Closed`,
/// which callers absorb into their reject/empty defaults.
pub struct CoordinationDb {
    conn: Mutex<Option<Connection>>,
}

impl CoordinationDb {
    /// Open (or create) the coordination store at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        // WAL lets concurrent worker processes interleave readers with
        // the single writer instead of failing on lock contention.
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "busy_timeout", 5000)?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }

    /// Open an in-memory coordination store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }

    /// Close the store connection. Safe to call more than once.
    pub fn close(&self) {
        let mut guard = self.conn.lock().unwrap();
        if guard.take().is_some() {
            debug!("Coordination store closed");
        }
    }

    /// Whether the connection is currently open.
    pub fn is_open(&self) -> bool {
        self.conn.lock().unwrap().is_some()
    }

    /// Run a closure against the open connection.
    pub(crate) fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> Result<T, rusqlite::Error>,
    ) -> Result<T, StoreError> {
        let mut guard = self.conn.lock().unwrap();
        let conn = guard.as_mut().ok_or(StoreError::Closed)?;
        Ok(f(conn)?)
    }

    /// Run a closure inside an immediate (write-locked) transaction.
    ///
    /// Taking the write lock up front is what makes the
    /// check-then-mutate sequences in the admission paths indivisible
    /// across worker processes.
    pub(crate) fn with_tx<T>(
        &self,
        f: impl FnOnce(&rusqlite::Transaction<'_>) -> Result<T, rusqlite::Error>,
    ) -> Result<T, StoreError> {
        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let out = f(&tx)?;
            tx.commit()?;
            Ok(out)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_schema() {
        let db = CoordinationDb::in_memory().unwrap();
        let count: i64 = db
            .with_conn(|conn| {
                conn.query_row("SELECT COUNT(*) FROM rate_window", [], |row| row.get(0))
            })
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_close_is_idempotent() {
        let db = CoordinationDb::in_memory().unwrap();
        assert!(db.is_open());
        db.close();
        db.close();
        assert!(!db.is_open());
    }

    #[test]
    fn test_operations_after_close_fail() {
        let db = CoordinationDb::in_memory().unwrap();
        db.close();
        let result = db.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
        });
        assert!(matches!(result, Err(StoreError::Closed)));
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coordination.db");
        let db = CoordinationDb::open(&path).unwrap();
        assert!(db.is_open());
        assert!(path.exists());
    }
}
