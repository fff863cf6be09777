//! Lease-based semaphore bounding concurrent in-flight searches.
//!
//! This is not a blocking semaphore: a failed `acquire` is an ordinary
//! rejection and the caller retries later. Leases self-expire through
//! lazy timestamp checks, so a worker that dies mid-search releases
//! its slot within one lease timeout instead of holding capacity
//! forever.

use std::sync::Arc;

use rusqlite::params;
use tracing::{error, info};

use crate::metrics;

use super::{now_secs, CoordinationDb, StoreError};

/// Registry of active search leases.
pub struct SearchSlotRegistry {
    db: Arc<CoordinationDb>,
    max_slots: usize,
    lease_timeout_seconds: f64,
}

impl SearchSlotRegistry {
    /// Create the registry and sweep any leases left behind by a
    /// previous run.
    pub fn new(db: Arc<CoordinationDb>, max_slots: usize, lease_timeout_seconds: f64) -> Self {
        let registry = Self {
            db,
            max_slots,
            lease_timeout_seconds,
        };
        if let Err(e) = registry.sweep_expired() {
            error!("Error cleaning up stale search leases: {}", e);
        }
        registry
    }

    /// Try to claim a concurrency slot for `token`.
    ///
    /// Counts only live leases, so an expired-but-not-yet-pruned lease
    /// never blocks capacity. Store failures reject.
    pub fn acquire(&self, token: &str) -> bool {
        let now = now_secs();
        let live_after = now - self.lease_timeout_seconds;
        let max_slots = self.max_slots;

        let result = self.db.with_tx(|tx| {
            let live: i64 = tx.query_row(
                "SELECT COUNT(*) FROM slot_leases WHERE acquired_at > ?1",
                params![live_after],
                |row| row.get(0),
            )?;

            if live as usize >= max_slots {
                return Ok(false);
            }

            tx.execute(
                "INSERT OR REPLACE INTO slot_leases (token, acquired_at) VALUES (?1, ?2)",
                params![token, now],
            )?;
            Ok(true)
        });

        match result {
            Ok(true) => {
                metrics::SLOTS_ACQUIRED.inc();
                info!(token, "Acquired search slot");
                true
            }
            Ok(false) => {
                metrics::SLOT_ACQUIRES_REJECTED.inc();
                false
            }
            Err(e) => {
                error!(token, "Error acquiring search slot: {}", e);
                false
            }
        }
    }

    /// Release the lease for `token`.
    ///
    /// Idempotent: releasing a missing or already-expired lease is not
    /// an error.
    pub fn release(&self, token: &str) {
        let result = self.db.with_conn(|conn| {
            conn.execute("DELETE FROM slot_leases WHERE token = ?1", params![token])
        });

        match result {
            Ok(n) if n > 0 => info!(token, "Released search slot"),
            Ok(_) => {}
            Err(e) => error!(token, "Error releasing search slot: {}", e),
        }
    }

    /// Tokens of all live leases, evicting expired ones first.
    pub fn list_active(&self) -> Vec<String> {
        if let Err(e) = self.sweep_expired() {
            error!("Error cleaning up stale search leases: {}", e);
        }

        let result = self.db.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT token FROM slot_leases ORDER BY acquired_at")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            rows.collect::<Result<Vec<_>, _>>()
        });

        match result {
            Ok(tokens) => tokens,
            Err(e) => {
                error!("Error listing active searches: {}", e);
                Vec::new()
            }
        }
    }

    /// Number of live leases.
    pub fn count(&self) -> usize {
        self.list_active().len()
    }

    fn sweep_expired(&self) -> Result<(), StoreError> {
        let cutoff = now_secs() - self.lease_timeout_seconds;
        let evicted = self.db.with_conn(|conn| {
            conn.execute(
                "DELETE FROM slot_leases WHERE acquired_at <= ?1",
                params![cutoff],
            )
        })?;

        if evicted > 0 {
            metrics::LEASES_EXPIRED.inc_by(evicted as u64);
            info!(evicted, "Evicted stale search leases");
        }
        Ok(())
    }
}
