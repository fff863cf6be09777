//! Sliding-window admission control for outbound search-API calls.
//!
//! The prune/count/insert sequence runs as one immediate transaction
//! against the coordination store, so two workers can never both
//! observe spare capacity and both admit past the window bound.

use std::sync::Arc;

use rusqlite::{params, OptionalExtension};
use tracing::{debug, error, warn};

use crate::metrics;

use super::{now_secs, CoordinationDb, RateLimitStatus, RequestRecord, StoreError};

/// Sliding-window rate limiter shared by all crawl workers.
pub struct RateLimiter {
    db: Arc<CoordinationDb>,
    window_seconds: u64,
    max_requests: usize,
}

impl RateLimiter {
    pub fn new(db: Arc<CoordinationDb>, window_seconds: u64, max_requests: usize) -> Self {
        Self {
            db,
            window_seconds,
            max_requests,
        }
    }

    /// Ask for permission to make one search-API call.
    ///
    /// Returns `true` and records the request when the window has
    /// capacity, `false` otherwise. Never blocks; rejected callers
    /// back off and retry. Store failures are logged and reported as
    /// a rejection.
    pub fn try_admit(&self, query: &str, offset: u32, limit: u32) -> bool {
        match self.try_admit_inner(query, offset, limit) {
            Ok(admitted) => {
                if admitted {
                    metrics::REQUESTS_ADMITTED.inc();
                } else {
                    metrics::REQUESTS_REJECTED.inc();
                    debug!(query, offset, "Rate window full, rejecting request");
                }
                admitted
            }
            Err(e) => {
                error!("Error recording API request: {}", e);
                false
            }
        }
    }

    fn try_admit_inner(&self, query: &str, offset: u32, limit: u32) -> Result<bool, StoreError> {
        let now = now_secs();
        let window_start = now - self.window_seconds as f64;
        let token = format!("{}:{}:{}", query, offset, now);
        let max_requests = self.max_requests;

        self.db.with_tx(|tx| {
            // Lazy expiry: prune everything that has left the window.
            tx.execute("DELETE FROM rate_window WHERE ts < ?1", params![window_start])?;
            tx.execute(
                "DELETE FROM request_details WHERE ts < ?1",
                params![window_start],
            )?;

            let count: i64 =
                tx.query_row("SELECT COUNT(*) FROM rate_window", [], |row| row.get(0))?;

            if count as usize >= max_requests {
                return Ok(false);
            }

            tx.execute(
                "INSERT INTO rate_window (token, ts) VALUES (?1, ?2)",
                params![token, now],
            )?;
            tx.execute(
                "INSERT OR REPLACE INTO request_details
                 (token, query, start_offset, page_limit, ts, result_count)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0)",
                params![token, query, offset, limit, now],
            )?;

            Ok(true)
        })
    }

    /// Record how many artists a previously admitted request returned.
    ///
    /// Best effort: the oldest window entry matching `query`/`offset`
    /// is updated and the search stops there. Retried requests sharing
    /// a query/offset pair get no stronger guarantee than first match
    /// wins. Errors are logged and swallowed.
    pub fn record_result(&self, query: &str, offset: u32, result_count: u32) {
        let now = now_secs();
        let window_start = now - self.window_seconds as f64;

        let result = self.db.with_conn(|conn| {
            let token: Option<String> = conn
                .query_row(
                    "SELECT d.token FROM request_details d
                     JOIN rate_window w ON w.token = d.token
                     WHERE d.query = ?1 AND d.start_offset = ?2 AND w.ts >= ?3
                     ORDER BY w.ts ASC LIMIT 1",
                    params![query, offset, window_start],
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(token) = token {
                conn.execute(
                    "UPDATE request_details SET result_count = ?1 WHERE token = ?2",
                    params![result_count, token],
                )?;
            }
            Ok(())
        });

        if let Err(e) = result {
            error!("Error updating request result count: {}", e);
        }
    }

    /// All live window entries with their metadata, newest first.
    ///
    /// Window entries whose metadata record is missing or unreadable
    /// are skipped with a warning rather than aborting the listing.
    pub fn list_window(&self) -> Vec<RequestRecord> {
        let now = now_secs();
        let window_start = now - self.window_seconds as f64;

        let result = self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT w.token, d.query, d.start_offset, d.page_limit, d.ts, d.result_count
                 FROM rate_window w
                 LEFT JOIN request_details d ON d.token = w.token
                 WHERE w.ts >= ?1
                 ORDER BY w.ts DESC",
            )?;

            let rows = stmt.query_map(params![window_start], |row| {
                let token: String = row.get(0)?;
                let query: Option<String> = row.get(1)?;
                Ok((token, query, row.get::<_, Option<u32>>(2)?, row.get::<_, Option<u32>>(3)?, row.get::<_, Option<f64>>(4)?, row.get::<_, Option<u32>>(5)?))
            })?;

            let mut records = Vec::new();
            for row in rows {
                let (token, query, offset, limit, ts, result_count) = row?;
                match (query, offset, limit, ts, result_count) {
                    (Some(query), Some(offset), Some(limit), Some(timestamp), Some(result_count)) => {
                        records.push(RequestRecord {
                            token,
                            query,
                            offset,
                            limit,
                            timestamp,
                            result_count,
                        });
                    }
                    _ => {
                        warn!(token, "Skipping window entry with missing request details");
                    }
                }
            }
            Ok(records)
        });

        match result {
            Ok(records) => records,
            Err(e) => {
                error!("Error listing rate window: {}", e);
                Vec::new()
            }
        }
    }

    /// Current window occupancy and, when at capacity, how long until
    /// the oldest entry exits the window.
    pub fn status(&self) -> RateLimitStatus {
        let now = now_secs();
        let window_start = now - self.window_seconds as f64;

        let result = self.db.with_tx(|tx| {
            tx.execute("DELETE FROM rate_window WHERE ts < ?1", params![window_start])?;
            tx.execute(
                "DELETE FROM request_details WHERE ts < ?1",
                params![window_start],
            )?;
            let count: i64 =
                tx.query_row("SELECT COUNT(*) FROM rate_window", [], |row| row.get(0))?;
            let oldest: Option<f64> =
                tx.query_row("SELECT MIN(ts) FROM rate_window", [], |row| row.get(0))?;
            Ok((count as usize, oldest))
        });

        match result {
            Ok((current, oldest)) => {
                let time_until_next_request = match oldest {
                    Some(oldest) if current >= self.max_requests => {
                        (oldest + self.window_seconds as f64 - now).max(0.0)
                    }
                    _ => 0.0,
                };

                RateLimitStatus {
                    window_seconds: self.window_seconds,
                    current_requests: current,
                    max_requests: self.max_requests,
                    remaining_requests: self.max_requests.saturating_sub(current),
                    time_until_next_request,
                    window_start,
                    window_end: now,
                }
            }
            Err(e) => {
                error!("Error getting rate limit status: {}", e);
                RateLimitStatus {
                    window_seconds: self.window_seconds,
                    current_requests: 0,
                    max_requests: self.max_requests,
                    remaining_requests: self.max_requests,
                    time_until_next_request: 0.0,
                    window_start,
                    window_end: now,
                }
            }
        }
    }
}
