//! Crawl runner implementation.
//!
//! Drives the crawl automatically, one seed round at a time:
//! - Seed generation: one batch per round, sized to the worker count
//! - Crawling: one task per seed, bounded by the slot registry
//! - Ingestion: full batches only, drained from the accumulators

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::artist_store::{ArtistRecord, ArtistStore};
use crate::coordination::{PendingArtistQueue, PendingGenreMap, RateLimiter, SearchSlotRegistry};
use crate::metrics;
use crate::search_api::SearchApi;
use crate::seeder::SeedGenerator;

use super::config::CrawlerConfig;
use super::types::{CrawlerError, CrawlerStatus};

/// Everything a seed worker needs, bundled for cheap cloning into
/// spawned tasks.
struct CrawlContext {
    config: CrawlerConfig,
    max_albums_per_artist: u32,
    rate_limiter: Arc<RateLimiter>,
    slots: Arc<SearchSlotRegistry>,
    artist_queue: Arc<PendingArtistQueue>,
    genre_map: Arc<PendingGenreMap>,
    artist_store: Arc<dyn ArtistStore>,
    search_api: Arc<dyn SearchApi>,
}

/// The crawl runner - generates seed batches and crawls them through
/// the coordination primitives.
pub struct CrawlRunner {
    seeder: Arc<SeedGenerator>,
    ctx: Arc<CrawlContext>,

    // Runtime state
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl CrawlRunner {
    /// Create a new runner.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: CrawlerConfig,
        max_albums_per_artist: u32,
        seeder: Arc<SeedGenerator>,
        rate_limiter: Arc<RateLimiter>,
        slots: Arc<SearchSlotRegistry>,
        artist_queue: Arc<PendingArtistQueue>,
        genre_map: Arc<PendingGenreMap>,
        artist_store: Arc<dyn ArtistStore>,
        search_api: Arc<dyn SearchApi>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            seeder,
            ctx: Arc::new(CrawlContext {
                config,
                max_albums_per_artist,
                rate_limiter,
                slots,
                artist_queue,
                genre_map,
                artist_store,
                search_api,
            }),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    /// Start the runner (spawns the crawl loop).
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Crawl runner already running");
            return;
        }

        info!(api = self.ctx.search_api.name(), "Starting crawl runner");
        self.spawn_crawl_loop();
    }

    /// Stop the runner gracefully.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Crawl runner not running");
            return;
        }

        info!("Stopping crawl runner");
        let _ = self.shutdown_tx.send(());

        // Give in-flight seed workers a moment to finish their page
        tokio::time::sleep(Duration::from_millis(500)).await;
        info!("Crawl runner stopped");
    }

    /// Get current runner status.
    pub fn status(&self) -> CrawlerStatus {
        CrawlerStatus {
            running: self.running.load(Ordering::Relaxed),
            active_slots: self.ctx.slots.count(),
            pending_artists: self.ctx.artist_queue.count(),
            pending_genres: self.ctx.genre_map.count(),
        }
    }

    /// Spawn the crawl loop task.
    fn spawn_crawl_loop(&self) {
        let running = Arc::clone(&self.running);
        let seeder = Arc::clone(&self.seeder);
        let ctx = Arc::clone(&self.ctx);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let idle = Duration::from_millis(self.ctx.config.idle_poll_interval_ms);

        tokio::spawn(async move {
            info!("Crawl loop started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Crawl loop received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(idle) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        Self::run_seed_round(&seeder, &ctx, &running).await;
                    }
                }
            }
            info!("Crawl loop stopped");
        });
    }

    /// Generate one seed batch and crawl every seed in it.
    async fn run_seed_round(
        seeder: &Arc<SeedGenerator>,
        ctx: &Arc<CrawlContext>,
        running: &Arc<AtomicBool>,
    ) {
        let seeds = match seeder.generate_batch() {
            Ok(seeds) => seeds,
            Err(e) => {
                error!("Failed to generate seed batch: {}", e);
                return;
            }
        };
        if seeds.is_empty() {
            debug!("No seeds to crawl this round");
            return;
        }

        let mut workers = Vec::with_capacity(seeds.len());
        for seed in seeds {
            if !running.load(Ordering::Relaxed) {
                break;
            }
            let ctx = Arc::clone(ctx);
            workers.push(tokio::spawn(async move {
                Self::crawl_one_seed(&seed, &ctx).await;
            }));
        }

        for worker in workers {
            if let Err(e) = worker.await {
                error!("Seed worker panicked: {}", e);
            }
        }
    }

    /// Crawl a single seed under a slot lease, releasing it on every
    /// exit path.
    async fn crawl_one_seed(seed: &str, ctx: &Arc<CrawlContext>) {
        let worker_id = Uuid::new_v4().to_string();

        if !ctx.slots.acquire(seed) {
            // No capacity this round. The seed is not marked completed,
            // so a later round will pick it up again.
            debug!(seed, worker_id, "No slot available, deferring seed");
            return;
        }

        let result = Self::crawl_seed_pages(seed, &worker_id, ctx).await;
        ctx.slots.release(seed);

        match result {
            Ok(artists_found) => {
                metrics::SEARCHES_COMPLETED.with_label_values(&["ok"]).inc();
                info!(seed, worker_id, artists_found, "Seed crawl completed");
            }
            Err(e) => {
                metrics::SEARCHES_COMPLETED
                    .with_label_values(&["failed"])
                    .inc();
                warn!(seed, worker_id, "Seed crawl failed: {}", e);
            }
        }
    }

    /// Page through the search results for `seed`, feeding discoveries
    /// into the batch accumulators.
    async fn crawl_seed_pages(
        seed: &str,
        worker_id: &str,
        ctx: &Arc<CrawlContext>,
    ) -> Result<u32, CrawlerError> {
        let limit = ctx.config.page_limit;
        let mut offset = 0u32;
        let mut artists_found = 0u32;

        for _page in 0..ctx.config.max_pages_per_seed {
            Self::wait_for_admission(seed, offset, ctx).await?;

            let page = ctx.search_api.search_artists(seed, offset, limit).await?;
            let page_count = page.artists.len() as u32;
            ctx.rate_limiter.record_result(seed, offset, page_count);
            metrics::SEARCH_PAGE_RESULTS.observe(page_count as f64);
            debug!(
                seed,
                worker_id, offset, page_count, "Fetched search results page"
            );

            artists_found += page_count;
            Self::process_page(&page.artists, ctx).await?;

            offset += limit;
            if page_count < limit || offset >= page.total {
                break;
            }
        }

        ctx.artist_store
            .record_search_completed(seed, artists_found)?;
        Ok(artists_found)
    }

    /// Block until the rate window admits one request, up to the
    /// configured retry budget. Backoff grows linearly per attempt.
    async fn wait_for_admission(
        seed: &str,
        offset: u32,
        ctx: &Arc<CrawlContext>,
    ) -> Result<(), CrawlerError> {
        let limit = ctx.config.page_limit;
        for attempt in 0..ctx.config.max_admit_retries {
            if ctx.rate_limiter.try_admit(seed, offset, limit) {
                return Ok(());
            }
            let delay = ctx.config.admit_retry_delay_ms * (attempt as u64 + 1);
            debug!(seed, offset, attempt, delay_ms = delay, "Rate window full, backing off");
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        Err(CrawlerError::AdmissionExhausted {
            query: seed.to_string(),
            offset,
        })
    }

    /// Persist one page of artists and push discoveries toward the
    /// ingestion APIs in full batches.
    async fn process_page(
        artists: &[ArtistRecord],
        ctx: &Arc<CrawlContext>,
    ) -> Result<(), CrawlerError> {
        if artists.is_empty() {
            return Ok(());
        }

        let new_ids = ctx.artist_store.upsert_artists(artists)?;
        if !new_ids.is_empty() {
            metrics::ARTISTS_DISCOVERED.inc_by(new_ids.len() as u64);
        }

        // Keep page order when queueing: the set only tells us which
        // IDs are new.
        let ordered_new: Vec<String> = artists
            .iter()
            .filter(|a| new_ids.contains(&a.id))
            .map(|a| a.id.clone())
            .collect();

        let artist_batch = ctx.artist_queue.enqueue(&ordered_new);
        if !artist_batch.is_empty() {
            ctx.search_api
                .ingest_artists(&artist_batch, ctx.max_albums_per_artist)
                .await?;
        }

        let assoc: HashMap<String, Vec<String>> = artists
            .iter()
            .filter(|a| !a.genres.is_empty())
            .map(|a| (a.id.clone(), a.genres.clone()))
            .collect();

        let genre_batch = ctx.genre_map.enqueue(&assoc);
        if !genre_batch.is_empty() {
            ctx.search_api.ingest_genres(&genre_batch).await?;
        }

        Ok(())
    }
}
