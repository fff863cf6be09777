use std::sync::Arc;

use crescendo_core::{
    Config, CoordinationDb, CrawlRunner, PendingArtistQueue, PendingGenreMap, RateLimiter,
    SearchSlotRegistry,
};

/// Shared application state
pub struct AppState {
    config: Config,
    db: Arc<CoordinationDb>,
    rate_limiter: Arc<RateLimiter>,
    slots: Arc<SearchSlotRegistry>,
    artist_queue: Arc<PendingArtistQueue>,
    genre_map: Arc<PendingGenreMap>,
    runner: Option<Arc<CrawlRunner>>,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        db: Arc<CoordinationDb>,
        rate_limiter: Arc<RateLimiter>,
        slots: Arc<SearchSlotRegistry>,
        artist_queue: Arc<PendingArtistQueue>,
        genre_map: Arc<PendingGenreMap>,
        runner: Option<Arc<CrawlRunner>>,
    ) -> Self {
        Self {
            config,
            db,
            rate_limiter,
            slots,
            artist_queue,
            genre_map,
            runner,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store_open(&self) -> bool {
        self.db.is_open()
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub fn slots(&self) -> &SearchSlotRegistry {
        &self.slots
    }

    pub fn artist_queue(&self) -> &PendingArtistQueue {
        &self.artist_queue
    }

    pub fn genre_map(&self) -> &PendingGenreMap {
        &self.genre_map
    }

    pub fn runner(&self) -> Option<&Arc<CrawlRunner>> {
        self.runner.as_ref()
    }
}
