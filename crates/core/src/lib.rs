pub mod artist_store;
pub mod config;
pub mod coordination;
pub mod crawler;
pub mod metrics;
pub mod search_api;
pub mod seeder;
pub mod testing;

pub use artist_store::{ArtistRecord, ArtistStore, ArtistStoreError, SqliteArtistStore};
pub use config::{load_config, load_config_from_str, validate_config, Config, ConfigError};
pub use coordination::{
    CoordinationDb, PendingArtistQueue, PendingGenreMap, RateLimitStatus, RateLimiter,
    RequestRecord, SearchSlotRegistry, StoreError,
};
pub use crawler::{CrawlRunner, CrawlerConfig, CrawlerError, CrawlerStatus};
pub use search_api::{ArtistPage, SearchApi, SearchApiError};
pub use seeder::{PrefixCatalog, SeedGenerator, MAX_SEED_WORKERS};
