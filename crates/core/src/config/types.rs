use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::crawler::CrawlerConfig;

/// Root configuration
///
/// Every section has defaults, so an empty TOML file is a valid
/// configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub slots: SlotsConfig,
    #[serde(default)]
    pub ingestion: IngestionConfig,
    #[serde(default)]
    pub seeder: SeederConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Shared coordination store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Path to the coordination database shared by all worker
    /// processes.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("coordination.db")
}

/// Artist database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("crescendo.db")
}

/// Sliding-window rate limit over outbound search API calls
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Window length in seconds.
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,
    /// Maximum requests per window.
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_seconds: default_window_seconds(),
            max_requests: default_max_requests(),
        }
    }
}

fn default_window_seconds() -> u64 {
    30
}

fn default_max_requests() -> usize {
    10
}

/// Concurrent-search slot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SlotsConfig {
    /// Maximum concurrent in-flight searches across all workers.
    /// Capped at 20.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Seconds after which an unreleased lease is considered
    /// abandoned.
    #[serde(default = "default_lease_timeout")]
    pub lease_timeout_seconds: u64,
}

impl Default for SlotsConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            lease_timeout_seconds: default_lease_timeout(),
        }
    }
}

fn default_max_concurrent() -> usize {
    20
}

fn default_lease_timeout() -> u64 {
    300
}

/// Downstream batch-ingestion configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestionConfig {
    /// Items per batch; the ingestion API only accepts exactly this
    /// many.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Per-artist album cap enforced by the downstream API.
    #[serde(default = "default_max_albums")]
    pub max_albums_per_artist: u32,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_albums_per_artist: default_max_albums(),
        }
    }
}

fn default_batch_size() -> usize {
    10
}

fn default_max_albums() -> u32 {
    500
}

/// Seed generator configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SeederConfig {
    /// Path to the prefix catalog CSV.
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,
    /// Seeds per generated batch. Defaults to twice the CPU count,
    /// always capped at 20.
    #[serde(default)]
    pub max_workers: Option<usize>,
}

impl Default for SeederConfig {
    fn default() -> Self {
        Self {
            catalog_path: default_catalog_path(),
            max_workers: None,
        }
    }
}

impl SeederConfig {
    /// Resolve the configured hint to a concrete worker count.
    pub fn max_workers_hint(&self) -> usize {
        self.max_workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get() * 2)
                .unwrap_or(4)
        })
    }
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("artist_prefixes.csv")
}

/// Status API server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    "0.0.0.0".parse().unwrap()
}

fn default_port() -> u16 {
    8080
}
