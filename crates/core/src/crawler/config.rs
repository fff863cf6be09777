//! Crawler configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the crawl runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Enable/disable the crawler.
    /// When disabled, the process only serves the status API.
    #[serde(default)]
    pub enabled: bool,

    /// How long to wait between seed rounds (milliseconds).
    /// A round generates one seed batch and crawls it to completion.
    #[serde(default = "default_idle_poll_interval")]
    pub idle_poll_interval_ms: u64,

    /// Base delay between admission retries when the rate window is
    /// full (milliseconds). Backs off linearly per attempt.
    #[serde(default = "default_admit_retry_delay")]
    pub admit_retry_delay_ms: u64,

    /// Admission attempts per page before the seed is abandoned for
    /// this round.
    #[serde(default = "default_max_admit_retries")]
    pub max_admit_retries: u32,

    /// Artists requested per search page.
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,

    /// Hard cap on pages fetched for a single seed.
    #[serde(default = "default_max_pages_per_seed")]
    pub max_pages_per_seed: u32,
}

fn default_idle_poll_interval() -> u64 {
    5000 // 5 seconds
}

fn default_admit_retry_delay() -> u64 {
    1000 // 1 second
}

fn default_max_admit_retries() -> u32 {
    30
}

fn default_page_limit() -> u32 {
    50
}

fn default_max_pages_per_seed() -> u32 {
    20
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            idle_poll_interval_ms: default_idle_poll_interval(),
            admit_retry_delay_ms: default_admit_retry_delay(),
            max_admit_retries: default_max_admit_retries(),
            page_limit: default_page_limit(),
            max_pages_per_seed: default_max_pages_per_seed(),
        }
    }
}
