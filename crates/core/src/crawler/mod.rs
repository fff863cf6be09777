//! Crawl runner.
//!
//! Ties the coordination primitives together: seed batches come from
//! the generator, every search call passes the rate limiter, every
//! in-flight seed holds a slot lease, and discoveries flow through the
//! batch accumulators to the ingestion APIs.

mod config;
mod runner;
mod types;

pub use config::CrawlerConfig;
pub use runner::CrawlRunner;
pub use types::{CrawlerError, CrawlerStatus};
