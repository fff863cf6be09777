//! Search-seed generation.
//!
//! A curated prefix catalog is loaded once per process; batches are
//! drawn from it prioritizing four-character prefixes, filtered
//! against the completed-seed set in the artist store.

mod catalog;
mod generator;

pub use catalog::PrefixCatalog;
pub use generator::{SeedGenerator, MAX_SEED_WORKERS};
