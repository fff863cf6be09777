//! Prioritized search-seed generation.

use std::collections::HashSet;
use std::sync::Arc;

use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use crate::artist_store::{ArtistStore, ArtistStoreError};
use crate::metrics;

use super::PrefixCatalog;

/// Hard cap on seeds per batch, regardless of configuration.
pub const MAX_SEED_WORKERS: usize = 20;

/// Produces batches of search seeds for workers to claim.
///
/// Four-character prefixes are exhausted before the rest of the
/// catalog. The completed-seed set is re-fetched from the artist store
/// on every call, so a seed finished by any worker between calls is
/// never handed out again. Safe to share across workers: the only
/// state is the immutable catalog.
pub struct SeedGenerator {
    catalog: PrefixCatalog,
    artist_store: Arc<dyn ArtistStore>,
    max_workers: usize,
}

impl SeedGenerator {
    /// `max_workers_hint` is clamped to [`MAX_SEED_WORKERS`].
    pub fn new(
        catalog: PrefixCatalog,
        artist_store: Arc<dyn ArtistStore>,
        max_workers_hint: usize,
    ) -> Self {
        Self {
            catalog,
            artist_store,
            max_workers: max_workers_hint.min(MAX_SEED_WORKERS).max(1),
        }
    }

    /// Maximum number of seeds a single batch can contain.
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Generate up to `max_workers` unsearched seeds.
    ///
    /// Returns an empty batch when the whole catalog has been
    /// searched; the result is never padded with repeats.
    pub fn generate_batch(&self) -> Result<Vec<String>, ArtistStoreError> {
        let completed = self.artist_store.completed_seeds()?;
        let needed = self.max_workers;
        let mut rng = rand::rng();

        let mut seeds = Self::pick(self.catalog.four_char(), &completed, needed, &mut rng);
        if !seeds.is_empty() {
            debug!(count = seeds.len(), "Selected four-char prefixes");
        }

        if seeds.len() < needed {
            let from_other = Self::pick(
                self.catalog.other(),
                &completed,
                needed - seeds.len(),
                &mut rng,
            );
            if !from_other.is_empty() {
                debug!(count = from_other.len(), "Selected other prefixes");
            }
            seeds.extend(from_other);
        }

        if seeds.is_empty() {
            warn!("All prefixes in the catalog have been searched");
        } else {
            metrics::SEEDS_GENERATED.inc_by(seeds.len() as u64);
            info!(count = seeds.len(), "Generated seed batch");
        }
        Ok(seeds)
    }

    fn pick(
        bucket: &[String],
        completed: &HashSet<String>,
        take: usize,
        rng: &mut impl rand::Rng,
    ) -> Vec<String> {
        let mut unsearched: Vec<String> = bucket
            .iter()
            .filter(|prefix| !completed.contains(*prefix))
            .cloned()
            .collect();
        unsearched.shuffle(rng);
        unsearched.truncate(take);
        unsearched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artist_store::SqliteArtistStore;

    fn generator(prefixes: Vec<&str>, max_workers: usize) -> (Arc<SqliteArtistStore>, SeedGenerator) {
        let store = Arc::new(SqliteArtistStore::in_memory().unwrap());
        let catalog =
            PrefixCatalog::from_prefixes(prefixes.into_iter().map(String::from));
        let generator = SeedGenerator::new(
            catalog,
            Arc::clone(&store) as Arc<dyn ArtistStore>,
            max_workers,
        );
        (store, generator)
    }

    #[test]
    fn test_four_char_bucket_has_priority() {
        // 3 four-char + 5 other, asking for 4: the batch must start by
        // draining the whole four-char bucket.
        let (_store, generator) = generator(
            vec!["aaaa", "bbbb", "cccc", "x", "yy", "zzz", "wwwww", "vvvvvv"],
            4,
        );

        let batch = generator.generate_batch().unwrap();
        assert_eq!(batch.len(), 4);
        for seed in &["aaaa", "bbbb", "cccc"] {
            assert!(batch.contains(&seed.to_string()));
        }
        // The fourth seed comes from the other bucket.
        let from_other = batch.iter().filter(|s| s.chars().count() != 4).count();
        assert_eq!(from_other, 1);
    }

    #[test]
    fn test_completed_seeds_are_never_reissued() {
        let (store, generator) = generator(vec!["aaaa", "bbbb", "cccc"], 2);

        let first = generator.generate_batch().unwrap();
        assert_eq!(first.len(), 2);
        for seed in &first {
            store.record_search_completed(seed, 1).unwrap();
        }

        // Fresh completed-set fetch per call: only the remaining
        // prefix can come back.
        let second = generator.generate_batch().unwrap();
        assert_eq!(second.len(), 1);
        assert!(!first.contains(&second[0]));
        store.record_search_completed(&second[0], 0).unwrap();

        assert!(generator.generate_batch().unwrap().is_empty());
    }

    #[test]
    fn test_exhausted_catalog_returns_empty_not_padded() {
        let (store, generator) = generator(vec!["aaaa"], 5);
        store.record_search_completed("aaaa", 3).unwrap();
        assert!(generator.generate_batch().unwrap().is_empty());
    }

    #[test]
    fn test_empty_catalog_returns_empty() {
        let (_store, generator) = generator(vec![], 5);
        assert!(generator.generate_batch().unwrap().is_empty());
    }

    #[test]
    fn test_max_workers_is_capped() {
        let prefixes: Vec<String> = (0..50).map(|i| format!("p{:03}", i)).collect();
        let store = Arc::new(SqliteArtistStore::in_memory().unwrap());
        let generator = SeedGenerator::new(
            PrefixCatalog::from_prefixes(prefixes),
            store as Arc<dyn ArtistStore>,
            100,
        );
        assert_eq!(generator.max_workers(), MAX_SEED_WORKERS);
        assert_eq!(generator.generate_batch().unwrap().len(), MAX_SEED_WORKERS);
    }

    #[test]
    fn test_batch_has_no_duplicates() {
        let (_store, generator) = generator(vec!["aaaa", "bbbb", "cc", "dd"], 10);
        let batch = generator.generate_batch().unwrap();
        let unique: HashSet<_> = batch.iter().collect();
        assert_eq!(unique.len(), batch.len());
        assert_eq!(batch.len(), 4);
    }
}
