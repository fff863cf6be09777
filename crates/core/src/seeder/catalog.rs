//! Curated catalog of search-seed prefixes.

use std::path::Path;

use tracing::{error, info, warn};

/// Static prefix catalog, partitioned by length.
///
/// Loaded once at process start and injected into the generator;
/// immutable afterwards. Four-character prefixes are kept apart
/// because they are crawled first.
#[derive(Debug, Clone, Default)]
pub struct PrefixCatalog {
    four_char: Vec<String>,
    other: Vec<String>,
}

impl PrefixCatalog {
    /// Load the catalog from a CSV file (header row, prefix in the
    /// first column). File order is preserved within each bucket.
    ///
    /// A missing or unreadable file yields an empty catalog with a
    /// warning; the crawler can still run, it just has nothing to
    /// search.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Prefix catalog not found at {:?}, using empty catalog", path);
                return Self::default();
            }
            Err(e) => {
                error!("Error reading prefix catalog {:?}: {}", path, e);
                return Self::default();
            }
        };

        let mut catalog = Self::default();
        for line in content.lines().skip(1) {
            let prefix = line.split(',').next().unwrap_or("").trim();
            if prefix.is_empty() {
                continue;
            }
            if prefix.chars().count() == 4 {
                catalog.four_char.push(prefix.to_string());
            } else {
                catalog.other.push(prefix.to_string());
            }
        }

        info!(
            total = catalog.len(),
            four_char = catalog.four_char.len(),
            other = catalog.other.len(),
            "Loaded prefix catalog"
        );
        catalog
    }

    /// Build a catalog directly from prefix lists (useful for testing).
    pub fn from_prefixes(prefixes: impl IntoIterator<Item = String>) -> Self {
        let mut catalog = Self::default();
        for prefix in prefixes {
            if prefix.chars().count() == 4 {
                catalog.four_char.push(prefix);
            } else {
                catalog.other.push(prefix);
            }
        }
        catalog
    }

    /// Four-character prefixes, in file order.
    pub fn four_char(&self) -> &[String] {
        &self.four_char
    }

    /// All remaining prefixes, in file order.
    pub fn other(&self) -> &[String] {
        &self.other
    }

    pub fn len(&self) -> usize {
        self.four_char.len() + self.other.len()
    }

    pub fn is_empty(&self) -> bool {
        self.four_char.is_empty() && self.other.is_empty()
    }
}
