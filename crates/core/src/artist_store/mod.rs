//! Artist persistence collaborator.
//!
//! The coordination layer consumes this behind the [`ArtistStore`]
//! trait: idempotent upserts, existence checks, and the
//! completed-seed set the seed generator filters against.

mod sqlite;
mod types;

pub use sqlite::SqliteArtistStore;
pub use types::{ArtistRecord, ArtistStore, ArtistStoreError};
