//! External search/ingestion API abstraction.

mod types;

pub use types::{ArtistPage, SearchApi, SearchApiError};
