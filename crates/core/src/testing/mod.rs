//! Testing utilities and mock implementations.
//!
//! Mocks for the external service traits, so the crawl path can be
//! exercised end to end without a real search backend.

mod mock_search_api;

pub use mock_search_api::{MockSearchApi, RecordedSearch};
