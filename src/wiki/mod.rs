// src/wiki/mod.rs
// =============================================================================
// This module talks to MediaWiki sites (Wikipedia and friends).
//
// Submodules:
// - query: Splits titles into batches and builds api.php URLs
// - fetch: The LinkFetcher trait and its reqwest-backed implementation
//
// Only "prop=links" queries are used: for a handful of titles, which
// articles do they link to?
// =============================================================================

mod fetch;
mod query;

pub use fetch::{LinkFetcher, LinkMap, WikiFetcher};
pub use query::batch;
