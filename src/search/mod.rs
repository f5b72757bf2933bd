// src/search/mod.rs
// =============================================================================
// The path search itself.
//
// Submodules:
// - registry: Every page discovered so far, with a back-link to its parent
// - path: Turns a found page into the chain of titles that led to it
// - graph: The round-by-round breadth-first search driver
//
// Nothing in here knows about HTTP; pages come from a LinkFetcher.
// =============================================================================

mod graph;
mod path;
mod registry;

pub use graph::{find_path, SearchReport};
