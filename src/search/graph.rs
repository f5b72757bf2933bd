// src/search/graph.rs
// =============================================================================
// Breadth-first search over wiki links, one frontier ("round") at a time.
//
// How a round works:
// 1. Cut the frontier into batches (at most 50 titles each)
// 2. Fetch every batch's outbound links, a few batches at a time
// 3. Walk the results in batch order, then page order, then link order:
//    each title we have never seen becomes a new page whose parent is the
//    page linking to it, and joins the next frontier
// 4. Stop as soon as a new page matches the target (ignoring case)
//
// If a round discovers nothing new, the search is exhausted.
//
// Because titles already in the registry are never enqueued again, every
// page is expanded at most once and link cycles cannot keep the search alive.
//
// Rust concepts:
// - Generics with trait bounds: FrontierGraph works with any LinkFetcher
// - Lifetimes: the graph borrows its fetcher and config ('a) for one search
// - Streams: futures::stream::buffered runs a few fetches at once, in order
// - let-else: skip a loop iteration when a lookup comes back empty
// =============================================================================

use super::path::reconstruct;
use super::registry::{NodeId, PageRegistry};
use crate::config::{FetchErrorPolicy, SearchConfig};
use crate::error::{FetchError, SearchError};
use crate::wiki::{batch, LinkFetcher, LinkMap};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Where a search currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    Searching,
    Found(NodeId),
    Exhausted,
}

/// A successful search
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchReport {
    /// Target first, start page last
    pub path: Vec<String>,
    /// Frontiers expanded before the target turned up
    pub rounds: usize,
    /// Distinct pages seen, start page included
    pub pages_discovered: usize,
    /// Batches handed to the fetcher
    pub requests: usize,
}

impl SearchReport {
    /// Number of links followed from start to target
    pub fn hops(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    /// The path in reading order, start page first
    pub fn forward(&self) -> Vec<String> {
        self.path.iter().rev().cloned().collect()
    }
}

pub struct FrontierGraph<'a, F> {
    fetcher: &'a F,
    config: &'a SearchConfig,
    start: String,
    end: String,
    // Lowercased once; every discovered title is compared against it
    target: String,
    registry: PageRegistry,
    frontier: Vec<NodeId>,
    state: SearchState,
    rounds: usize,
    requests: usize,
}

impl<'a, F: LinkFetcher> FrontierGraph<'a, F> {
    pub fn new(fetcher: &'a F, config: &'a SearchConfig, start: &str, end: &str) -> Self {
        let (registry, root) = PageRegistry::with_root(start);
        let target = end.to_lowercase();

        // A search for the start page itself needs no links at all
        let state = if start.to_lowercase() == target {
            SearchState::Found(root)
        } else {
            SearchState::Searching
        };

        Self {
            fetcher,
            config,
            start: start.to_string(),
            end: end.to_string(),
            target,
            registry,
            frontier: vec![root],
            state,
            rounds: 0,
            requests: 0,
        }
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    /// Expands rounds until the target is found or nothing new turns up
    pub async fn run(mut self) -> Result<SearchReport, SearchError> {
        loop {
            match self.state() {
                SearchState::Searching => self.expand_round().await?,
                SearchState::Found(node) => return Ok(self.report(node)),
                SearchState::Exhausted => {
                    return Err(SearchError::PathNotFound {
                        start: self.start,
                        end: self.end,
                        rounds: self.rounds,
                    })
                }
            }
        }
    }

    /// One batch -> fetch -> merge cycle over the current frontier
    pub async fn expand_round(&mut self) -> Result<(), SearchError> {
        if self.state != SearchState::Searching {
            return Ok(());
        }

        self.rounds += 1;

        // Step 1: turn the frontier (node ids) into titles and cut it into
        // API-sized batches
        let titles: Vec<String> = self
            .frontier
            .iter()
            .map(|&id| self.registry.get(id).title.clone())
            .collect();
        let batches = batch(&titles, self.config.batch_size);

        info!(
            round = self.rounds,
            frontier = titles.len(),
            batches = batches.len(),
            discovered = self.registry.len(),
            "expanding frontier"
        );

        // Step 2: fetch every batch, up to `concurrency` at a time.
        // buffered() yields results in batch order even when later batches
        // finish first, so the merge below always sees the same order.
        // Copying the &F out of self lets the closure borrow only the fetcher.
        let fetcher = self.fetcher;
        let results: Vec<Result<LinkMap, FetchError>> = stream::iter(batches.iter())
            .map(|group| fetcher.fetch_links(group))
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;
        self.requests += batches.len();

        // Step 3: merge batch by batch, collecting pages for the next round
        let mut next_frontier = Vec::new();

        for (group, result) in batches.iter().zip(results) {
            // A failed batch either ends the search or counts as "no links"
            let links = match result {
                Ok(links) => links,
                Err(e) => match self.config.on_fetch_error {
                    FetchErrorPolicy::Fail => return Err(e.into()),
                    FetchErrorPolicy::Skip => {
                        warn!(titles = group.len(), error = %e, "skipping batch that failed to fetch");
                        continue;
                    }
                },
            };

            debug!(requested = group.len(), returned = links.len(), "merging batch");

            // Step 4: the first new page matching the target ends the search
            if let Some(found) = self.merge_batch(group, &links, &mut next_frontier) {
                info!(round = self.rounds, "found target");
                self.state = SearchState::Found(found);
                return Ok(());
            }
        }

        // Step 5: nothing new means nothing left to expand
        if next_frontier.is_empty() {
            info!(round = self.rounds, "no new pages, search exhausted");
            self.state = SearchState::Exhausted;
        } else {
            // Step 6: the pages found this round become the next frontier
            self.frontier = next_frontier;
        }

        Ok(())
    }

    // Adds the children of every page in `group` to the registry
    //
    // Entries for titles we didn't ask for are ignored. Returns the first new
    // page matching the target, if any.
    fn merge_batch(
        &mut self,
        group: &[String],
        links: &LinkMap,
        next_frontier: &mut Vec<NodeId>,
    ) -> Option<NodeId> {
        // Walk the batch in the order we asked for it, not HashMap order
        for parent_title in group {
            // Titles the wiki didn't recognise have no entry; skip them
            let (Some(children), Some(parent)) =
                (links.get(parent_title), self.registry.lookup(parent_title))
            else {
                continue;
            };

            for child in children {
                // Already known: keep its first parent and don't expand it again
                let Some(node) = self.registry.discover(child, parent) else {
                    continue;
                };

                if child.to_lowercase() == self.target {
                    return Some(node);
                }

                next_frontier.push(node);
            }
        }

        None
    }

    fn report(&self, node: NodeId) -> SearchReport {
        SearchReport {
            path: reconstruct(&self.registry, node),
            rounds: self.rounds,
            pages_discovered: self.registry.len(),
            requests: self.requests,
        }
    }
}

/// Finds one shortest link path from `start` to `end`
///
/// The returned path lists the target first and `start` last.
pub async fn find_path<F: LinkFetcher>(
    fetcher: &F,
    start: &str,
    end: &str,
    config: &SearchConfig,
) -> Result<SearchReport, SearchError> {
    // Nothing runs until the future is awaited below
    let search = FrontierGraph::new(fetcher, config, start, end).run();

    // With a deadline, tokio::time::timeout drops the search if it runs late
    match config.deadline {
        Some(limit) => tokio::time::timeout(limit, search)
            .await
            .map_err(|_| SearchError::Timeout(limit))?,
        None => search.await,
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why rounds instead of a plain queue?
//    - The wiki answers up to 50 titles per request
//    - Expanding a whole frontier at once lets us pack titles into batches
//    - Each round is still one BFS level, so the first match is a shortest path
//
// 2. Why buffered() and not buffer_unordered()?
//    - buffer_unordered hands back results as they finish
//    - buffered keeps them in the order the batches were started
//    - Same input, same order, same path every time
//
// 3. What is NodeId?
//    - A small Copy handle (an index into the registry's Vec)
//    - Parents are stored as NodeIds, so no references point into the Vec
//    - The borrow checker stays happy while the registry keeps growing
// -----------------------------------------------------------------------------
