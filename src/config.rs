// src/config.rs
// =============================================================================
// Tunables for one search, gathered in one place.
//
// The CLI fills these in from flags (see cli.rs); tests build them directly.
// Defaults match what the wiki API expects from a polite client.
// =============================================================================

use std::time::Duration;

/// The MediaWiki API refuses more than 50 titles per request
pub const MAX_BATCH_SIZE: usize = 50;

/// What to do when a batch request fails after all retries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorPolicy {
    /// Abort the whole search with the fetch error
    Fail,
    /// Log a warning and treat the batch as having no links
    Skip,
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Titles per API request (1..=MAX_BATCH_SIZE)
    pub batch_size: usize,
    /// How many batches of one round may be in flight at once
    pub concurrency: usize,
    /// Extra attempts for a batch after a transient failure
    pub retries: u32,
    /// The n-th retry waits n times this long
    pub retry_backoff: Duration,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Optional bound on the whole search
    pub deadline: Option<Duration>,
    pub on_fetch_error: FetchErrorPolicy,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            batch_size: MAX_BATCH_SIZE,
            concurrency: 4,
            retries: 2,
            retry_backoff: Duration::from_millis(500),
            request_timeout: Duration::from_secs(10),
            deadline: None,
            on_fetch_error: FetchErrorPolicy::Fail,
        }
    }
}

impl SearchConfig {
    /// Clamps values into their valid ranges
    ///
    /// A batch size of 0 would never make progress and more than 50 titles
    /// is rejected by the API, so both ends are pinned.
    pub fn normalized(mut self) -> Self {
        self.batch_size = self.batch_size.clamp(1, MAX_BATCH_SIZE);
        self.concurrency = self.concurrency.max(1);
        self
    }
}
