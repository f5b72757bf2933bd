// src/error.rs
// =============================================================================
// Error types shared by the wiki fetcher and the search core.
//
// - FetchError: something went wrong while asking the wiki for one batch
// - SearchError: why a whole search ended without a path
//
// The binary itself uses anyhow::Result at the top level; these typed errors
// exist so the exit code can depend on *which* failure happened.
// =============================================================================

use std::time::Duration;
use thiserror::Error;

/// Failure while fetching the outbound links of one batch of titles.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("wiki responded with HTTP {0}")]
    Status(u16),

    #[error("request timed out")]
    Timeout,

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("gave up after {0} continuation requests")]
    TooManyContinuations(usize),

    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

impl FetchError {
    /// Whether retrying the same request could plausibly succeed
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Http(_) | FetchError::Timeout => true,
            FetchError::Status(code) => *code == 429 || *code >= 500,
            FetchError::Decode(_)
            | FetchError::TooManyContinuations(_)
            | FetchError::InvalidBaseUrl(_) => false,
        }
    }
}

/// Terminal outcome of a search that did not produce a path.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("no more references could be found from '{start}' to '{end}' after {rounds} round(s)")]
    PathNotFound {
        start: String,
        end: String,
        rounds: usize,
    },

    #[error("fetching links failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("search did not finish within {0:?}")]
    Timeout(Duration),
}
