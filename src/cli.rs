// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
//   wiki-path https://pt.wikipedia.org "Ronaldo" "Fausto Silva"
//
// Three positional arguments pick the wiki and the two articles; everything
// else is optional tuning that ends up in a SearchConfig.
//
// Rust concepts:
// - Derive macros: #[derive(Parser)] generates the whole argument parser
// - ArgAction::Count: -v, -vv, -vvv become 1, 2, 3
// - Struct update syntax: ..SearchConfig::default() fills the rest
// =============================================================================

use crate::config::{FetchErrorPolicy, SearchConfig, MAX_BATCH_SIZE};
use clap::{ArgAction, Parser};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "wiki-path",
    version,
    about = "Find the shortest chain of links between two wiki articles",
    long_about = "wiki-path follows outbound links breadth-first, starting from one article, \
                  until it reaches another. It prints one shortest chain of articles \
                  connecting the two."
)]
pub struct Cli {
    /// Base URL of the wiki (e.g., https://en.wikipedia.org)
    pub base_url: String,

    /// Article to start from
    pub start: String,

    /// Article to reach (matched ignoring case)
    pub end: String,

    /// Output the result as JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Titles per API request (1 to 50)
    #[arg(long, default_value_t = MAX_BATCH_SIZE)]
    pub batch_size: usize,

    /// How many requests of one round may run at the same time
    #[arg(long, default_value_t = 4)]
    pub concurrency: usize,

    /// Retries for a request that failed with a timeout or server error
    #[arg(long, default_value_t = 2)]
    pub retries: u32,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Give up on the whole search after this many seconds
    #[arg(long)]
    pub deadline_secs: Option<u64>,

    /// Keep searching when a request fails instead of aborting
    #[arg(long)]
    pub skip_failed_batches: bool,

    /// Log progress to stderr (-v for rounds, -vv for every request)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            batch_size: self.batch_size,
            concurrency: self.concurrency,
            retries: self.retries,
            request_timeout: Duration::from_secs(self.timeout_secs),
            deadline: self.deadline_secs.map(Duration::from_secs),
            on_fetch_error: if self.skip_failed_batches {
                FetchErrorPolicy::Skip
            } else {
                FetchErrorPolicy::Fail
            },
            ..SearchConfig::default()
        }
        .normalized()
    }

    /// Default tracing filter when RUST_LOG is not set
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}
