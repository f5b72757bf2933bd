// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (tracing) on stderr
// 3. Run the link search against the chosen wiki
// 4. Print the path and exit with a proper code
//    (0 = path found, 1 = no path exists, 2 = error)
//
// Rust concepts:
// - #[tokio::main]: builds the async runtime and runs main inside it
// - anyhow::Context: adds a human-readable line on top of an error
// - Pattern binding (e @ ...): match one error variant and keep the value
// =============================================================================

mod cli;
mod config;
mod error;
mod search;
mod wiki;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use error::SearchError;
use search::SearchReport;
use tracing_subscriber::EnvFilter;
use wiki::WikiFetcher;

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_logging(&cli);

    let config = cli.search_config();
    let fetcher = WikiFetcher::new(&cli.base_url, &config)
        .with_context(|| format!("cannot use wiki at {}", cli.base_url))?;

    eprintln!("🔍 Searching {} for a path from '{}' to '{}'", cli.base_url, cli.start, cli.end);

    // PathNotFound is an answer, not a crash: it gets its own exit code
    match search::find_path(&fetcher, &cli.start, &cli.end, &config).await {
        Ok(report) => {
            print_report(&report, cli.json)?;
            Ok(0)
        }
        Err(e @ SearchError::PathNotFound { .. }) => {
            eprintln!("❌ {}", e);
            Ok(1)
        }
        Err(e) => Err(e.into()),
    }
}

fn init_logging(cli: &Cli) {
    // RUST_LOG wins over -v when both are given
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_report(report: &SearchReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("✅ {} hop(s):", report.hops());
    println!("   {}", report.forward().join(" → "));
    println!();
    println!("📊 Summary:");
    println!("   Rounds: {}", report.rounds);
    println!("   Pages discovered: {}", report.pages_discovered);
    println!("   Requests: {}", report.requests);

    Ok(())
}
