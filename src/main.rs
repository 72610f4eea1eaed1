// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (RUST_LOG overrides the default filter)
// 3. Build the HTTP fetcher and the dedup store, then run the crawl
// 4. Print a summary and exit with a proper code (0 = success, 2 = error)
// =============================================================================

// Module declarations - tells Rust about our other source files
mod adstxt;  // src/adstxt/ - fetching and parsing ads.txt files
mod cli;     // src/cli.rs - command-line parsing
mod config;  // src/config.rs - validated run configuration
mod dedup;   // src/dedup/ - shared "already scanned" set
mod error;   // src/error.rs - error types for every layer
mod scan;    // src/scan/ - queues, workers, writer, orchestration

use adstxt::HttpFetcher;
use anyhow::{Context, Result};
use clap::Parser; // Parser trait enables the parse() method
use cli::Cli;
use dedup::{DedupStore, MemoryDedupStore, RedisDedupStore};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let exit_code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "info,adstxt_crawler=debug"
    } else {
        "info,adstxt_crawler=info"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let redis_url = cli.redis_url.clone();
    let config = cli.into_config();

    // Fail on bad options before any client or connection is set up
    config.validate()?;

    let fetcher = HttpFetcher::new(config.fetch_timeout).context("building HTTP client")?;

    let store: Arc<dyn DedupStore> = match redis_url {
        Some(url) => Arc::new(
            RedisDedupStore::new(&url).with_context(|| format!("opening redis at {}", url))?,
        ),
        None => Arc::new(MemoryDedupStore::new()),
    };

    println!("🔍 Scanning for ads.txt with {} worker(s)", config.workers);

    let summary = scan::run(config, Arc::new(fetcher), store).await?;

    println!();
    println!("📊 Summary:");
    println!("   🌱 Seed domains: {}", summary.seeds);
    println!("   ✅ Scanned: {}", summary.workers.processed);
    println!("   🔁 Sub-domains followed: {}", summary.workers.subdomains_enqueued);
    println!("   ⏭️  Skipped (already scanned): {}", summary.workers.skipped);
    println!("   🧾 Distinct domains committed: {}", summary.committed);
    println!("   ❌ Fetch errors: {}", summary.workers.fetch_errors);
    println!("   🚫 HTML responses ignored: {}", summary.workers.rejected);
    println!(
        "   💾 Written: {} record(s) in {} batch(es) to {}",
        summary.writer.records_written,
        summary.writer.batches_flushed,
        summary.output.display()
    );
    println!("   ⏱️  Took {:.1}s", summary.elapsed.as_secs_f64());

    Ok(())
}
