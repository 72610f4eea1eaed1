// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Every option maps onto a field of ScanConfig; `into_config` does the
// conversion and fills in the default output path. Validation happens later,
// in ScanConfig::validate, so the same rules apply however a config is built.
// =============================================================================

use crate::config::{self, ScanConfig};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

// #[derive(Parser)] tells clap to automatically generate parsing code
#[derive(Parser, Debug)]
#[command(
    name = "adstxt-crawler",
    version,
    about = "Crawl domains for ads.txt files, following declared sub-domains",
    long_about = "adstxt-crawler fetches http://<domain>/ads.txt for every seed domain, \
                  parses the seller entries, follows `subdomain=` declarations and writes \
                  one JSON line per domain to the output file."
)]
pub struct Cli {
    /// Domains to scan
    ///
    /// Example: --domains example.com example.org
    #[arg(long, num_args = 1..)]
    pub domains: Vec<String>,

    /// Newline-delimited file with domains to scan (used when --domains is absent)
    #[arg(long, alias = "input_file")]
    pub input_file: Option<PathBuf>,

    /// Output file (JSON lines, appended to)
    ///
    /// Defaults to results/adstxt_results_<date>T<hour>.json
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Number of concurrent scanner workers
    #[arg(long, alias = "workers", default_value_t = config::DEFAULT_WORKERS)]
    pub processes: usize,

    /// Keep the raw ads.txt text in the output records
    #[arg(long, alias = "keep_raw")]
    pub keep_raw: bool,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = config::DEFAULT_FETCH_TIMEOUT_SECS)]
    pub fetch_timeout_secs: u64,

    /// Records written to the output file per batch
    #[arg(long, default_value_t = config::DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Maximum number of domains waiting to be scanned
    ///
    /// Must be greater than --processes. Workers wait for room when it is full,
    /// so keep it well above the number of sub-domains a crawl may discover.
    #[arg(long, default_value_t = config::DEFAULT_FRONTIER_CAPACITY)]
    pub frontier_capacity: usize,

    /// Maximum number of finished records waiting for the writer
    #[arg(long, default_value_t = config::DEFAULT_RESULT_CAPACITY)]
    pub result_capacity: usize,

    /// Seconds a worker waits for new domains before checking whether the crawl is done
    #[arg(long, default_value_t = config::DEFAULT_WORKER_IDLE_SECS)]
    pub worker_idle_secs: u64,

    /// Seconds the writer waits for new records before giving up
    #[arg(long, default_value_t = config::DEFAULT_WRITER_QUIET_SECS)]
    pub writer_quiet_secs: u64,

    /// Keep the dedup set in Redis instead of in memory (e.g. redis://127.0.0.1/)
    #[arg(long)]
    pub redis_url: Option<String>,

    /// Log every domain as it is processed
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn into_config(self) -> ScanConfig {
        ScanConfig {
            domains: self.domains,
            input_file: self.input_file,
            output: Some(self.output.unwrap_or_else(config::default_output_path)),
            workers: self.processes,
            keep_raw: self.keep_raw,
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            batch_size: self.batch_size,
            frontier_capacity: self.frontier_capacity,
            result_capacity: self.result_capacity,
            worker_idle_timeout: Duration::from_secs(self.worker_idle_secs),
            writer_quiet_period: Duration::from_secs(self.writer_quiet_secs),
        }
    }
}
