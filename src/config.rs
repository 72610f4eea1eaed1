// src/config.rs
// =============================================================================
// Run configuration.
//
// A ScanConfig describes one crawl: where the domains come from, where the
// results go, and how many workers and how large the batches and queues
// are. It is validated before any task is started, so a bad setup fails
// immediately instead of halfway through a crawl.
// =============================================================================

use crate::error::ConfigError;
use chrono::Local;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_WORKERS: usize = 2;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_BATCH_SIZE: usize = 10_000;
pub const DEFAULT_FRONTIER_CAPACITY: usize = 100_000;
pub const DEFAULT_RESULT_CAPACITY: usize = 10_000;
pub const DEFAULT_WORKER_IDLE_SECS: u64 = 3;
pub const DEFAULT_WRITER_QUIET_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Explicit seed domains; when non-empty the input file is ignored
    pub domains: Vec<String>,
    /// Newline-delimited file of seed domains
    pub input_file: Option<PathBuf>,
    /// JSON-lines output file, appended to
    pub output: Option<PathBuf>,
    /// Number of scanner workers
    pub workers: usize,
    /// Keep the raw ads.txt text in each output record
    pub keep_raw: bool,
    pub fetch_timeout: Duration,
    /// Records per write to the output file
    pub batch_size: usize,
    pub frontier_capacity: usize,
    pub result_capacity: usize,
    /// How long a worker waits on an empty frontier before checking for exit
    pub worker_idle_timeout: Duration,
    /// How long the writer waits on an empty result channel before exiting
    pub writer_quiet_period: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            domains: Vec::new(),
            input_file: None,
            output: None,
            workers: DEFAULT_WORKERS,
            keep_raw: false,
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            batch_size: DEFAULT_BATCH_SIZE,
            frontier_capacity: DEFAULT_FRONTIER_CAPACITY,
            result_capacity: DEFAULT_RESULT_CAPACITY,
            worker_idle_timeout: Duration::from_secs(DEFAULT_WORKER_IDLE_SECS),
            writer_quiet_period: Duration::from_secs(DEFAULT_WRITER_QUIET_SECS),
        }
    }
}

impl ScanConfig {
    /// Checks that the run has an input, an output and sane sizes
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.domains.is_empty() && self.input_file.is_none() {
            return Err(ConfigError::NoInput);
        }

        self.output_path()?;

        let sizes = [
            ("workers", self.workers),
            ("batch_size", self.batch_size),
            ("frontier_capacity", self.frontier_capacity),
            ("result_capacity", self.result_capacity),
        ];
        for (field, value) in sizes {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: "must be at least 1".to_string(),
                });
            }
        }

        // Workers push sub-domains into the frontier they drain. With no
        // spare slot beyond one per worker they can all end up blocked.
        if self.frontier_capacity <= self.workers {
            return Err(ConfigError::InvalidValue {
                field: "frontier_capacity",
                reason: format!("must be greater than the number of workers ({})", self.workers),
            });
        }

        Ok(())
    }

    pub fn output_path(&self) -> Result<&Path, ConfigError> {
        match self.output.as_deref() {
            Some(path) if !path.as_os_str().is_empty() => Ok(path),
            _ => Err(ConfigError::NoOutput),
        }
    }

    /// Seed domains, trimmed, with blank lines dropped.
    ///
    /// The explicit list wins; the input file is only read when no domains
    /// were given directly.
    pub fn resolve_domains(&self) -> Result<Vec<String>, ConfigError> {
        if !self.domains.is_empty() {
            return Ok(normalize(self.domains.iter().map(String::as_str)));
        }

        let path = self.input_file.as_ref().ok_or(ConfigError::NoInput)?;
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadInput {
            path: path.clone(),
            source,
        })?;

        Ok(normalize(contents.lines()))
    }
}

fn normalize<'a>(domains: impl Iterator<Item = &'a str>) -> Vec<String> {
    domains
        .map(str::trim)
        .filter(|domain| !domain.is_empty())
        .map(str::to_string)
        .collect()
}

// results/adstxt_results_<YYYY-mm-ddTHH>.json, one file per hour of runs
pub fn default_output_path() -> PathBuf {
    let name = format!("adstxt_results_{}.json", Local::now().format("%Y-%m-%dT%H"));
    PathBuf::from("results").join(name)
}
