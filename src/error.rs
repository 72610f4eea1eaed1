// src/error.rs
// =============================================================================
// Error types for every layer of the crawler.
//
// Layers and their errors:
// - config:  ConfigError  (bad or missing run options, raised before any work)
// - fetch:   FetchError   (per-domain transport failures, recorded not raised)
// - dedup:   StoreError   (the shared "already processed" set misbehaved)
// - scan:    QueueError / WriterError (channel and output file problems)
//
// ScanError is the top-level error a run can end with. Only configuration
// problems and output failures surface here; a single domain failing never
// stops the run.
// =============================================================================

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

// Raised while turning CLI options into a ScanConfig
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No input specified (no domains or input file)")]
    NoInput,

    #[error("No output file specified")]
    NoOutput,

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("Could not read input file {path}: {source}")]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// The closed set of reasons a fetch can fail.
//
// This is what ends up in the `error` field of each output record, so the
// serialized names are part of the output format.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed")]
    ConnectionFailure,

    #[error("response body could not be decoded")]
    DecodeFailure,

    #[error("server answered with a non-success status")]
    HttpStatus,

    #[error("domain does not form a valid URL")]
    InvalidDomain,

    #[error("request failed")]
    Other,
}

impl FetchError {
    /// Sorts a reqwest error into one of our categories
    pub fn from_reqwest(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            FetchError::Timeout
        } else if error.is_connect() {
            FetchError::ConnectionFailure
        } else if error.is_decode() || error.is_body() {
            FetchError::DecodeFailure
        } else if error.is_status() {
            FetchError::HttpStatus
        } else {
            FetchError::Other
        }
    }
}

// Errors from a DedupStore backend
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

// Errors from a WorkQueue
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue is closed")]
    Closed,
}

// Errors from the batch writer
#[derive(Error, Debug)]
pub enum WriterError {
    #[error("Could not write to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not serialize record for {domain}: {source}")]
    Serialize {
        domain: String,
        #[source]
        source: serde_json::Error,
    },
}

// Everything a whole run can fail with
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Dedup store error: {0}")]
    Store(#[from] StoreError),

    #[error("Output error: {0}")]
    Writer(#[from] WriterError),

    #[error("A background task panicked: {0}")]
    Task(#[from] tokio::task::JoinError),
}
