// src/scan/orchestrator.rs
// =============================================================================
// Runs one crawl from start to finish.
//
// Lifecycle:
// 1. Validate the config and resolve the seed domains (fail fast)
// 2. Reset the dedup store
// 3. Start the writer and N workers, then seed the frontier
// 4. Wait for the frontier to drain, then for the result channel to drain,
//    then for the writer to flush and exit
// 5. Reset the dedup store again
//
// Workers ack a domain only after its record is on the result channel, so
// once the frontier has drained every record is already queued for the
// writer. Joining the result channel after that guarantees the writer has
// taken every record before it is told to stop.
// =============================================================================

use super::queue::WorkQueue;
use super::worker::{scan_domains, ScanContext, WorkerStats};
use super::writer::{BatchWriter, WriterReport};
use crate::adstxt::{Fetcher, ParsedRecord};
use crate::config::ScanConfig;
use crate::dedup::DedupStore;
use crate::error::ScanError;
use futures::future::join_all;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

// What a finished run did
#[derive(Debug, Clone)]
pub struct ScanSummary {
    pub output: PathBuf,
    pub seeds: usize,
    pub committed: usize,
    pub workers: WorkerStats,
    pub writer: WriterReport,
    pub elapsed: Duration,
}

pub async fn run(
    config: ScanConfig,
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn DedupStore>,
) -> Result<ScanSummary, ScanError> {
    // Step 1: fail fast on a bad config or unreadable input
    config.validate()?;
    let output = config.output_path()?.to_path_buf();
    let domains = config.resolve_domains()?;
    let started = Instant::now();

    // A previous run may have died before cleaning up
    store.clear().await?;

    // Step 2: the two queues
    let frontier: Arc<WorkQueue<String>> = Arc::new(WorkQueue::new(config.frontier_capacity));
    let results: Arc<WorkQueue<ParsedRecord>> = Arc::new(WorkQueue::new(config.result_capacity));

    // Step 3: the writer, told more work is coming while the frontier is busy
    let writer = {
        let writer = BatchWriter::new(
            output.clone(),
            config.batch_size,
            config.writer_quiet_period,
            config.keep_raw,
        );
        let results = Arc::clone(&results);
        let frontier = Arc::clone(&frontier);
        tokio::spawn(async move { writer.run(results, move || frontier.outstanding() > 0).await })
    };

    // Step 4: the workers
    let context = Arc::new(ScanContext {
        frontier: Arc::clone(&frontier),
        results: Arc::clone(&results),
        store: Arc::clone(&store),
        fetcher,
        idle_timeout: config.worker_idle_timeout,
    });
    let workers: Vec<_> = (0..config.workers)
        .map(|id| tokio::spawn(scan_domains(id, Arc::clone(&context))))
        .collect();

    tracing::info!(
        seeds = domains.len(),
        workers = config.workers,
        frontier_capacity = frontier.capacity(),
        output = %output.display(),
        "starting scan"
    );

    // Step 5: seed the frontier (may wait for workers to make room)
    let seeds = domains.len();
    for domain in domains {
        if let Err(error) = frontier.enqueue(domain).await {
            tracing::warn!(%error, "frontier closed while seeding");
            break;
        }
    }

    // Step 6: every domain acked means every record is already queued
    frontier.join().await;
    frontier.close();
    tracing::debug!("frontier drained");

    // Step 7: collect worker stats
    let mut stats = WorkerStats::default();
    for outcome in join_all(workers).await {
        stats.merge(&outcome?);
    }

    // Step 8: let the writer take every record, then tell it to stop
    results.join().await;
    results.close();
    tracing::debug!("result channel drained");

    // Step 9: final flush, then clean the store even if the writer failed
    let report = writer.await?;
    let committed = store.len().await;
    let cleared = store.clear().await;
    let report = report?;
    let committed = committed?;
    cleared?;

    let summary = ScanSummary {
        output,
        seeds,
        committed,
        workers: stats,
        writer: report,
        elapsed: started.elapsed(),
    };
    tracing::info!(
        processed = summary.workers.processed,
        written = summary.writer.records_written,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "scan finished"
    );

    Ok(summary)
}
