// src/scan/writer.rs
// =============================================================================
// The batch writer: the single task that owns the output file.
//
// Records arrive on the result channel, get serialized into an in-memory
// buffer, and every `batch_size` records the buffer is appended to the
// output file in one write. Whatever is left is written when the writer
// stops, so a clean shutdown never loses records; a killed process keeps
// everything up to the last full batch.
//
// The writer stops when:
// - the result channel is closed and empty, or
// - nothing arrived for a whole quiet period and the caller says no more
//   work is coming
// =============================================================================

use super::queue::{Dequeued, WorkQueue};
use crate::adstxt::{ParsedRecord, StrippedRecord};
use crate::error::WriterError;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

// How long to wait per record while discarding after a failure
const DISCARD_WAIT: Duration = Duration::from_millis(100);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriterReport {
    pub records_written: usize,
    pub batches_flushed: usize,
}

pub struct BatchWriter {
    output: PathBuf,
    batch_size: usize,
    quiet_period: Duration,
    keep_raw: bool,
    buffer: Vec<u8>,
    pending: usize,
    report: WriterReport,
}

impl BatchWriter {
    pub fn new(output: PathBuf, batch_size: usize, quiet_period: Duration, keep_raw: bool) -> Self {
        Self {
            output,
            batch_size: batch_size.max(1),
            quiet_period,
            keep_raw,
            buffer: Vec::new(),
            pending: 0,
            report: WriterReport::default(),
        }
    }

    // Drains `results` into the output file.
    //
    // `more_work` is asked after a quiet period; while it returns true the
    // writer keeps waiting. On failure the result channel is closed and
    // drained so producers never block on a writer that is gone.
    pub async fn run<F>(
        mut self,
        results: Arc<WorkQueue<ParsedRecord>>,
        more_work: F,
    ) -> Result<WriterReport, WriterError>
    where
        F: Fn() -> bool,
    {
        let outcome = match self.prepare_output().await {
            Ok(()) => self.drain(&results, more_work).await,
            Err(error) => Err(error),
        };

        if let Err(error) = &outcome {
            tracing::error!(output = %self.output.display(), %error, "writer failed, discarding remaining results");
            results.close();
            while let Dequeued::Item(_) = results.dequeue(DISCARD_WAIT).await {
                results.ack();
            }
        }

        outcome
    }

    async fn drain<F>(
        &mut self,
        results: &WorkQueue<ParsedRecord>,
        more_work: F,
    ) -> Result<WriterReport, WriterError>
    where
        F: Fn() -> bool,
    {
        loop {
            match results.dequeue(self.quiet_period).await {
                Dequeued::Item(record) => {
                    let pushed = self.push(&record).await;
                    results.ack();
                    pushed?;
                }
                Dequeued::Closed => break,
                Dequeued::Idle if more_work() => {
                    tracing::debug!("no results for a while, scan still running");
                }
                Dequeued::Idle => {
                    tracing::debug!("quiet period elapsed, writer exiting");
                    break;
                }
            }
        }

        self.flush().await?;
        Ok(self.report)
    }

    // Creates the output file (and its directory) up front so a bad path
    // fails before any domain is scanned
    async fn prepare_output(&self) -> Result<(), WriterError> {
        if let Some(parent) = self.output.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|source| self.io_error(source))?;
            }
        }

        self.open().await.map(|_| ())
    }

    async fn push(&mut self, record: &ParsedRecord) -> Result<(), WriterError> {
        let line = if self.keep_raw {
            serde_json::to_vec(record)
        } else {
            serde_json::to_vec(&StrippedRecord::from(record))
        }
        .map_err(|source| WriterError::Serialize {
            domain: record.domain.clone(),
            source,
        })?;

        self.buffer.extend_from_slice(&line);
        self.buffer.push(b'\n');
        self.pending += 1;

        if self.pending >= self.batch_size {
            self.flush().await?;
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), WriterError> {
        if self.pending == 0 {
            return Ok(());
        }

        let mut file = self.open().await?;
        file.write_all(&self.buffer)
            .await
            .map_err(|source| self.io_error(source))?;
        file.flush().await.map_err(|source| self.io_error(source))?;

        self.report.records_written += self.pending;
        self.report.batches_flushed += 1;
        tracing::info!(
            records = self.pending,
            total = self.report.records_written,
            output = %self.output.display(),
            "batch written"
        );

        self.buffer.clear();
        self.pending = 0;
        Ok(())
    }

    async fn open(&self) -> Result<tokio::fs::File, WriterError> {
        tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.output)
            .await
            .map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: std::io::Error) -> WriterError {
        WriterError::Io {
            path: self.output.clone(),
            source,
        }
    }
}
