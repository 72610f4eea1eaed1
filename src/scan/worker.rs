// src/scan/worker.rs
// =============================================================================
// Scanner workers.
//
// Each worker loops over the frontier:
// 1. Take a domain (skip it if it was already committed)
// 2. Fetch and parse its ads.txt
// 3. Commit the domain to the dedup store
// 4. Push newly declared sub-domains back onto the frontier
// 5. Hand the record to the writer
// 6. Ack the frontier item
//
// The ack comes last on purpose: as long as a domain is not acked the
// frontier's outstanding count stays above zero, so the orchestrator cannot
// see "all done" while this worker still has sub-domains or a record to push.
// =============================================================================

use super::queue::{Dequeued, WorkQueue};
use crate::adstxt::{fetch_domain, Fetcher, ParsedRecord};
use crate::dedup::DedupStore;
use std::sync::Arc;
use std::time::Duration;

// Everything a worker shares with the other workers
pub struct ScanContext {
    pub frontier: Arc<WorkQueue<String>>,
    pub results: Arc<WorkQueue<ParsedRecord>>,
    pub store: Arc<dyn DedupStore>,
    pub fetcher: Arc<dyn Fetcher>,
    pub idle_timeout: Duration,
}

// Per-worker counters, summed by the orchestrator at the end
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WorkerStats {
    /// Domains fetched and handed to the writer
    pub processed: usize,
    /// Domains dropped because they were already committed
    pub skipped: usize,
    /// Fetches that ended in a transport error
    pub fetch_errors: usize,
    /// Responses thrown away because they were HTML
    pub rejected: usize,
    /// Sub-domains pushed back onto the frontier
    pub subdomains_enqueued: usize,
}

impl WorkerStats {
    pub fn merge(&mut self, other: &WorkerStats) {
        self.processed += other.processed;
        self.skipped += other.skipped;
        self.fetch_errors += other.fetch_errors;
        self.rejected += other.rejected;
        self.subdomains_enqueued += other.subdomains_enqueued;
    }
}

// Runs one worker until the frontier is closed, or until it goes idle with
// nothing outstanding anywhere.
pub async fn scan_domains(id: usize, context: Arc<ScanContext>) -> WorkerStats {
    let mut stats = WorkerStats::default();

    loop {
        // Step 1: wait for a domain, or decide the crawl is over
        let domain = match context.frontier.dequeue(context.idle_timeout).await {
            Dequeued::Item(domain) => domain,
            Dequeued::Closed => break,
            // Another worker may still be fetching and about to add sub-domains
            Dequeued::Idle if context.frontier.outstanding() > 0 => continue,
            Dequeued::Idle => break,
        };

        // Step 2: scan it, then ack only once everything it produced is queued
        process_domain(&context, domain.trim(), &mut stats).await;
        context.frontier.ack();
    }

    tracing::debug!(worker = id, ?stats, "worker finished");
    stats
}

async fn process_domain(context: &ScanContext, domain: &str, stats: &mut WorkerStats) {
    // Already done by someone else? Don't even fetch it
    if domain.is_empty() || is_committed(context, domain).await {
        stats.skipped += 1;
        return;
    }

    // Fetch and parse (HTML bodies come back as None)
    let result = fetch_domain(context.fetcher.as_ref(), domain).await;
    if result.error.is_some() {
        stats.fetch_errors += 1;
    } else if result.body.is_none() {
        stats.rejected += 1;
    }

    let record = ParsedRecord::from(result);

    // Commit before any sub-domain is enqueued. Losing the race to another
    // worker means that worker owns the domain and its output.
    let expand = match context.store.add(domain).await {
        Ok(true) => true,
        Ok(false) => {
            tracing::debug!(domain, "committed by another worker, dropping duplicate");
            stats.skipped += 1;
            return;
        }
        Err(error) => {
            tracing::warn!(domain, %error, "could not commit domain, not following its sub-domains");
            false
        }
    };

    // Feed new sub-domains back in; this waits if the frontier is full
    if expand {
        for subdomain in &record.parsed.subdomains {
            if is_committed(context, subdomain).await {
                continue;
            }

            match context.frontier.enqueue(subdomain.clone()).await {
                Ok(()) => stats.subdomains_enqueued += 1,
                Err(error) => {
                    tracing::warn!(domain, subdomain = subdomain.as_str(), %error, "could not enqueue sub-domain");
                }
            }
        }
    }

    tracing::debug!(
        domain,
        entries = record.parsed.entries.len(),
        subdomains = record.parsed.subdomains.len(),
        queued = context.frontier.len(),
        "scanned"
    );

    // Hand the record to the writer
    if let Err(error) = context.results.enqueue(record).await {
        tracing::warn!(domain, %error, "result dropped, writer is gone");
        return;
    }
    stats.processed += 1;
}

// A store failure counts as "not committed": scanning a domain twice is
// better than never scanning it.
async fn is_committed(context: &ScanContext, domain: &str) -> bool {
    match context.store.contains(domain).await {
        Ok(committed) => committed,
        Err(error) => {
            tracing::warn!(domain, %error, "dedup lookup failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::MemoryDedupStore;
    use crate::error::StoreError;
    use crate::scan::testing::MapFetcher;
    use async_trait::async_trait;

    fn context(fetcher: MapFetcher, store: Arc<dyn DedupStore>) -> Arc<ScanContext> {
        Arc::new(ScanContext {
            frontier: Arc::new(WorkQueue::new(16)),
            results: Arc::new(WorkQueue::new(16)),
            store,
            fetcher: Arc::new(fetcher),
            idle_timeout: Duration::from_millis(50),
        })
    }

    async fn drain(results: &WorkQueue<ParsedRecord>) -> Vec<ParsedRecord> {
        let mut records = Vec::new();
        while let Dequeued::Item(record) = results.dequeue(Duration::from_millis(20)).await {
            results.ack();
            records.push(record);
        }
        records
    }

    #[tokio::test]
    async fn test_skips_committed_domain_without_fetching() {
        let store = Arc::new(MemoryDedupStore::new());
        store.add("a.com").await.unwrap();

        let fetcher = MapFetcher::new().with_body("a.com", "x.com, 1, DIRECT");
        let context = context(fetcher.clone(), store.clone());
        context.frontier.enqueue("a.com".to_string()).await.unwrap();

        let stats = scan_domains(0, Arc::clone(&context)).await;

        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.processed, 0);
        assert_eq!(fetcher.calls("a.com"), 0);
        assert_eq!(context.frontier.outstanding(), 0);
        assert!(drain(&context.results).await.is_empty());
    }

    #[tokio::test]
    async fn test_follows_subdomains_and_commits() {
        let store = Arc::new(MemoryDedupStore::new());
        let fetcher = MapFetcher::new()
            .with_body("a.com", "x.com, 1, DIRECT\nsubdomain=shop.a.com\nsubdomain=a.com")
            .with_body("shop.a.com", "y.com, 2, RESELLER, cert");
        let context = context(fetcher, store.clone());
        context.frontier.enqueue(" a.com ".to_string()).await.unwrap();

        let stats = scan_domains(0, Arc::clone(&context)).await;

        assert_eq!(stats.processed, 2);
        assert_eq!(stats.subdomains_enqueued, 1);
        assert!(store.contains("a.com").await.unwrap());
        assert!(store.contains("shop.a.com").await.unwrap());

        let mut domains: Vec<_> = drain(&context.results)
            .await
            .into_iter()
            .map(|record| record.domain)
            .collect();
        domains.sort();
        assert_eq!(domains, vec!["a.com", "shop.a.com"]);
        assert_eq!(context.frontier.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_counts_errors_and_rejections() {
        let store = Arc::new(MemoryDedupStore::new());
        let fetcher = MapFetcher::new().with_body("html.com", "<!DOCTYPE html><html></html>");
        let context = context(fetcher, store);
        context.frontier.enqueue("html.com".to_string()).await.unwrap();
        context.frontier.enqueue("down.com".to_string()).await.unwrap();

        let stats = scan_domains(0, Arc::clone(&context)).await;

        assert_eq!(stats.processed, 2);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.fetch_errors, 1);
    }

    // Every domain looks new, but another worker always commits it first
    struct AlwaysLosesStore;

    #[async_trait]
    impl DedupStore for AlwaysLosesStore {
        async fn contains(&self, _domain: &str) -> Result<bool, StoreError> {
            Ok(false)
        }

        async fn add(&self, _domain: &str) -> Result<bool, StoreError> {
            Ok(false)
        }

        async fn clear(&self) -> Result<(), StoreError> {
            Ok(())
        }

        async fn len(&self) -> Result<usize, StoreError> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_losing_commit_race_drops_record_and_subdomains() {
        let fetcher = MapFetcher::new()
            .with_body("a.com", "x.com, 1, DIRECT\nsubdomain=b.com")
            .with_body("b.com", "y.com, 2, DIRECT");
        let context = context(fetcher.clone(), Arc::new(AlwaysLosesStore));
        context.frontier.enqueue("a.com".to_string()).await.unwrap();

        let stats = scan_domains(0, Arc::clone(&context)).await;

        assert_eq!(fetcher.calls("a.com"), 1);
        assert_eq!(fetcher.calls("b.com"), 0);
        assert_eq!(stats.processed, 0);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.subdomains_enqueued, 0);
        assert_eq!(context.results.outstanding(), 0);
        assert_eq!(context.frontier.outstanding(), 0);
        assert!(drain(&context.results).await.is_empty());
    }

    #[test]
    fn test_merge_stats() {
        let mut total = WorkerStats {
            processed: 1,
            ..Default::default()
        };
        total.merge(&WorkerStats {
            processed: 2,
            skipped: 3,
            fetch_errors: 4,
            rejected: 5,
            subdomains_enqueued: 6,
        });
        assert_eq!(total.processed, 3);
        assert_eq!(total.skipped, 3);
        assert_eq!(total.subdomains_enqueued, 6);
    }
}
