// src/scan/mod.rs
// =============================================================================
// The crawl itself.
//
// Submodules:
// - queue: bounded work queue with ack/join completion tracking
// - worker: scanner workers (frontier -> fetch -> parse -> results)
// - writer: the single task that appends results to the output file
// - orchestrator: wires the above together for one run
//
// Data flow:
//   seeds -> frontier -> workers -> { frontier (sub-domains), results } -> writer -> file
// =============================================================================

mod orchestrator;
mod queue;
mod worker;
mod writer;

pub use orchestrator::run;

// Shared test doubles for the worker and orchestrator tests
#[cfg(test)]
pub(crate) mod testing {
    use crate::adstxt::Fetcher;
    use crate::error::FetchError;
    use async_trait::async_trait;
    use dashmap::DashMap;
    use std::collections::HashMap;
    use std::sync::Arc;

    // Serves canned responses; unknown domains fail to connect
    #[derive(Clone, Default)]
    pub struct MapFetcher {
        responses: Arc<HashMap<String, Result<String, FetchError>>>,
        calls: Arc<DashMap<String, usize>>,
    }

    impl MapFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_body(self, domain: &str, body: &str) -> Self {
            self.with_response(domain, Ok(body.to_string()))
        }

        pub fn with_error(self, domain: &str, error: FetchError) -> Self {
            self.with_response(domain, Err(error))
        }

        fn with_response(self, domain: &str, response: Result<String, FetchError>) -> Self {
            let mut responses = (*self.responses).clone();
            responses.insert(domain.to_string(), response);
            Self {
                responses: Arc::new(responses),
                calls: self.calls,
            }
        }

        /// How many times a domain was fetched
        pub fn calls(&self, domain: &str) -> usize {
            self.calls.get(domain).map_or(0, |count| *count)
        }
    }

    #[async_trait]
    impl Fetcher for MapFetcher {
        async fn fetch(&self, domain: &str) -> Result<String, FetchError> {
            *self.calls.entry(domain.to_string()).or_insert(0) += 1;
            self.responses
                .get(domain)
                .cloned()
                .unwrap_or(Err(FetchError::ConnectionFailure))
        }
    }
}
