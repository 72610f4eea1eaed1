// src/dedup/mod.rs
// =============================================================================
// The dedup store: a shared set of domains that a worker has committed to.
//
// This is the only state more than one worker mutates directly (everything
// else goes through a queue), so its `add` has to be atomic: when two
// workers race to add the same domain, exactly one of them is told it
// inserted it.
//
// Backends:
// - memory: a DashSet inside this process (default)
// - redis_store: a Redis set, for sharing the set with other tools
// =============================================================================

mod memory;
mod redis_store;

pub use memory::MemoryDedupStore;
pub use redis_store::RedisDedupStore;

use crate::error::StoreError;
use async_trait::async_trait;

/// Name of the set holding committed domains for the current run
pub const COMPLETE_KEY: &str = "adstxt_complete";

#[async_trait]
pub trait DedupStore: Send + Sync {
    /// Has this domain already been committed?
    async fn contains(&self, domain: &str) -> Result<bool, StoreError>;

    /// Commits a domain. Returns true only for the call that inserted it.
    async fn add(&self, domain: &str) -> Result<bool, StoreError>;

    /// Forgets every domain
    async fn clear(&self) -> Result<(), StoreError>;

    /// Number of committed domains
    async fn len(&self) -> Result<usize, StoreError>;
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why is the trait async?
//    - The Redis backend has to talk over the network
//    - #[async_trait] lets us write `async fn` in a trait and use it as
//      `Arc<dyn DedupStore>`
//
// 2. Why Send + Sync?
//    - The same store is shared by every worker task through an Arc
//    - Tasks may run on different threads, so the store must be safe to
//      share between them
// -----------------------------------------------------------------------------
