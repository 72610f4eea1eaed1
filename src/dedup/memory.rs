// src/dedup/memory.rs
// In-process dedup store backed by a concurrent hash set.

use super::DedupStore;
use crate::error::StoreError;
use async_trait::async_trait;
use dashmap::DashSet;

#[derive(Debug, Default)]
pub struct MemoryDedupStore {
    domains: DashSet<String>,
}

impl MemoryDedupStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DedupStore for MemoryDedupStore {
    async fn contains(&self, domain: &str) -> Result<bool, StoreError> {
        Ok(self.domains.contains(domain))
    }

    async fn add(&self, domain: &str) -> Result<bool, StoreError> {
        // DashSet::insert locks the shard, so check-and-insert is one step
        Ok(self.domains.insert(domain.to_string()))
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.domains.clear();
        Ok(())
    }

    async fn len(&self) -> Result<usize, StoreError> {
        Ok(self.domains.len())
    }
}
