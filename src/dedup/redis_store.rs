// src/dedup/redis_store.rs
// =============================================================================
// Dedup store kept in a Redis set.
//
// SADD is atomic on the server and replies with the number of members it
// added, so "1" means this call won the race for the domain.
// =============================================================================

use super::{DedupStore, COMPLETE_KEY};
use crate::error::StoreError;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

#[derive(Clone)]
pub struct RedisDedupStore {
    client: redis::Client,
    key: String,
}

impl RedisDedupStore {
    /// Opens a client for `redis_url` using the default set name
    pub fn new(redis_url: &str) -> Result<Self, StoreError> {
        Self::with_key(redis_url, COMPLETE_KEY)
    }

    pub fn with_key(redis_url: &str, key: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client,
            key: key.to_string(),
        })
    }

    async fn connection(&self) -> Result<MultiplexedConnection, StoreError> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }
}

#[async_trait]
impl DedupStore for RedisDedupStore {
    async fn contains(&self, domain: &str) -> Result<bool, StoreError> {
        let mut con = self.connection().await?;
        let member: bool = con.sismember(&self.key, domain).await?;
        Ok(member)
    }

    async fn add(&self, domain: &str) -> Result<bool, StoreError> {
        let mut con = self.connection().await?;
        let added: i64 = con.sadd(&self.key, domain).await?;
        Ok(added == 1)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut con = self.connection().await?;
        con.del::<_, ()>(&self.key).await?;
        Ok(())
    }

    async fn len(&self) -> Result<usize, StoreError> {
        let mut con = self.connection().await?;
        let count: usize = con.scard(&self.key).await?;
        Ok(count)
    }
}
