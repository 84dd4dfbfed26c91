//! Redis-backed snapshot store for scalable deployments.
//!
//! Lets a workflow paused on one server instance be resumed on another.

use super::store::{Snapshot, SnapshotStore};
use async_trait::async_trait;
use deadpool_redis::redis::AsyncCommands;
use deadpool_redis::Pool;

/// Redis key prefix for snapshots
const SNAPSHOT_KEY_PREFIX: &str = "chat_front:snapshot:";

#[derive(Clone)]
pub struct RedisSnapshotStore {
    pool: Pool,
    ttl_sec: u64,
}

impl RedisSnapshotStore {
    /// Create a new Redis snapshot store.
    ///
    /// # Arguments
    /// * `pool` - Redis connection pool
    /// * `ttl_sec` - Snapshot TTL in seconds
    pub fn new(pool: Pool, ttl_sec: u64) -> Self {
        Self { pool, ttl_sec }
    }

    /// Create a store with its own pool from a Redis URL
    pub fn from_url(url: &str, ttl_sec: u64) -> anyhow::Result<Self> {
        let pool = deadpool_redis::Config::from_url(url)
            .create_pool(Some(deadpool_redis::Runtime::Tokio1))?;
        Ok(Self::new(pool, ttl_sec))
    }

    fn snapshot_key(key: &str) -> String {
        format!("{}{}", SNAPSHOT_KEY_PREFIX, key)
    }
}

#[async_trait]
impl SnapshotStore for RedisSnapshotStore {
    async fn put(&self, key: &str, snapshot: Snapshot) -> anyhow::Result<()> {
        let mut conn = self.pool.get().await?;
        conn.set_ex::<_, _, ()>(Self::snapshot_key(key), snapshot.as_bytes(), self.ttl_sec)
            .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<Snapshot>> {
        let mut conn = self.pool.get().await?;
        let bytes: Option<Vec<u8>> = conn.get(Self::snapshot_key(key)).await?;
        Ok(bytes.map(Snapshot::from_bytes))
    }

    async fn delete(&self, key: &str) -> anyhow::Result<bool> {
        let mut conn = self.pool.get().await?;
        let removed: u64 = conn.del(Self::snapshot_key(key)).await?;
        Ok(removed > 0)
    }
}
