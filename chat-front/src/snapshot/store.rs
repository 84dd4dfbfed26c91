//! Snapshot persistence for suspended workflows.

use async_trait::async_trait;
use bytes::Bytes;
use moka::future::Cache;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Opaque serialized continuation of one suspended workflow execution.
///
/// The encoding belongs to the workflow engine; the JSON helpers exist for
/// engines that keep their state as serde types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot(Bytes);

impl Snapshot {
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    pub fn to_json<T: Serialize>(state: &T) -> serde_json::Result<Self> {
        Ok(Self(Bytes::from(serde_json::to_vec(state)?)))
    }

    pub fn from_json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Key -> snapshot map.
///
/// Writes are last-write-wins per key and never touch other keys.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Store `snapshot` at `key`, replacing any previous value
    async fn put(&self, key: &str, snapshot: Snapshot) -> anyhow::Result<()>;

    async fn get(&self, key: &str) -> anyhow::Result<Option<Snapshot>>;

    /// Returns whether a snapshot was removed
    async fn delete(&self, key: &str) -> anyhow::Result<bool>;
}

/// In-memory snapshot store for standalone deployments.
///
/// Entries expire after the configured TTL; the least recently used entries
/// are evicted beyond `max_entries`.
#[derive(Clone)]
pub struct InMemorySnapshotStore {
    cache: Cache<String, Snapshot>,
}

impl InMemorySnapshotStore {
    pub fn new(max_entries: u64, ttl_sec: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(Duration::from_secs(ttl_sec))
            .build();
        Self { cache }
    }

    pub fn shared(max_entries: u64, ttl_sec: u64) -> Arc<dyn SnapshotStore> {
        Arc::new(Self::new(max_entries, ttl_sec))
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn put(&self, key: &str, snapshot: Snapshot) -> anyhow::Result<()> {
        self.cache.insert(key.to_string(), snapshot).await;
        Ok(())
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<Snapshot>> {
        Ok(self.cache.get(key).await)
    }

    async fn delete(&self, key: &str) -> anyhow::Result<bool> {
        Ok(self.cache.remove(key).await.is_some())
    }
}
