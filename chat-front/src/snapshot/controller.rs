//! Human-in-the-loop pause/resume controller.
//!
//! Per workflow instance: `RUNNING -> SUSPENDED(key) -> RUNNING -> ... -> TERMINATED`.
//! The correlation key is always supplied by the caller.

use super::store::SnapshotStore;
use crate::error::{ChatFrontError, Result};
use crate::types::event::HumanResponse;
use crate::workflow::{ExecutionContext, Workflow, WorkflowHandle};
use std::sync::Arc;

#[derive(Clone)]
pub struct HitlController {
    store: Arc<dyn SnapshotStore>,
}

impl HitlController {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self { store }
    }

    /// Persist the continuation of `context` under `key`.
    ///
    /// Overwrites any snapshot already stored at `key`. Fails with
    /// [`ChatFrontError::Configuration`] when the context cannot be snapshotted.
    pub async fn pause(&self, context: &dyn ExecutionContext, key: &str) -> Result<()> {
        let snapshotter = context.snapshotter().ok_or_else(|| {
            ChatFrontError::Configuration(
                "workflow paused for human input but its context has no snapshot capability"
                    .to_string(),
            )
        })?;
        let snapshot = snapshotter.snapshot().await?;
        tracing::debug!(key = %key, size = snapshot.len(), "Storing workflow snapshot");
        self.store.put(key, snapshot).await?;
        Ok(())
    }

    /// Restore the snapshot at `key` and continue it with `response`.
    pub async fn resume(
        &self,
        workflow: &dyn Workflow,
        key: &str,
        response: HumanResponse,
    ) -> Result<WorkflowHandle> {
        let snapshot = self
            .store
            .get(key)
            .await?
            .ok_or_else(|| ChatFrontError::SnapshotNotFound {
                key: key.to_string(),
            })?;
        tracing::debug!(key = %key, workflow = %workflow.name(), size = snapshot.len(), "Resuming workflow from snapshot");
        Ok(workflow.resume(snapshot, response).await?)
    }

    pub async fn has_snapshot(&self, key: &str) -> Result<bool> {
        Ok(self.store.get(key).await?.is_some())
    }

    /// Drop the snapshot at `key`, e.g. when a conversation is discarded
    pub async fn discard(&self, key: &str) -> Result<bool> {
        Ok(self.store.delete(key).await?)
    }
}
