//! Interface to the external workflow engine.
//!
//! The engine is a black box that turns an input into an ordered stream of
//! [`WorkflowEvent`](crate::types::event::WorkflowEvent)s. To take part in
//! human-in-the-loop pauses, its execution context must expose a
//! [`Snapshotter`] that serializes the continuation.

use crate::events::encoder::EventStream;
use crate::snapshot::store::Snapshot;
use crate::types::event::HumanResponse;
use crate::types::message::ChatMessage;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Arc, Mutex};

/// Input of a fresh run.
#[derive(Debug, Clone)]
pub struct WorkflowInput {
    /// Content of the latest user message
    pub user_input: String,
    /// Messages preceding the latest user message
    pub chat_history: Vec<ChatMessage>,
    /// Correlation id of this request
    pub request_id: String,
}

/// Serializes the continuation of a running workflow.
#[async_trait]
pub trait Snapshotter: Send + Sync {
    async fn snapshot(&self) -> anyhow::Result<Snapshot>;
}

/// Execution context of one running workflow instance.
pub trait ExecutionContext: Send + Sync {
    /// `None` when this engine cannot be suspended
    fn snapshotter(&self) -> Option<&dyn Snapshotter>;
}

/// A running workflow: its event stream and its execution context.
pub struct WorkflowHandle {
    pub events: EventStream,
    pub context: Arc<dyn ExecutionContext>,
}

impl WorkflowHandle {
    pub fn new(events: EventStream, context: Arc<dyn ExecutionContext>) -> Self {
        Self { events, context }
    }
}

#[async_trait]
pub trait Workflow: Send + Sync {
    fn name(&self) -> &str;

    /// Start a new execution
    async fn start(&self, input: WorkflowInput) -> anyhow::Result<WorkflowHandle>;

    /// Continue a suspended execution, seeded with the human's response
    async fn resume(
        &self,
        snapshot: Snapshot,
        response: HumanResponse,
    ) -> anyhow::Result<WorkflowHandle>;
}

/// Context of an engine without snapshot support.
pub struct StatelessContext;

impl ExecutionContext for StatelessContext {
    fn snapshotter(&self) -> Option<&dyn Snapshotter> {
        None
    }
}

/// Context whose continuation is a serde value snapshotted as JSON.
///
/// The workflow mutates the state through [`JsonStateContext::update`] while
/// it runs; a snapshot captures the state as of the pause.
pub struct JsonStateContext<S> {
    state: Mutex<S>,
}

impl<S> JsonStateContext<S>
where
    S: Serialize + Clone + Send + 'static,
{
    pub fn new(state: S) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(state),
        })
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }

    pub fn state(&self) -> S {
        self.update(|s| s.clone())
    }
}

#[async_trait]
impl<S> Snapshotter for JsonStateContext<S>
where
    S: Serialize + Clone + Send + 'static,
{
    async fn snapshot(&self) -> anyhow::Result<Snapshot> {
        Ok(Snapshot::to_json(&self.state())?)
    }
}

impl<S> ExecutionContext for JsonStateContext<S>
where
    S: Serialize + Clone + Send + 'static,
{
    fn snapshotter(&self) -> Option<&dyn Snapshotter> {
        Some(self)
    }
}
