//! Chat Front HTTP Server binary.
//!
//! Serves `/api/chat` in the streaming data-stream protocol, backed by a small
//! built-in review workflow that pauses for a human confirmation.
//!
//! # Environment Variables
//!
//! - `CHAT_FRONT_ADDR`: HTTP server bind address (default: 127.0.0.1:8000)
//! - `CHAT_FRONT_LOG_FORMAT`: `plain` or `json` (default: plain)
//! - `CHAT_FRONT_STORAGE_TYPE`: `Standalone` (in-memory) or `Scalable` (Redis-backed)
//! - `REDIS_URL`: Redis URL for Scalable mode
//! - `RUST_LOG`: Log filter (default: info)
//!
//! See `ServerConfig` for file related options.

use anyhow::Result;
use async_trait::async_trait;
use chat_front::config::{LogFormat, StorageType};
use chat_front::handler::ChatHandler;
use chat_front::hydrate::FileHydrator;
use chat_front::runner::WorkflowRunner;
use chat_front::server::boot_chat_front_server;
use chat_front::snapshot::{
    HitlController, InMemorySnapshotStore, RedisSnapshotStore, Snapshot, SnapshotStore,
};
use chat_front::types::{Artifact, ArtifactKind, HumanResponse, SourceNodeFactory, WorkflowEvent};
use chat_front::workflow::{
    JsonStateContext, StatelessContext, Workflow, WorkflowHandle, WorkflowInput,
};
use chat_front::ServerConfig;
use dotenvy::dotenv;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let config = ServerConfig::from_env();
    init_tracing(config.log_format)?;

    tracing::info!(
        "Chat Front configuration: bind_addr={}, storage={:?}, snapshot_ttl={}s, file_root={}",
        config.bind_addr,
        config.snapshot.storage_type,
        config.snapshot.ttl_sec,
        config.files.file_root.display()
    );

    let store: Arc<dyn SnapshotStore> = match config.snapshot.storage_type {
        StorageType::Scalable => {
            tracing::info!("Using Scalable mode with Redis snapshot storage");
            Arc::new(RedisSnapshotStore::from_url(
                &config.snapshot.redis_url,
                config.snapshot.ttl_sec,
            )?)
        }
        StorageType::Standalone => {
            tracing::info!("Using Standalone mode with in-memory snapshot storage");
            InMemorySnapshotStore::shared(config.snapshot.max_entries, config.snapshot.ttl_sec)
        }
    };

    let hydrator = FileHydrator::from_config(&config.files)?;
    if hydrator.is_none() {
        tracing::info!("Remote file hydration disabled (CHAT_FRONT_REMOTE_FILE_BASE_URL unset)");
    }

    let shutdown = CancellationToken::new();
    let runner = WorkflowRunner::new(
        Arc::new(ReviewWorkflow),
        HitlController::new(store),
        SourceNodeFactory::from_config(&config.files),
    )
    .with_hydrator(hydrator)
    .with_shutdown(shutdown.clone());
    let handler = ChatHandler::new(Arc::new(runner));

    let result = boot_chat_front_server(handler, config, shutdown, None).await;
    if let Err(e) = &result {
        tracing::error!("Chat Front HTTP Server error: {:#?}", e);
    }
    tracing::info!("Chat Front HTTP Server shutdown complete");
    result
}

fn init_tracing(format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?,
        LogFormat::Plain => registry.with(tracing_subscriber::fmt::layer()).try_init()?,
    }
    Ok(())
}

/// State carried across the confirmation pause.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ReviewState {
    topic: String,
    summary: String,
}

/// Drafts a summary of the request, then waits for the user to approve it.
struct ReviewWorkflow;

#[async_trait]
impl Workflow for ReviewWorkflow {
    fn name(&self) -> &str {
        "review"
    }

    async fn start(&self, input: WorkflowInput) -> anyhow::Result<WorkflowHandle> {
        let context = JsonStateContext::new(ReviewState::default());
        let state = context.clone();
        let topic = input.user_input;
        let events = async_stream::stream! {
            yield Ok::<_, anyhow::Error>(WorkflowEvent::agent_text(
                "Planner",
                format!("Reviewing '{}'", topic),
            ));
            yield Ok(WorkflowEvent::tool_call("search_documents", json!({"query": topic}), "call_1"));
            yield Ok(WorkflowEvent::tool_call_result(
                "call_1",
                json!({
                    "sourceNodes": [{
                        "id": "node_1",
                        "score": 1.0,
                        "text": format!("Notes about {}", topic),
                        "metadata": {"file_name": "notes.md"}
                    }]
                }),
            ));
            let summary = format!("Summary of {}.", topic);
            for word in ["Here is a draft: ", summary.as_str()] {
                yield Ok(WorkflowEvent::text(word));
            }
            state.update(|s| {
                s.topic = topic.clone();
                s.summary = summary.clone();
            });
            yield Ok(WorkflowEvent::human_input(
                "confirm",
                json!({"question": "Publish this summary?", "summary": summary}),
            ));
        };
        Ok(WorkflowHandle::new(events.boxed(), context))
    }

    async fn resume(
        &self,
        snapshot: Snapshot,
        response: HumanResponse,
    ) -> anyhow::Result<WorkflowHandle> {
        let state: ReviewState = snapshot.from_json()?;
        let confirmed = response.data.as_bool().unwrap_or(false)
            || response.data.get("confirmed").and_then(|v| v.as_bool()) == Some(true);
        let mut events: Vec<anyhow::Result<WorkflowEvent>> = Vec::new();
        if confirmed {
            let data = json!({"title": state.topic, "content": state.summary});
            let artifact = Artifact::new(
                ArtifactKind::Document,
                data.as_object().cloned().unwrap_or_default(),
            );
            events.push(Ok(WorkflowEvent::text(format!(
                "Published the summary of {}.",
                state.topic
            ))));
            events.push(Ok(WorkflowEvent::Artifact { artifact }));
        } else {
            events.push(Ok(WorkflowEvent::text("Discarded the draft.")));
        }
        events.push(Ok(WorkflowEvent::Stop));
        Ok(WorkflowHandle::new(
            futures::stream::iter(events).boxed(),
            Arc::new(StatelessContext),
        ))
    }
}
