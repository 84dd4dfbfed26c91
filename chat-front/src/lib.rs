//! Chat Front - streaming chat layer with human-in-the-loop resumption.
//!
//! This crate turns the event stream of a workflow engine into the
//! line-framed data-stream protocol consumed by chat UIs, and lets a
//! workflow suspend for human input and resume on a later request.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Chat UI                              │
//! └─────────────────────────┬───────────────────────────────────┘
//!                           │ POST /api/chat (data stream v1)
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      chat-front                             │
//! │  ┌────────────────┐  ┌────────────────┐  ┌───────────────┐ │
//! │  │ HTTP Endpoint  │  │ WorkflowRunner │  │ StreamEncoder │ │
//! │  │ (axum 0.8)     │  │ fresh / resume │  │ + Normalizer  │ │
//! │  └───────┬────────┘  └───────┬────────┘  └───────┬───────┘ │
//! │          │                   │                   │         │
//! │  ┌───────┴────────┐  ┌───────┴────────┐  ┌───────┴───────┐ │
//! │  │ InlineAnnota-  │  │ HitlController │  │ FileHydrator  │ │
//! │  │ tionCodec      │  │ SnapshotStore  │  │ (background)  │ │
//! │  └────────────────┘  └────────────────┘  └───────────────┘ │
//! └──────────────────────────────┬──────────────────────────────┘
//!                                ▼
//!                     Workflow engine (trait)
//! ```
//!
//! # Modules
//!
//! - `annotation`: Annotation types, schemas and the inline transcript codec
//! - `config`: Server configuration
//! - `error`: Error types
//! - `events`: Event normalization and data-stream encoding
//! - `handler`: Chat request validation
//! - `hydrate`: Background download of remote source files
//! - `runner`: Per-request fresh run / resume orchestration
//! - `server`: HTTP endpoints
//! - `snapshot`: Snapshot stores and the HITL controller
//! - `types`: Event, message, source and artifact types
//! - `workflow`: Interface to the workflow engine
//!
//! # Environment Variables
//!
//! - `CHAT_FRONT_ADDR`: Server bind address (default: 127.0.0.1:8000)
//! - `CHAT_FRONT_LOG_FORMAT`: `plain` or `json` (default: plain)
//! - `CHAT_FRONT_STORAGE_TYPE`: `Standalone` or `Scalable` (default: Standalone)
//! - `CHAT_FRONT_SNAPSHOT_TTL_SEC`: Snapshot TTL in seconds (default: 86400)
//! - `CHAT_FRONT_SNAPSHOT_MAX_ENTRIES`: In-memory snapshot capacity (default: 10000)
//! - `REDIS_URL`: Redis URL for Scalable mode (default: redis://127.0.0.1:6379)
//! - `CHAT_FRONT_FILE_ROOT`: Root of served files (default: .)
//! - `CHAT_FRONT_ALLOWED_FILE_ROOTS`: Servable top-level dirs (default: output,data)
//! - `CHAT_FRONT_FILE_SERVER_URL_PREFIX`: Citation URL prefix (default: /api/files)
//! - `CHAT_FRONT_REMOTE_STORE`: Remote store path segment (default: cloud)
//! - `CHAT_FRONT_REMOTE_FILE_BASE_URL`: Remote download base URL (hydration off when unset)

pub mod annotation;
pub mod config;
pub mod error;
pub mod events;
pub mod handler;
pub mod hydrate;
pub mod runner;
pub mod server;
pub mod snapshot;
pub mod types;
pub mod workflow;

// Re-export main types
pub use annotation::{Annotation, InlineAnnotationCodec, SchemaRegistry};
pub use config::{FileConfig, ServerConfig, SnapshotConfig, StorageType};
pub use error::{ChatFrontError, Result};
pub use events::{
    EventNormalizer, EventStream, Frame, FrameEncoder, StreamCallbacks, StreamEncoder,
};
pub use handler::ChatHandler;
pub use hydrate::{FileHydrator, HttpFileFetcher, RemoteFileFetcher};
pub use runner::{RunMode, SuggestionGenerator, WorkflowRunner};
pub use server::boot_chat_front_server;
pub use snapshot::{
    HitlController, InMemorySnapshotStore, RedisSnapshotStore, Snapshot, SnapshotStore,
};
pub use types::{
    Artifact, ArtifactKind, ChatMessage, ChatRequest, HumanResponse, Role, SourceNode,
    SourceNodeFactory, ToolCall, WorkflowEvent,
};
pub use workflow::{
    ExecutionContext, JsonStateContext, Snapshotter, StatelessContext, Workflow, WorkflowHandle,
    WorkflowInput,
};
