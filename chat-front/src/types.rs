//! Type definitions shared across the streaming pipeline.

pub mod artifact;
pub mod event;
pub mod message;
pub mod source;

// Re-export commonly used types
pub use artifact::{Artifact, ArtifactKind};
pub use event::{AgentRunKind, HumanResponse, Progress, ToolCall, WorkflowEvent};
pub use message::{ChatMessage, ChatRequest, Role};
pub use source::{SourceNode, SourceNodeFactory};
