//! Workflow execution events consumed from the engine.
//!
//! The engine's event stream is an ordered sequence of [`WorkflowEvent`]s.
//! Backends that speak the camelCase vocabulary (`toolCall`, `agentRun`, ...)
//! deserialize into the same variants through serde aliases.

use crate::types::artifact::Artifact;
use crate::types::source::SourceNode;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Presentation kind of an agent run message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AgentRunKind {
    #[default]
    Text,
    Progress,
}

/// Position of one call inside a batch of simultaneous tool calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Progress {
    pub id: String,
    pub current: usize,
    pub total: usize,
}

/// A human's answer to a [`WorkflowEvent::HumanInputRequest`].
///
/// Serialized transparently: the payload is the `data` of a
/// `human_response` annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct HumanResponse {
    pub data: Value,
}

impl HumanResponse {
    pub fn new(data: Value) -> Self {
        Self { data }
    }
}

/// A single tool invocation requested by the workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub args: Value,
    #[serde(alias = "call_id")]
    pub call_id: String,
    /// Agent that issued the call, when the backend reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, args: Value, call_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args,
            call_id: call_id.into(),
            agent: None,
        }
    }

    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }
}

/// Typed execution event produced by the workflow engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    /// Incremental assistant text
    #[serde(alias = "textDelta")]
    TextDelta { delta: String },

    /// One tool call
    #[serde(alias = "toolCall")]
    ToolCall(ToolCall),

    /// N simultaneous tool calls, in submission order
    #[serde(alias = "toolCallBatch")]
    ToolCallBatch { calls: Vec<ToolCall> },

    /// Result of a tool call, attributed by `call_id`
    #[serde(alias = "toolCallResult", rename_all = "camelCase")]
    ToolCallResult {
        #[serde(alias = "call_id")]
        call_id: String,
        #[serde(default)]
        output: Value,
        #[serde(default, alias = "is_error")]
        is_error: bool,
    },

    /// Retrieved citations
    #[serde(alias = "sources")]
    Source { nodes: Vec<SourceNode> },

    /// Agent activity message
    #[serde(alias = "agentRun")]
    AgentRun {
        agent: String,
        text: String,
        #[serde(default)]
        kind: AgentRunKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        progress: Option<Progress>,
    },

    /// Generated code file or document
    Artifact { artifact: Artifact },

    /// Workflow asks a human for input and is about to suspend
    #[serde(alias = "humanInputRequest", rename_all = "camelCase")]
    HumanInputRequest {
        #[serde(alias = "event_type")]
        event_type: String,
        #[serde(default)]
        data: Value,
    },

    /// Engine-specific event, forwarded as-is
    #[serde(rename_all = "camelCase")]
    Custom {
        #[serde(alias = "event_type")]
        event_type: String,
        #[serde(default)]
        data: Value,
    },

    /// End of the workflow's output for this request
    Stop,
}

impl WorkflowEvent {
    pub fn text(delta: impl Into<String>) -> Self {
        WorkflowEvent::TextDelta {
            delta: delta.into(),
        }
    }

    pub fn tool_call(name: impl Into<String>, args: Value, call_id: impl Into<String>) -> Self {
        WorkflowEvent::ToolCall(ToolCall::new(name, args, call_id))
    }

    pub fn tool_call_result(call_id: impl Into<String>, output: Value) -> Self {
        WorkflowEvent::ToolCallResult {
            call_id: call_id.into(),
            output,
            is_error: false,
        }
    }

    pub fn agent_text(agent: impl Into<String>, text: impl Into<String>) -> Self {
        WorkflowEvent::AgentRun {
            agent: agent.into(),
            text: text.into(),
            kind: AgentRunKind::Text,
            progress: None,
        }
    }

    pub fn human_input(event_type: impl Into<String>, data: Value) -> Self {
        WorkflowEvent::HumanInputRequest {
            event_type: event_type.into(),
            data,
        }
    }

    /// Short name for logging
    pub fn kind_name(&self) -> &'static str {
        match self {
            WorkflowEvent::TextDelta { .. } => "text_delta",
            WorkflowEvent::ToolCall(_) => "tool_call",
            WorkflowEvent::ToolCallBatch { .. } => "tool_call_batch",
            WorkflowEvent::ToolCallResult { .. } => "tool_call_result",
            WorkflowEvent::Source { .. } => "source",
            WorkflowEvent::AgentRun { .. } => "agent_run",
            WorkflowEvent::Artifact { .. } => "artifact",
            WorkflowEvent::HumanInputRequest { .. } => "human_input_request",
            WorkflowEvent::Custom { .. } => "custom",
            WorkflowEvent::Stop => "stop",
        }
    }
}
