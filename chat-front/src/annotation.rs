//! Annotations: the JSON side channel of the chat stream.
//!
//! Every non-text workflow event reaches the client as an [`Annotation`]
//! (`{type, data}`). Some annotations (artifacts, human responses) must
//! survive inside persisted chat history; [`codec::InlineAnnotationCodec`]
//! embeds them in plain message content as fenced blocks.

pub mod codec;
pub mod schema;

pub use codec::InlineAnnotationCodec;
pub use schema::SchemaRegistry;

use crate::types::artifact::Artifact;
use crate::types::event::{AgentRunKind, HumanResponse, Progress};
use crate::types::source::SourceNode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const ANNOTATION_AGENT: &str = "agent";
pub const ANNOTATION_SOURCES: &str = "sources";
pub const ANNOTATION_ARTIFACT: &str = "artifact";
pub const ANNOTATION_TOOL_RESULT: &str = "tool_result";
pub const ANNOTATION_HUMAN_RESPONSE: &str = "human_response";
pub const ANNOTATION_SUGGESTED_QUESTIONS: &str = "suggested_questions";

/// Wire-visible projection of a non-text event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

impl Annotation {
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }

    pub fn agent(
        agent: impl Into<String>,
        text: impl Into<String>,
        kind: AgentRunKind,
        progress: Option<Progress>,
    ) -> Self {
        let payload = schema::AgentPayload {
            agent: agent.into(),
            text: text.into(),
            kind,
            data: progress,
        };
        Self::new(ANNOTATION_AGENT, json!(payload))
    }

    pub fn sources(nodes: &[SourceNode]) -> Self {
        Self::new(ANNOTATION_SOURCES, json!({ "nodes": nodes }))
    }

    pub fn artifact(artifact: &Artifact) -> Self {
        Self::new(ANNOTATION_ARTIFACT, json!(artifact))
    }

    pub fn human_response(response: &HumanResponse) -> Self {
        Self::new(ANNOTATION_HUMAN_RESPONSE, response.data.clone())
    }

    pub fn suggested_questions(questions: &[String]) -> Self {
        Self::new(ANNOTATION_SUGGESTED_QUESTIONS, json!(questions))
    }

    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }

    /// Typed view of the payload
    pub fn data_as<T: serde::de::DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_value(self.data.clone())
            .inspect_err(|e| {
                tracing::debug!(annotation_type = %self.kind, error = %e, "Annotation payload has unexpected shape")
            })
            .ok()
    }
}
