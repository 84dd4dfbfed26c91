//! Chat message types exchanged with the client.

use serde::{Deserialize, Serialize};

/// Role of a message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User/human message
    #[default]
    User,
    /// Assistant/AI message
    Assistant,
    /// System message
    System,
    /// Tool response message
    Tool,
}

/// A message in the conversation.
///
/// `content` is plain text and may carry inline annotation blocks; the
/// optional `annotations` array carries structured annotations attached by
/// the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender
    pub role: Role,

    /// Message text
    #[serde(default)]
    pub content: String,

    /// Structured annotations attached to this message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Vec<serde_json::Value>>,
}

impl ChatMessage {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            annotations: None,
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            annotations: None,
        }
    }

    /// Attach structured annotations
    pub fn with_annotations(mut self, annotations: Vec<serde_json::Value>) -> Self {
        self.annotations = Some(annotations);
        self
    }
}

/// Body of a chat request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Full conversation, oldest first; the last message is the new user input
    #[serde(default)]
    pub messages: Vec<ChatMessage>,

    /// Request/conversation id, used as the snapshot correlation key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}
