//! Chat request handler.
//!
//! ChatHandler validates an incoming chat request and hands it to the
//! [`WorkflowRunner`]. Validation failures are returned before any frame is
//! produced so the HTTP layer can answer with a plain error body.

use crate::error::{ChatFrontError, Result};
use crate::events::frame::Frame;
use crate::runner::WorkflowRunner;
use crate::types::message::{ChatMessage, ChatRequest, Role};
use futures::Stream;
use std::sync::Arc;

#[derive(Clone)]
pub struct ChatHandler {
    runner: Arc<WorkflowRunner>,
}

impl ChatHandler {
    pub fn new(runner: Arc<WorkflowRunner>) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &Arc<WorkflowRunner> {
        &self.runner
    }

    /// Reject requests whose last message is missing, not from the user, or empty.
    ///
    /// A message without text still counts when it carries structured
    /// annotations (a human response sent from a form, for instance).
    pub fn validate(request: &ChatRequest) -> Result<&ChatMessage> {
        let last = request.messages.last().ok_or_else(|| {
            ChatFrontError::Validation("messages must contain at least one message".to_string())
        })?;
        if last.role != Role::User {
            return Err(ChatFrontError::Validation(
                "the last message must be from the user".to_string(),
            ));
        }
        let has_annotations = last.annotations.as_ref().is_some_and(|a| !a.is_empty());
        if last.content.trim().is_empty() && !has_annotations {
            return Err(ChatFrontError::Validation(
                "the last message must not be empty".to_string(),
            ));
        }
        Ok(last)
    }

    /// Validate `request` and start streaming its response.
    ///
    /// The request `id` is the snapshot correlation key; a fresh one is
    /// minted when the client sent none.
    pub async fn handle(
        &self,
        request: ChatRequest,
    ) -> Result<impl Stream<Item = Frame> + Send + 'static> {
        Self::validate(&request)?;
        let ChatRequest { messages, id } = request;
        let key = id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::now_v7().to_string());
        tracing::info!(key = %key, messages = messages.len(), "Handling chat request");
        self.runner.run(messages, key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(messages: Vec<ChatMessage>) -> ChatRequest {
        ChatRequest {
            messages,
            id: Some("req_1".to_string()),
        }
    }

    #[test]
    fn test_validate_accepts_user_message() {
        let req = request(vec![ChatMessage::user("Hello")]);
        assert_eq!(ChatHandler::validate(&req).unwrap().content, "Hello");
    }

    #[test]
    fn test_validate_rejects_empty_messages() {
        let err = ChatHandler::validate(&request(vec![])).unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_validate_rejects_assistant_last() {
        let req = request(vec![
            ChatMessage::user("Hello"),
            ChatMessage::assistant("Hi"),
        ]);
        assert!(matches!(
            ChatHandler::validate(&req),
            Err(ChatFrontError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_rejects_blank_content() {
        let req = request(vec![ChatMessage::user("   ")]);
        assert!(ChatHandler::validate(&req).is_err());
    }

    #[test]
    fn test_validate_accepts_annotation_only_message() {
        let req = request(vec![ChatMessage::user("").with_annotations(vec![json!({
            "type": "human_response",
            "data": {"confirmed": true}
        })])]);
        assert!(ChatHandler::validate(&req).is_ok());
    }
}
