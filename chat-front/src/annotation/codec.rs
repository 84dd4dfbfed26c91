//! Inline annotation codec.
//!
//! Structured annotations are smuggled through plain chat text as fenced
//! blocks:
//!
//! ````text
//! ```annotation
//! {"type":"artifact","data":{...}}
//! ```
//! ````
//!
//! Decoding is lenient. Blocks that fail to parse or validate are logged and
//! skipped, because transcripts may have been mangled by upstream transports.

use super::schema::SchemaRegistry;
use super::{Annotation, ANNOTATION_ARTIFACT, ANNOTATION_HUMAN_RESPONSE};
use crate::error::Result;
use crate::types::artifact::{latest_of_kind, Artifact, ArtifactKind};
use crate::types::event::HumanResponse;
use crate::types::message::ChatMessage;
use regex::Regex;
use std::sync::{Arc, LazyLock};

const FENCE_LANGUAGE: &str = "annotation";

static ANNOTATION_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```annotation[ \t]*\r?\n(.*?)\r?\n?```")
        .expect("annotation block pattern is a valid regex")
});

#[derive(Debug, Clone)]
pub struct InlineAnnotationCodec {
    registry: Arc<SchemaRegistry>,
}

impl Default for InlineAnnotationCodec {
    fn default() -> Self {
        Self::new(SchemaRegistry::shared_default())
    }
}

impl InlineAnnotationCodec {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self { registry }
    }

    /// Wrap an annotation in a fenced block.
    ///
    /// Backticks inside JSON strings are written as `\u0060` so the payload
    /// can never close the fence early.
    pub fn encode(&self, annotation: &Annotation) -> Result<String> {
        let json = serde_json::to_string(annotation)?.replace('`', "\\u0060");
        Ok(format!("\n```{}\n{}\n```\n", FENCE_LANGUAGE, json))
    }

    /// All valid annotation blocks in `text`, in document order
    pub fn decode(&self, text: &str) -> Vec<Annotation> {
        ANNOTATION_BLOCK
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .filter_map(|body| self.parse_block(body.as_str()))
            .collect()
    }

    fn parse_block(&self, body: &str) -> Option<Annotation> {
        let annotation: Annotation = serde_json::from_str(body.trim())
            .inspect_err(|e| tracing::warn!(error = %e, "Skipping malformed inline annotation"))
            .ok()?;
        self.checked(annotation)
    }

    fn checked(&self, annotation: Annotation) -> Option<Annotation> {
        match self.registry.validate(&annotation) {
            Ok(()) => Some(annotation),
            Err(reason) => {
                tracing::warn!(
                    annotation_type = %annotation.kind,
                    reason = %reason,
                    "Skipping annotation that failed schema validation"
                );
                None
            }
        }
    }

    /// Structured annotations of a message followed by its inline blocks.
    pub fn decode_message(&self, message: &ChatMessage) -> Vec<Annotation> {
        let structured = message
            .annotations
            .iter()
            .flatten()
            .filter_map(|value| {
                serde_json::from_value::<Annotation>(value.clone())
                    .inspect_err(|e| {
                        tracing::warn!(error = %e, "Skipping malformed structured annotation")
                    })
                    .ok()
            })
            .filter_map(|annotation| self.checked(annotation));
        structured.chain(self.decode(&message.content)).collect()
    }

    /// The last human response carried by `message`, if any
    pub fn human_response(&self, message: &ChatMessage) -> Option<HumanResponse> {
        self.decode_message(message)
            .into_iter()
            .rfind(|a| a.is(ANNOTATION_HUMAN_RESPONSE))
            .map(|a| HumanResponse::new(a.data))
    }

    /// Every artifact persisted in the transcript, in transcript order
    pub fn artifacts(&self, messages: &[ChatMessage]) -> Vec<Artifact> {
        messages
            .iter()
            .flat_map(|m| self.decode_message(m))
            .filter(|a| a.is(ANNOTATION_ARTIFACT))
            .filter_map(|a| a.data_as::<Artifact>())
            .collect()
    }

    /// The most recent artifact of `kind` across the whole conversation
    pub fn last_artifact(&self, messages: &[ChatMessage], kind: ArtifactKind) -> Option<Artifact> {
        latest_of_kind(self.artifacts(messages), kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn artifact_annotation(kind: &str, created_at: i64, name: &str) -> Annotation {
        Annotation::new(
            ANNOTATION_ARTIFACT,
            json!({"created_at": created_at, "type": kind, "data": {"file_name": name}}),
        )
    }

    #[test]
    fn test_encode_format() {
        let codec = InlineAnnotationCodec::default();
        let encoded = codec
            .encode(&Annotation::new(ANNOTATION_HUMAN_RESPONSE, json!({"ok": true})))
            .unwrap();
        assert_eq!(
            encoded,
            "\n```annotation\n{\"type\":\"human_response\",\"data\":{\"ok\":true}}\n```\n"
        );
    }

    #[test]
    fn test_decode_encoded_returns_single_annotation() {
        let codec = InlineAnnotationCodec::default();
        let annotation = artifact_annotation("code", 42, "main.rs");
        let decoded = codec.decode(&codec.encode(&annotation).unwrap());
        assert_eq!(decoded, vec![annotation]);
    }

    #[test]
    fn test_decode_survives_backticks_in_payload() {
        let codec = InlineAnnotationCodec::default();
        let annotation = Annotation::new(
            ANNOTATION_HUMAN_RESPONSE,
            json!({"comment": "run ```ls``` please"}),
        );
        let decoded = codec.decode(&codec.encode(&annotation).unwrap());
        assert_eq!(decoded, vec![annotation]);
    }

    #[test]
    fn test_decode_multiple_blocks_in_document_order() {
        let codec = InlineAnnotationCodec::default();
        let first = artifact_annotation("code", 1, "a.rs");
        let second = Annotation::new(ANNOTATION_HUMAN_RESPONSE, json!("yes"));
        let text = format!(
            "Here is the file.{}Some prose in between.\n{}Trailing words",
            codec.encode(&first).unwrap(),
            codec.encode(&second).unwrap()
        );
        assert_eq!(codec.decode(&text), vec![first, second]);
    }

    #[test]
    fn test_decode_skips_malformed_and_invalid_blocks() {
        let codec = InlineAnnotationCodec::default();
        let text = concat!(
            "```annotation\n{not json}\n```\n",
            "```annotation\n{\"type\":\"artifact\",\"data\":{\"type\":\"code\"}}\n```\n",
            "```annotation\n{\"type\":\"unknown_kind\",\"data\":{}}\n```\n",
            "```json\n{\"type\":\"human_response\",\"data\":1}\n```\n",
            "```annotation\r\n{\"type\":\"human_response\",\"data\":{\"a\":1}}\r\n```"
        );
        let decoded = codec.decode(text);
        assert_eq!(
            decoded,
            vec![Annotation::new(ANNOTATION_HUMAN_RESPONSE, json!({"a": 1}))]
        );
    }

    #[test]
    fn test_decode_plain_text_is_empty() {
        let codec = InlineAnnotationCodec::default();
        assert!(codec.decode("just talking about ``` fences").is_empty());
    }

    #[test]
    fn test_decode_message_structured_first() {
        let codec = InlineAnnotationCodec::default();
        let inline = Annotation::new(ANNOTATION_HUMAN_RESPONSE, json!({"from": "inline"}));
        let message = ChatMessage::user(format!("ok{}", codec.encode(&inline).unwrap()))
            .with_annotations(vec![
                json!({"type": "human_response", "data": {"from": "structured"}}),
                json!("not an annotation"),
            ]);
        let decoded = codec.decode_message(&message);
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].data["from"], "structured");
        assert_eq!(decoded[1].data["from"], "inline");

        let response = codec.human_response(&message).unwrap();
        assert_eq!(response.data["from"], "inline");
    }

    #[test]
    fn test_human_response_absent() {
        let codec = InlineAnnotationCodec::default();
        assert!(codec.human_response(&ChatMessage::user("Hello")).is_none());
    }

    #[test]
    fn test_last_artifact_across_messages() {
        let codec = InlineAnnotationCodec::default();
        let messages: Vec<ChatMessage> = [(5, "five"), (1, "one"), (3, "three")]
            .into_iter()
            .map(|(created_at, name)| {
                ChatMessage::assistant(format!(
                    "Generated.{}",
                    codec
                        .encode(&artifact_annotation("code", created_at, name))
                        .unwrap()
                ))
            })
            .chain(std::iter::once(ChatMessage::assistant(
                codec
                    .encode(&artifact_annotation("document", 99, "doc"))
                    .unwrap(),
            )))
            .collect();

        let last = codec.last_artifact(&messages, ArtifactKind::Code).unwrap();
        assert_eq!(last.created_at, 5);
        assert_eq!(last.data["file_name"], "five");

        let last_doc = codec
            .last_artifact(&messages, ArtifactKind::Document)
            .unwrap();
        assert_eq!(last_doc.created_at, 99);
    }

    #[test]
    fn test_last_artifact_none() {
        let codec = InlineAnnotationCodec::default();
        let messages = vec![ChatMessage::user("Hello"), ChatMessage::assistant("Hi")];
        assert!(codec.last_artifact(&messages, ArtifactKind::Code).is_none());
    }
}
