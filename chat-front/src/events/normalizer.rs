//! Event normalization.
//!
//! Different workflow backends describe the same concepts with different
//! event shapes. [`EventNormalizer`] first reclassifies events into one
//! vocabulary ([`EventNormalizer::normalize`]) and then projects each
//! non-text event onto the closed annotation surface
//! ([`EventNormalizer::annotate`]).
//!
//! The normalizer is stateful for the lifetime of one response: it remembers
//! the progress slot of every batched tool call so results can be attributed
//! by call id, regardless of completion order.

use crate::annotation::schema::ToolResultPayload;
use crate::annotation::{Annotation, ANNOTATION_TOOL_RESULT};
use crate::types::event::{AgentRunKind, Progress, ToolCall, WorkflowEvent};
use crate::types::source::{SourceNode, SourceNodeFactory};
use serde_json::{json, Value};
use std::collections::HashMap;

/// Agent name used when a tool call does not report one
pub const DEFAULT_AGENT_NAME: &str = "Agent";

const SOURCE_NODES_KEYS: [&str; 2] = ["sourceNodes", "source_nodes"];

pub struct EventNormalizer {
    source_factory: SourceNodeFactory,
    batch_progress: HashMap<String, Progress>,
}

impl EventNormalizer {
    pub fn new(source_factory: SourceNodeFactory) -> Self {
        Self {
            source_factory,
            batch_progress: HashMap::new(),
        }
    }

    /// Reclassify one engine event into zero or more events of the shared vocabulary.
    pub fn normalize(&mut self, event: WorkflowEvent) -> Vec<WorkflowEvent> {
        match event {
            WorkflowEvent::ToolCall(call) => vec![Self::tool_call_to_agent_run(&call, None)],
            WorkflowEvent::ToolCallBatch { calls } => self.expand_batch(calls),
            WorkflowEvent::ToolCallResult {
                call_id,
                output,
                is_error,
            } => match self.source_nodes_in(&output) {
                Some(nodes) => {
                    tracing::debug!(call_id = %call_id, nodes = nodes.len(), "Promoting tool result to sources");
                    self.batch_progress.remove(&call_id);
                    vec![WorkflowEvent::Source { nodes }]
                }
                None => vec![WorkflowEvent::ToolCallResult {
                    call_id,
                    output,
                    is_error,
                }],
            },
            other => vec![other],
        }
    }

    /// Normalize an event and project it onto annotations.
    ///
    /// Text deltas and `Stop` have no annotation form and yield nothing.
    pub fn annotate(&mut self, event: WorkflowEvent) -> Vec<Annotation> {
        self.normalize(event)
            .into_iter()
            .filter_map(|e| self.project(e))
            .collect()
    }

    /// Annotation form of an already normalized event
    pub fn project(&mut self, event: WorkflowEvent) -> Option<Annotation> {
        match event {
            WorkflowEvent::TextDelta { .. } | WorkflowEvent::Stop => None,
            WorkflowEvent::ToolCall(call) => {
                self.project(Self::tool_call_to_agent_run(&call, None))
            }
            WorkflowEvent::ToolCallBatch { calls } => {
                tracing::warn!(calls = calls.len(), "Unexpanded tool call batch dropped");
                None
            }
            WorkflowEvent::ToolCallResult {
                call_id,
                output,
                is_error,
            } => {
                let progress = self.batch_progress.remove(&call_id);
                let payload = ToolResultPayload {
                    call_id,
                    output,
                    is_error,
                    progress,
                };
                Some(Annotation::new(ANNOTATION_TOOL_RESULT, json!(payload)))
            }
            WorkflowEvent::Source { nodes } => Some(Annotation::sources(&nodes)),
            WorkflowEvent::AgentRun {
                agent,
                text,
                kind,
                progress,
            } => Some(Annotation::agent(agent, text, kind, progress)),
            WorkflowEvent::Artifact { artifact } => Some(Annotation::artifact(&artifact)),
            WorkflowEvent::HumanInputRequest { event_type, data }
            | WorkflowEvent::Custom { event_type, data } => {
                Some(Annotation::new(event_type, data))
            }
        }
    }

    /// A batch of N >= 2 calls shares one progress id; the k-th call in
    /// submission order is `current = k`.
    fn expand_batch(&mut self, calls: Vec<ToolCall>) -> Vec<WorkflowEvent> {
        if calls.len() < 2 {
            return calls
                .iter()
                .map(|call| Self::tool_call_to_agent_run(call, None))
                .collect();
        }
        let progress_id = uuid::Uuid::new_v4().to_string();
        let total = calls.len();
        tracing::debug!(progress_id = %progress_id, total, "Expanding tool call batch");
        calls
            .iter()
            .enumerate()
            .map(|(index, call)| {
                let progress = Progress {
                    id: progress_id.clone(),
                    current: index + 1,
                    total,
                };
                self.batch_progress
                    .insert(call.call_id.clone(), progress.clone());
                Self::tool_call_to_agent_run(call, Some(progress))
            })
            .collect()
    }

    fn tool_call_to_agent_run(call: &ToolCall, progress: Option<Progress>) -> WorkflowEvent {
        WorkflowEvent::AgentRun {
            agent: call
                .agent
                .clone()
                .unwrap_or_else(|| DEFAULT_AGENT_NAME.to_string()),
            text: format!("Using tool '{}' with inputs: {}", call.name, call.args),
            kind: if progress.is_some() {
                AgentRunKind::Progress
            } else {
                AgentRunKind::Text
            },
            progress,
        }
    }

    /// Source nodes carried by a retrieval tool's output, which may be an
    /// object or a JSON-encoded string.
    fn source_nodes_in(&self, output: &Value) -> Option<Vec<SourceNode>> {
        let parsed;
        let object = match output {
            Value::Object(map) => map,
            Value::String(s) => {
                parsed = serde_json::from_str::<Value>(s).ok()?;
                parsed.as_object()?
            }
            _ => return None,
        };
        let raw = SOURCE_NODES_KEYS
            .iter()
            .find_map(|key| object.get(*key).and_then(Value::as_array))?;
        Some(self.source_factory.from_raw_nodes(raw))
    }
}

impl Default for EventNormalizer {
    fn default() -> Self {
        Self::new(SourceNodeFactory::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{ANNOTATION_AGENT, ANNOTATION_SOURCES};
    use crate::types::artifact::{Artifact, ArtifactKind};

    #[test]
    fn test_tool_call_becomes_agent_run() {
        let mut normalizer = EventNormalizer::default();
        let events = normalizer.normalize(WorkflowEvent::tool_call(
            "search",
            json!({"query": "rust"}),
            "call_1",
        ));
        assert_eq!(
            events,
            vec![WorkflowEvent::AgentRun {
                agent: DEFAULT_AGENT_NAME.to_string(),
                text: "Using tool 'search' with inputs: {\"query\":\"rust\"}".to_string(),
                kind: AgentRunKind::Text,
                progress: None,
            }]
        );
    }

    #[test]
    fn test_tool_call_keeps_reported_agent() {
        let mut normalizer = EventNormalizer::default();
        let call = ToolCall::new("fetch", json!({}), "c").with_agent("researcher");
        let annotations = normalizer.annotate(WorkflowEvent::ToolCall(call));
        assert_eq!(annotations.len(), 1);
        assert!(annotations[0].is(ANNOTATION_AGENT));
        assert_eq!(annotations[0].data["agent"], "researcher");
        assert_eq!(annotations[0].data["type"], "text");
    }

    #[test]
    fn test_batch_shares_progress_id_in_submission_order() {
        let mut normalizer = EventNormalizer::default();
        let calls = vec![
            ToolCall::new("a", json!({}), "call_a"),
            ToolCall::new("b", json!({}), "call_b"),
            ToolCall::new("c", json!({}), "call_c"),
        ];
        let annotations = normalizer.annotate(WorkflowEvent::ToolCallBatch { calls });
        assert_eq!(annotations.len(), 3);

        let progress_id = annotations[0].data["data"]["id"].clone();
        assert!(progress_id.is_string());
        for (k, annotation) in annotations.iter().enumerate() {
            assert_eq!(annotation.data["type"], "progress");
            assert_eq!(annotation.data["data"]["id"], progress_id);
            assert_eq!(annotation.data["data"]["current"], k + 1);
            assert_eq!(annotation.data["data"]["total"], 3);
        }
    }

    #[test]
    fn test_single_call_batch_has_no_progress() {
        let mut normalizer = EventNormalizer::default();
        let events = normalizer.normalize(WorkflowEvent::ToolCallBatch {
            calls: vec![ToolCall::new("only", json!({"x": 1}), "call_1")],
        });
        assert_eq!(events.len(), 1);
        match &events[0] {
            WorkflowEvent::AgentRun { kind, progress, .. } => {
                assert_eq!(*kind, AgentRunKind::Text);
                assert!(progress.is_none());
            }
            other => panic!("Expected AgentRun, got {:?}", other),
        }
    }

    #[test]
    fn test_batch_results_attributed_by_call_id() {
        let mut normalizer = EventNormalizer::default();
        normalizer.annotate(WorkflowEvent::ToolCallBatch {
            calls: vec![
                ToolCall::new("a", json!({}), "call_a"),
                ToolCall::new("b", json!({}), "call_b"),
            ],
        });

        // results arrive out of order
        let second = normalizer.annotate(WorkflowEvent::tool_call_result("call_b", json!("B")));
        let first = normalizer.annotate(WorkflowEvent::tool_call_result("call_a", json!("A")));

        assert!(second[0].is(ANNOTATION_TOOL_RESULT));
        assert_eq!(second[0].data["output"], "B");
        assert_eq!(second[0].data["progress"]["current"], 2);
        assert_eq!(first[0].data["output"], "A");
        assert_eq!(first[0].data["progress"]["current"], 1);
    }

    #[test]
    fn test_unbatched_result_has_no_progress() {
        let mut normalizer = EventNormalizer::default();
        let annotations =
            normalizer.annotate(WorkflowEvent::tool_call_result("solo", json!({"ok": true})));
        assert_eq!(annotations[0].data["callId"], "solo");
        assert!(annotations[0].data.get("progress").is_none());
    }

    #[test]
    fn test_retrieval_result_promoted_to_sources() {
        let mut normalizer = EventNormalizer::default();
        let output = json!({
            "content": "ignored envelope",
            "sourceNodes": [
                {"node": {"id_": "n1", "metadata": {"file_name": "a.pdf"}, "text": "alpha"}, "score": 0.9},
                {"node": {"id_": "n2", "metadata": {}, "text": "beta"}, "score": 0.4}
            ]
        });
        let events = normalizer.normalize(WorkflowEvent::tool_call_result("call_r", output));
        match &events[..] {
            [WorkflowEvent::Source { nodes }] => {
                assert_eq!(nodes.len(), 2);
                assert_eq!(nodes[0].file_path.as_deref(), Some("data/a.pdf"));
                assert_eq!(nodes[1].score, Some(0.4));
            }
            other => panic!("Expected a single Source event, got {:?}", other),
        }
    }

    #[test]
    fn test_retrieval_result_as_json_string() {
        let mut normalizer = EventNormalizer::default();
        let output = json!(r#"{"source_nodes": [{"id": "n1", "text": "t"}]}"#);
        let annotations = normalizer.annotate(WorkflowEvent::tool_call_result("c", output));
        assert!(annotations[0].is(ANNOTATION_SOURCES));
        assert_eq!(annotations[0].data["nodes"][0]["id"], "n1");
    }

    #[test]
    fn test_passthrough_events() {
        let mut normalizer = EventNormalizer::default();
        let artifact = Artifact::new(ArtifactKind::Code, serde_json::Map::new());
        let event = WorkflowEvent::Artifact {
            artifact: artifact.clone(),
        };
        assert_eq!(normalizer.normalize(event.clone()), vec![event]);

        let custom = WorkflowEvent::Custom {
            event_type: "deep_research_event".to_string(),
            data: json!({"state": "pending"}),
        };
        let annotations = normalizer.annotate(custom);
        assert_eq!(
            annotations,
            vec![Annotation::new(
                "deep_research_event",
                json!({"state": "pending"})
            )]
        );

        let request = WorkflowEvent::human_input("cli_human_input", json!({"command": "ls"}));
        let annotations = normalizer.annotate(request);
        assert_eq!(annotations[0].kind, "cli_human_input");
    }

    #[test]
    fn test_text_and_stop_have_no_annotation() {
        let mut normalizer = EventNormalizer::default();
        assert!(normalizer.annotate(WorkflowEvent::text("hi")).is_empty());
        assert!(normalizer.annotate(WorkflowEvent::Stop).is_empty());
    }
}
