//! Per-request orchestration: fresh run or resume, then stream encoding.

use crate::annotation::{Annotation, InlineAnnotationCodec};
use crate::error::Result;
use crate::events::encoder::{StreamCallbacks, StreamEncoder};
use crate::events::frame::Frame;
use crate::events::normalizer::EventNormalizer;
use crate::hydrate::FileHydrator;
use crate::snapshot::controller::HitlController;
use crate::types::event::{HumanResponse, WorkflowEvent};
use crate::types::message::{ChatMessage, Role};
use crate::types::source::SourceNodeFactory;
use crate::workflow::{ExecutionContext, Workflow, WorkflowHandle, WorkflowInput};
use async_trait::async_trait;
use futures::Stream;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// How a request drives the workflow, decided once per request.
#[derive(Debug, Clone, PartialEq)]
pub enum RunMode {
    FreshRun,
    Resume { key: String, response: HumanResponse },
}

/// Produces follow-up questions once a turn completed.
#[async_trait]
pub trait SuggestionGenerator: Send + Sync {
    async fn suggest(
        &self,
        history: &[ChatMessage],
        final_text: &str,
    ) -> anyhow::Result<Vec<String>>;
}

pub struct WorkflowRunner {
    workflow: Arc<dyn Workflow>,
    controller: HitlController,
    codec: InlineAnnotationCodec,
    source_factory: SourceNodeFactory,
    hydrator: Option<FileHydrator>,
    suggestions: Option<Arc<dyn SuggestionGenerator>>,
    shutdown: CancellationToken,
}

impl WorkflowRunner {
    pub fn new(
        workflow: Arc<dyn Workflow>,
        controller: HitlController,
        source_factory: SourceNodeFactory,
    ) -> Self {
        Self {
            workflow,
            controller,
            codec: InlineAnnotationCodec::default(),
            source_factory,
            hydrator: None,
            suggestions: None,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_codec(mut self, codec: InlineAnnotationCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_hydrator(mut self, hydrator: Option<FileHydrator>) -> Self {
        self.hydrator = hydrator;
        self
    }

    pub fn with_suggestions(mut self, suggestions: Arc<dyn SuggestionGenerator>) -> Self {
        self.suggestions = Some(suggestions);
        self
    }

    /// Every encoder started by this runner is cancelled with `shutdown`
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn codec(&self) -> &InlineAnnotationCodec {
        &self.codec
    }

    /// Resume when the latest user message carries a human response and a
    /// snapshot exists for `key`; otherwise start fresh.
    pub async fn decide(&self, messages: &[ChatMessage], key: &str) -> Result<RunMode> {
        let Some(response) = messages
            .last()
            .filter(|m| m.role == Role::User)
            .and_then(|m| self.codec.human_response(m))
        else {
            return Ok(RunMode::FreshRun);
        };
        if self.controller.has_snapshot(key).await? {
            Ok(RunMode::Resume {
                key: key.to_string(),
                response,
            })
        } else {
            tracing::warn!(key = %key, "Human response without a stored snapshot, starting a fresh run");
            Ok(RunMode::FreshRun)
        }
    }

    /// Start or resume the workflow for one request and return its frames.
    ///
    /// `messages` must end with the user message that triggered this request.
    pub async fn run(
        &self,
        mut messages: Vec<ChatMessage>,
        key: String,
    ) -> Result<impl Stream<Item = Frame> + Send + 'static> {
        let mode = self.decide(&messages, &key).await?;
        // suggestions see the whole conversation in both modes
        let history = messages.clone();
        tracing::info!(key = %key, workflow = %self.workflow.name(), resume = matches!(mode, RunMode::Resume { .. }), "Running workflow");

        let WorkflowHandle { events, context } = match mode {
            RunMode::FreshRun => {
                let user_input = messages
                    .pop()
                    .map(|m| m.content)
                    .unwrap_or_default();
                let input = WorkflowInput {
                    user_input,
                    chat_history: messages,
                    request_id: key.clone(),
                };
                self.workflow.start(input).await?
            }
            RunMode::Resume { key, response } => {
                self.controller
                    .resume(self.workflow.as_ref(), &key, response)
                    .await?
            }
        };

        let callbacks = Arc::new(RunnerCallbacks {
            controller: self.controller.clone(),
            context,
            key,
            history,
            suggestions: self.suggestions.clone(),
        });
        let encoder = StreamEncoder::new(EventNormalizer::new(self.source_factory.clone()))
            .with_hydrator(self.hydrator.clone())
            .with_cancellation(self.shutdown.child_token());
        Ok(encoder.encode(events, callbacks))
    }
}

/// Wires encoder hooks to the HITL controller and the suggestion step.
struct RunnerCallbacks {
    controller: HitlController,
    context: Arc<dyn ExecutionContext>,
    key: String,
    history: Vec<ChatMessage>,
    suggestions: Option<Arc<dyn SuggestionGenerator>>,
}

#[async_trait]
impl StreamCallbacks for RunnerCallbacks {
    async fn on_pause_for_human_input(&self, event: &WorkflowEvent) -> Result<()> {
        tracing::info!(key = %self.key, event = event.kind_name(), "Workflow paused for human input");
        self.controller.pause(self.context.as_ref(), &self.key).await
    }

    async fn on_final(&self, full_text: &str) -> Vec<Annotation> {
        tracing::debug!(key = %self.key, length = full_text.len(), "Workflow turn completed");
        let Some(suggestions) = &self.suggestions else {
            return Vec::new();
        };
        match suggestions.suggest(&self.history, full_text).await {
            Ok(questions) if !questions.is_empty() => {
                vec![Annotation::suggested_questions(&questions)]
            }
            Ok(_) => Vec::new(),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Failed to generate suggested questions");
                Vec::new()
            }
        }
    }
}
