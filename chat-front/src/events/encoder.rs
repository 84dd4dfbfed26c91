//! Stream encoder: workflow events in, ordered frames out.

use crate::annotation::Annotation;
use crate::error::{ChatFrontError, Result};
use crate::events::frame::Frame;
use crate::events::normalizer::EventNormalizer;
use crate::hydrate::FileHydrator;
use crate::types::event::WorkflowEvent;
use async_stream::stream;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Ordered event source handed over by the workflow engine
pub type EventStream = BoxStream<'static, anyhow::Result<WorkflowEvent>>;

/// Lifecycle hooks invoked by [`StreamEncoder`].
#[async_trait]
pub trait StreamCallbacks: Send + Sync {
    /// Before the first event is pulled
    async fn on_start(&self) {}

    /// For every emitted text frame
    async fn on_text(&self, _delta: &str) {}

    /// Awaited before the request annotation is emitted and before the next
    /// pull. An error ends the stream with a terminal error frame.
    async fn on_pause_for_human_input(&self, _event: &WorkflowEvent) -> Result<()> {
        Ok(())
    }

    /// Once, after natural completion. Returned annotations are emitted
    /// after the last event frame.
    async fn on_final(&self, _full_text: &str) -> Vec<Annotation> {
        Vec::new()
    }
}

/// Callbacks that do nothing
pub struct NoopCallbacks;

impl StreamCallbacks for NoopCallbacks {}

/// Converts one workflow event stream into frames.
///
/// Frames are emitted in the exact order their events were pulled.
/// The encoder stops at `Stop`, at source exhaustion, on cancellation, or
/// when the output stream is dropped. Only an upstream failure or a failed
/// pause hook produce an [`Frame::Error`], always as the last frame.
pub struct StreamEncoder {
    normalizer: EventNormalizer,
    hydrator: Option<FileHydrator>,
    cancellation: CancellationToken,
}

impl StreamEncoder {
    pub fn new(normalizer: EventNormalizer) -> Self {
        Self {
            normalizer,
            hydrator: None,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_hydrator(mut self, hydrator: Option<FileHydrator>) -> Self {
        self.hydrator = hydrator;
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn encode(
        self,
        mut events: EventStream,
        callbacks: Arc<dyn StreamCallbacks>,
    ) -> impl Stream<Item = Frame> + Send + 'static {
        let Self {
            mut normalizer,
            hydrator,
            cancellation,
        } = self;

        stream! {
            callbacks.on_start().await;
            let mut full_text = String::new();

            loop {
                let next = tokio::select! {
                    biased;
                    _ = cancellation.cancelled() => None,
                    item = events.next() => Some(item),
                };
                let item = match next {
                    None => {
                        tracing::debug!("Stream encoder cancelled");
                        return;
                    }
                    Some(None) => break,
                    Some(Some(item)) => item,
                };
                let event = match item {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::error!("Workflow event stream failed: {:?}", e);
                        yield Frame::from_error(&ChatFrontError::Stream(format!("{:#}", e)));
                        return;
                    }
                };

                match event {
                    WorkflowEvent::TextDelta { delta } => {
                        if delta.is_empty() {
                            continue;
                        }
                        callbacks.on_text(&delta).await;
                        full_text.push_str(&delta);
                        yield Frame::Text(delta);
                    }
                    WorkflowEvent::Stop => break,
                    event => {
                        if matches!(event, WorkflowEvent::HumanInputRequest { .. }) {
                            if let Err(e) = callbacks.on_pause_for_human_input(&event).await {
                                tracing::error!(code = e.error_code(), "Pause for human input failed: {}", e);
                                yield Frame::from_error(&e);
                                return;
                            }
                        }
                        for normalized in normalizer.normalize(event) {
                            if let (WorkflowEvent::Source { nodes }, Some(hydrator)) = (&normalized, &hydrator) {
                                // downloads run detached from this stream
                                let _ = hydrator.schedule(nodes);
                            }
                            if let Some(annotation) = normalizer.project(normalized) {
                                yield Frame::Annotation(annotation);
                            }
                        }
                    }
                }
            }

            for annotation in callbacks.on_final(&full_text).await {
                yield Frame::Annotation(annotation);
            }
        }
    }
}
