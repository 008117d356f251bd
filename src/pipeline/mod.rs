//! Streaming answer pipeline: select context, stream generation, extract citations.
//!
//! A request runs sequentially: chunk the document, score the chunks against the question,
//! open a backend stream, relay every fragment as a [`StreamEvent::Chunk`], and finish with one
//! [`StreamEvent::Complete`] carrying the accumulated answer and its citations. Any backend
//! failure ends the stream with a single [`StreamEvent::Error`] instead.
//!
//! Dropping the returned stream drops the backend stream with it, so a disconnected consumer
//! stops generation without queuing further fragments.

mod events;

use async_stream::stream;
use futures_core::Stream;
use futures_util::StreamExt;
use std::pin::Pin;
use std::sync::Arc;

pub use events::{AnswerRequest, StreamEvent};

use crate::citations::extract_citations;
use crate::context::{ContextSettings, build_context};
use crate::generation::{GenerationBackend, GenerationError, GenerationRequest};
use crate::metrics::{AnswerMetrics, MetricsSnapshot};

/// Live sequence of pipeline events.
pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// Answers questions about a document by streaming from a [`GenerationBackend`].
///
/// Holds no per-request state; every call to [`AnswerPipeline::generate`] owns its own chunks
/// and accumulator, so one pipeline can be shared across concurrent requests.
pub struct AnswerPipeline {
    backend: Arc<dyn GenerationBackend>,
    settings: ContextSettings,
    metrics: Arc<AnswerMetrics>,
}

impl AnswerPipeline {
    /// Create a pipeline over `backend` with the given context settings.
    pub fn new(backend: Arc<dyn GenerationBackend>, settings: ContextSettings) -> Self {
        Self {
            backend,
            settings,
            metrics: Arc::new(AnswerMetrics::new()),
        }
    }

    /// Count a completed answer as failed after the caller could not persist it.
    pub fn record_persistence_failure(&self) {
        self.metrics.record_persistence_failure();
    }

    /// Snapshot of the pipeline counters.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Start answering `request`.
    ///
    /// The returned stream yields chunks as the backend produces them and always ends with
    /// exactly one terminal event.
    pub fn generate(&self, request: AnswerRequest) -> EventStream {
        let backend = Arc::clone(&self.backend);
        let metrics = Arc::clone(&self.metrics);
        let settings = self.settings;
        metrics.record_question();

        Box::pin(stream! {
            let AnswerRequest { question, document_text, history } = request;

            let context = match build_context(&document_text, &question, settings) {
                Ok(context) => context,
                Err(error) => {
                    tracing::error!(error = %error, "Context selection failed");
                    metrics.record_failure();
                    yield StreamEvent::error(format!("Failed to prepare document context: {error}"));
                    return;
                }
            };
            tracing::info!(
                context_chars = context.len(),
                history_turns = history.len(),
                "Starting answer generation"
            );

            let generation = GenerationRequest::new(context, history, question);
            let mut fragments = match backend.generate_stream(generation).await {
                Ok(fragments) => fragments,
                Err(error) => {
                    tracing::error!(error = %error, "Generation backend refused request");
                    metrics.record_failure();
                    yield StreamEvent::error(failure_message(&error));
                    return;
                }
            };

            let mut answer = String::new();
            while let Some(fragment) = fragments.next().await {
                match fragment {
                    Ok(text) => {
                        answer.push_str(&text);
                        metrics.record_fragment();
                        yield StreamEvent::Chunk { content: text };
                    }
                    Err(error) => {
                        tracing::error!(
                            error = %error,
                            received_chars = answer.len(),
                            "Generation stream failed"
                        );
                        metrics.record_failure();
                        yield StreamEvent::error(failure_message(&error));
                        return;
                    }
                }
            }
            drop(fragments);

            if answer.trim().is_empty() {
                tracing::warn!("Generation backend produced no text");
                metrics.record_failure();
                yield StreamEvent::error(failure_message(&GenerationError::EmptyResponse));
                return;
            }

            let citations = extract_citations(&answer);
            tracing::info!(
                answer_chars = answer.len(),
                citations = citations.len(),
                "Answer generation completed"
            );
            metrics.record_completion();
            yield StreamEvent::Complete { answer, citations };
        })
    }
}

fn failure_message(error: &GenerationError) -> String {
    format!("Failed to generate streaming response: {error}")
}
