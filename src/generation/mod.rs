//! Generation backends: the capability that turns a prompt into (streamed) text.
//!
//! The pipeline only depends on [`GenerationBackend`]; [`GeminiClient`] talks to the hosted
//! Gemini API and [`ScriptedBackend`] replays fixed fragments for tests and demos.

pub mod gemini;
pub mod prompt;
pub mod scripted;
pub mod types;

use async_trait::async_trait;
use futures_core::Stream;
use futures_util::StreamExt;
use std::pin::Pin;

pub use gemini::GeminiClient;
pub use prompt::{GenerationRequest, SYSTEM_PREAMBLE};
pub use scripted::ScriptedBackend;
pub use types::{ConversationTurn, GenerationError, MessageRole};

/// Incremental text fragments produced by a backend.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, GenerationError>> + Send>>;

/// Interface implemented by text generation backends.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Start a streaming generation; fragments arrive as the backend produces them.
    async fn generate_stream(
        &self,
        request: GenerationRequest,
    ) -> Result<FragmentStream, GenerationError>;

    /// Generate a complete answer by draining [`GenerationBackend::generate_stream`].
    async fn complete(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        let mut fragments = self.generate_stream(request).await?;
        let mut answer = String::new();
        while let Some(fragment) = fragments.next().await {
            answer.push_str(&fragment?);
        }
        if answer.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(answer)
    }
}
