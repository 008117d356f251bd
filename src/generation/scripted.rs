//! Backend that replays a fixed script of fragments and failures.

use async_stream::stream;
use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};

use super::{FragmentStream, GenerationBackend, GenerationError, GenerationRequest};

/// One step of a scripted generation.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ScriptStep {
    /// Emit a text fragment.
    Fragment(String),
    /// Fail the stream with the given message.
    Fail(String),
}

/// Deterministic [`GenerationBackend`] that yields the same script for every request.
///
/// Every request is recorded so callers can inspect the prompt that would have been sent.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    steps: Vec<ScriptStep>,
    unavailable: Option<String>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedBackend {
    /// Replay `fragments` and then finish normally.
    pub fn new<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_steps(
            fragments
                .into_iter()
                .map(|fragment| ScriptStep::Fragment(fragment.into()))
                .collect(),
        )
    }

    /// Replay `fragments` and then fail with `message`.
    pub fn failing_after<I, S>(fragments: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut steps: Vec<ScriptStep> = fragments
            .into_iter()
            .map(|fragment| ScriptStep::Fragment(fragment.into()))
            .collect();
        steps.push(ScriptStep::Fail(message.into()));
        Self::from_steps(steps)
    }

    /// Refuse to open a stream at all.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            unavailable: Some(message.into()),
            ..Self::default()
        }
    }

    fn from_steps(steps: Vec<ScriptStep>) -> Self {
        Self {
            steps,
            ..Self::default()
        }
    }

    /// Requests received so far, oldest first.
    pub fn recorded_requests(&self) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn generate_stream(
        &self,
        request: GenerationRequest,
    ) -> Result<FragmentStream, GenerationError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        if let Some(message) = &self.unavailable {
            return Err(GenerationError::Backend(message.clone()));
        }

        let steps = self.steps.clone();
        Ok(Box::pin(stream! {
            for step in steps {
                match step {
                    ScriptStep::Fragment(text) => yield Ok(text),
                    ScriptStep::Fail(message) => {
                        yield Err(GenerationError::Backend(message));
                        return;
                    }
                }
            }
        }))
    }
}
