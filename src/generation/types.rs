//! Conversation and error types shared by generation backends.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// The person asking questions.
    User,
    /// The model answering them.
    Assistant,
}

impl MessageRole {
    /// Lowercase wire name of the role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One prior exchange in the conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Who produced the turn.
    pub role: MessageRole,
    /// Text of the turn.
    pub content: String,
}

impl ConversationTurn {
    /// Build a user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Build an assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Errors raised by generation backends.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// HTTP layer failed before or while receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Backend responded with a non-success status.
    #[error("Unexpected generation response ({status}): {message}")]
    UnexpectedStatus {
        /// HTTP status returned by the backend.
        status: StatusCode,
        /// Error message extracted from the response body.
        message: String,
    },
    /// Backend payload could not be decoded.
    #[error("Malformed generation response: {0}")]
    InvalidResponse(String),
    /// Backend reported a failure inside an otherwise successful stream.
    #[error("Generation backend failed: {0}")]
    Backend(String),
    /// Backend finished without producing any text.
    #[error("Generation backend returned an empty response")]
    EmptyResponse,
}
