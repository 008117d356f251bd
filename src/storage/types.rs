//! Records owned by the persistence layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::citations::PageCitation;
use crate::generation::{ConversationTurn, MessageRole};

/// Errors raised by chat stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Referenced record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Record kind (`document`, `session`).
        kind: &'static str,
        /// Identifier that was looked up.
        id: String,
    },
    /// Backing storage could not complete the operation.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Uploaded document and its extracted text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Store-assigned identifier.
    pub id: String,
    /// File name supplied by the uploader.
    pub original_name: String,
    /// Number of pages in the source file.
    pub page_count: u32,
    /// Extracted text, absent when extraction produced nothing.
    pub text_content: Option<String>,
    /// RFC3339 upload time.
    pub uploaded_at: String,
}

/// Fields required to register a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    /// File name supplied by the uploader.
    pub original_name: String,
    /// Number of pages in the source file.
    pub page_count: u32,
    /// Extracted text.
    pub text_content: Option<String>,
}

/// Conversation about one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    /// Store-assigned identifier.
    pub id: String,
    /// Document the session is about.
    pub document_id: String,
    /// RFC3339 creation time.
    pub created_at: String,
    /// RFC3339 time of the last answered question.
    pub updated_at: String,
}

/// Persisted chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Store-assigned identifier.
    pub id: String,
    /// Owning session.
    pub session_id: String,
    /// Author of the message.
    pub role: MessageRole,
    /// Message text.
    pub content: String,
    /// Page citations; `None` when the message cites nothing.
    pub citations: Option<Vec<PageCitation>>,
    /// RFC3339 creation time.
    pub created_at: String,
}

impl ChatMessage {
    /// View the message as a history turn.
    pub fn to_turn(&self) -> ConversationTurn {
        ConversationTurn {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

/// Fields required to store a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    /// Owning session.
    pub session_id: String,
    /// Author of the message.
    pub role: MessageRole,
    /// Message text.
    pub content: String,
    /// Page citations, if any.
    pub citations: Option<Vec<PageCitation>>,
}

impl NewMessage {
    /// A question from the user.
    pub fn user(session_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            role: MessageRole::User,
            content: content.into(),
            citations: None,
        }
    }

    /// An answer; an empty citation list is stored as `None`.
    pub fn assistant(
        session_id: impl Into<String>,
        content: impl Into<String>,
        citations: Vec<PageCitation>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            role: MessageRole::Assistant,
            content: content.into(),
            citations: (!citations.is_empty()).then_some(citations),
        }
    }
}
