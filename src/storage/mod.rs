//! Persistence of documents, sessions, and chat messages.
//!
//! The answer pipeline never talks to storage directly; the HTTP layer reads a history snapshot
//! before generation and persists the finished answer afterwards.

pub mod memory;
pub mod types;

use async_trait::async_trait;

pub use memory::InMemoryStore;
pub use types::{ChatMessage, ChatSession, Document, NewDocument, NewMessage, StoreError};

use crate::generation::ConversationTurn;

/// Storage operations required by the chat surface.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Register a document.
    async fn create_document(&self, document: NewDocument) -> Result<Document, StoreError>;

    /// Look up a document by id.
    async fn get_document(&self, id: &str) -> Result<Option<Document>, StoreError>;

    /// Open a chat session about an existing document.
    async fn create_session(&self, document_id: &str) -> Result<ChatSession, StoreError>;

    /// Look up a session by id.
    async fn get_session(&self, id: &str) -> Result<Option<ChatSession>, StoreError>;

    /// Bump the session's `updated_at` timestamp.
    async fn touch_session(&self, id: &str) -> Result<(), StoreError>;

    /// Persist a message and return the stored record.
    async fn save_message(&self, message: NewMessage) -> Result<ChatMessage, StoreError>;

    /// Messages of a session in creation order.
    async fn list_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>, StoreError>;

    /// Delete every message of a session.
    async fn clear_messages(&self, session_id: &str) -> Result<(), StoreError>;

    /// Text of a document; empty when nothing was extracted, `None` when the document is unknown.
    async fn get_document_text(&self, document_id: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .get_document(document_id)
            .await?
            .map(|document| document.text_content.unwrap_or_default()))
    }

    /// Conversation history of a session as role-tagged turns.
    async fn get_history(&self, session_id: &str) -> Result<Vec<ConversationTurn>, StoreError> {
        Ok(self
            .list_messages(session_id)
            .await?
            .iter()
            .map(ChatMessage::to_turn)
            .collect())
    }
}
