//! Process-local [`ChatStore`] backed by hash maps.

use async_trait::async_trait;
use std::collections::HashMap;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::ChatStore;
use super::types::{ChatMessage, ChatSession, Document, NewDocument, NewMessage, StoreError};

#[derive(Default)]
struct State {
    documents: HashMap<String, Document>,
    sessions: HashMap<String, ChatSession>,
    messages: HashMap<String, Vec<ChatMessage>>,
}

/// In-memory store; contents are lost when the process exits.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[async_trait]
impl ChatStore for InMemoryStore {
    async fn create_document(&self, document: NewDocument) -> Result<Document, StoreError> {
        let record = Document {
            id: new_id(),
            original_name: document.original_name,
            page_count: document.page_count,
            text_content: document.text_content,
            uploaded_at: current_timestamp_rfc3339(),
        };
        self.state
            .write()
            .await
            .documents
            .insert(record.id.clone(), record.clone());
        tracing::debug!(document_id = %record.id, pages = record.page_count, "Document stored");
        Ok(record)
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.state.read().await.documents.get(id).cloned())
    }

    async fn create_session(&self, document_id: &str) -> Result<ChatSession, StoreError> {
        let mut state = self.state.write().await;
        if !state.documents.contains_key(document_id) {
            return Err(StoreError::NotFound {
                kind: "document",
                id: document_id.to_string(),
            });
        }
        let now = current_timestamp_rfc3339();
        let session = ChatSession {
            id: new_id(),
            document_id: document_id.to_string(),
            created_at: now.clone(),
            updated_at: now,
        };
        state.sessions.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    async fn get_session(&self, id: &str) -> Result<Option<ChatSession>, StoreError> {
        Ok(self.state.read().await.sessions.get(id).cloned())
    }

    async fn touch_session(&self, id: &str) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let session = state.sessions.get_mut(id).ok_or_else(|| StoreError::NotFound {
            kind: "session",
            id: id.to_string(),
        })?;
        session.updated_at = current_timestamp_rfc3339();
        Ok(())
    }

    async fn save_message(&self, message: NewMessage) -> Result<ChatMessage, StoreError> {
        let mut state = self.state.write().await;
        if !state.sessions.contains_key(&message.session_id) {
            return Err(StoreError::NotFound {
                kind: "session",
                id: message.session_id,
            });
        }
        let record = ChatMessage {
            id: new_id(),
            session_id: message.session_id,
            role: message.role,
            content: message.content,
            citations: message.citations,
            created_at: current_timestamp_rfc3339(),
        };
        state
            .messages
            .entry(record.session_id.clone())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn list_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .messages
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn clear_messages(&self, session_id: &str) -> Result<(), StoreError> {
        self.state.write().await.messages.remove(session_id);
        Ok(())
    }
}
