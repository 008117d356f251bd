//! HTTP surface for pagechat.
//!
//! This module exposes a compact Axum router:
//!
//! - `POST /api/documents` – Register extracted document text and open a chat session.
//! - `POST /api/chat` – Ask a question; the answer streams back as `data:` frames
//!   (`chunk`* then one `complete` or `error`).
//! - `GET /api/chat/:session_id/messages` – Stored conversation in creation order.
//! - `DELETE /api/chat/:session_id/clear` – Remove a session's messages.
//! - `GET /metrics` – Answer pipeline counters.
//! - `GET /commands` – Machine-readable command catalog.
//!
//! Request validation and missing records are reported synchronously as JSON errors before any
//! generation starts. Once streaming begins, failures travel as a single `error` frame.

use crate::metrics::MetricsSnapshot;
use crate::pipeline::{AnswerPipeline, AnswerRequest, EventStream, StreamEvent};
use crate::storage::{ChatMessage, ChatSession, ChatStore, Document, NewDocument, NewMessage, StoreError};
use crate::transport::WireEvent;
use async_stream::stream;
use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use futures_core::Stream;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Longest accepted question, in characters.
pub const MAX_QUESTION_CHARS: usize = 5000;

const FALLBACK_ERROR_FRAME: &str =
    "data: {\"type\":\"error\",\"error\":\"Failed to encode event\"}\n\n";

/// Shared handles used by every request.
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn ChatStore>,
    pipeline: Arc<AnswerPipeline>,
}

impl AppState {
    /// Bundle a store and a pipeline for the router.
    pub fn new(store: Arc<dyn ChatStore>, pipeline: Arc<AnswerPipeline>) -> Self {
        Self { store, pipeline }
    }
}

/// Build the HTTP router exposing the chat API surface.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/documents", post(create_document))
        .route("/api/chat", post(chat))
        .route("/api/chat/:session_id/messages", get(list_messages))
        .route("/api/chat/:session_id/clear", delete(clear_messages))
        .route("/metrics", get(get_metrics))
        .route("/commands", get(get_commands))
        .with_state(state)
}

/// Request body for `POST /api/documents`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    /// File name shown to users.
    pub original_name: String,
    /// Page count of the source file.
    pub page_count: u32,
    /// Extracted text (may be empty).
    #[serde(default)]
    pub text: String,
}

/// Response body for `POST /api/documents`.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Stored document.
    pub document: Document,
    /// Session opened for the document.
    pub session: ChatSession,
}

/// Register a document and open a session for it.
async fn create_document(
    State(state): State<AppState>,
    payload: Result<Json<UploadRequest>, JsonRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    if request.original_name.trim().is_empty() {
        return Err(ApiError::BadRequest("originalName must not be empty".into()));
    }

    let text = request.text.trim();
    let document = state
        .store
        .create_document(NewDocument {
            original_name: request.original_name,
            page_count: request.page_count,
            text_content: (!text.is_empty()).then(|| text.to_string()),
        })
        .await?;
    let session = state.store.create_session(&document.id).await?;
    tracing::info!(
        document_id = %document.id,
        session_id = %session.id,
        pages = document.page_count,
        text_chars = text.len(),
        "Document registered"
    );
    Ok(Json(UploadResponse { document, session }))
}

/// Request body for `POST /api/chat`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChatRequest {
    /// Session the question belongs to (UUID).
    pub session_id: String,
    /// Question text.
    pub question: String,
}

impl ChatRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if Uuid::parse_str(&self.session_id).is_err() {
            return Err(ApiError::BadRequest("sessionId must be a UUID".into()));
        }
        if self.question.trim().is_empty() {
            return Err(ApiError::BadRequest("question must not be empty".into()));
        }
        if self.question.chars().count() > MAX_QUESTION_CHARS {
            return Err(ApiError::BadRequest(format!(
                "question must be at most {MAX_QUESTION_CHARS} characters"
            )));
        }
        Ok(())
    }
}

/// Answer a question about the session's document as a frame stream.
async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    request.validate()?;
    let ChatRequest {
        session_id,
        question,
    } = request;

    let session = state
        .store
        .get_session(&session_id)
        .await?
        .ok_or(ApiError::NotFound("Session not found"))?;
    let document_text = state
        .store
        .get_document_text(&session.document_id)
        .await?
        .ok_or(ApiError::NotFound("Document not found"))?;

    // Snapshot history before the new question is stored.
    let history = state.store.get_history(&session_id).await?;
    state
        .store
        .save_message(NewMessage::user(&session_id, &question))
        .await?;

    tracing::info!(
        session_id = %session_id,
        document_chars = document_text.len(),
        history_turns = history.len(),
        "Chat question accepted"
    );

    let events = state.pipeline.generate(AnswerRequest {
        question,
        document_text,
        history,
    });
    let frames = relay_events(state, session_id, events);

    Ok((
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(frames.map(Ok::<_, Infallible>)),
    )
        .into_response())
}

/// Translate pipeline events into frames, persisting the answer before `complete` is sent.
fn relay_events(
    state: AppState,
    session_id: String,
    mut events: EventStream,
) -> impl Stream<Item = String> + Send + 'static {
    stream! {
        while let Some(event) = events.next().await {
            let wire = match event {
                StreamEvent::Chunk { content } => WireEvent::Chunk { content },
                StreamEvent::Complete { answer, citations } => {
                    let stored =
                        persist_answer(state.store.as_ref(), &session_id, answer, citations).await;
                    if !stored.is_complete() {
                        state.pipeline.record_persistence_failure();
                    }
                    stored
                }
                StreamEvent::Error { message } => {
                    tracing::warn!(session_id = %session_id, error = %message, "Answer stream failed");
                    WireEvent::Error { error: message }
                }
            };
            let terminal = wire.is_terminal();
            yield encode(&wire);
            if terminal {
                break;
            }
        }
    }
}

async fn persist_answer(
    store: &dyn ChatStore,
    session_id: &str,
    answer: String,
    citations: Vec<crate::citations::PageCitation>,
) -> WireEvent {
    match store
        .save_message(NewMessage::assistant(session_id, answer, citations))
        .await
    {
        Ok(message) => {
            if let Err(error) = store.touch_session(session_id).await {
                tracing::warn!(session_id, error = %error, "Failed to update session timestamp");
            }
            WireEvent::Complete { message }
        }
        Err(error) => {
            tracing::error!(session_id, error = %error, "Failed to persist assistant answer");
            WireEvent::Error {
                error: format!("Failed to save assistant response: {error}"),
            }
        }
    }
}

fn encode(event: &WireEvent) -> String {
    event.to_frame().unwrap_or_else(|error| {
        tracing::error!(error = %error, "Failed to encode wire event");
        FALLBACK_ERROR_FRAME.to_string()
    })
}

/// Return a session's messages in creation order.
async fn list_messages(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    Ok(Json(state.store.list_messages(&session_id).await?))
}

/// Delete a session's messages.
async fn clear_messages(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.store.clear_messages(&session_id).await?;
    tracing::info!(session_id = %session_id, "Chat history cleared");
    Ok(Json(json!({ "success": true })))
}

/// Return answer pipeline counters.
async fn get_metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.pipeline.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery by tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "upload",
                method: "POST",
                path: "/api/documents",
                description: "Register extracted document text and open a chat session. Response returns { \"document\": {...}, \"session\": {...} }.",
                request_example: Some(json!({
                    "originalName": "report.pdf",
                    "pageCount": 12,
                    "text": "[Page 1]\nQuarterly results..."
                })),
            },
            CommandDescriptor {
                name: "chat",
                method: "POST",
                path: "/api/chat",
                description: "Ask a question about the session's document. Streams `data:` frames of type chunk, then one complete (stored message) or error.",
                request_example: Some(json!({
                    "sessionId": "4f2c9a1e-3b7d-4c55-9e0a-6d1f2b3c4d5e",
                    "question": "What were the main findings?"
                })),
            },
            CommandDescriptor {
                name: "messages",
                method: "GET",
                path: "/api/chat/:session_id/messages",
                description: "Return the stored conversation for a session in creation order.",
                request_example: None,
            },
            CommandDescriptor {
                name: "clear",
                method: "DELETE",
                path: "/api/chat/:session_id/clear",
                description: "Delete every message in a session.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return answer pipeline counters.",
                request_example: None,
            },
        ],
    })
}

/// Errors reported synchronously, before any frame is streamed.
#[derive(Debug, Error)]
enum ApiError {
    #[error("Invalid request data: {0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) | Self::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Store(StoreError::Unavailable(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextSettings;
    use crate::generation::{GenerationBackend, MessageRole, ScriptedBackend};
    use crate::storage::InMemoryStore;
    use crate::transport::decode_events;
    use axum::{
        body::to_bytes,
        http::{Method, Request},
    };
    use tower::ServiceExt;

    struct Harness {
        store: Arc<InMemoryStore>,
        app: Router,
    }

    fn harness(backend: impl GenerationBackend + 'static) -> Harness {
        let store = Arc::new(InMemoryStore::new());
        let pipeline = Arc::new(AnswerPipeline::new(
            Arc::new(backend),
            ContextSettings::default(),
        ));
        let app = create_router(AppState::new(store.clone(), pipeline));
        Harness { store, app }
    }

    async fn open_session(store: &InMemoryStore, text: &str) -> ChatSession {
        let document = store
            .create_document(NewDocument {
                original_name: "doc.pdf".into(),
                page_count: 2,
                text_content: Some(text.into()),
            })
            .await
            .expect("document");
        store.create_session(&document.id).await.expect("session")
    }

    fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&body).expect("json body")
    }

    async fn body_events(response: Response) -> Vec<WireEvent> {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let stream = futures_util::stream::iter(vec![Ok::<_, Infallible>(body)]);
        decode_events(stream)
            .map(|event| event.expect("infallible"))
            .collect()
            .await
    }

    #[tokio::test]
    async fn chat_streams_chunks_then_persisted_message() {
        let harness = harness(ScriptedBackend::new(["The ", "cat ", "sat. [Page 1]"]));
        let session = open_session(&harness.store, "[Page 1]\nThe cat sat on the mat.").await;

        let response = harness
            .app
            .oneshot(json_request(
                Method::POST,
                "/api/chat",
                json!({ "sessionId": session.id, "question": "Where did the cat sit?" }),
            ))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );
        let events = body_events(response).await;
        assert_eq!(events.len(), 4);
        assert_eq!(
            events[0],
            WireEvent::Chunk {
                content: "The ".into()
            }
        );
        let WireEvent::Complete { message } = &events[3] else {
            panic!("expected complete, got {:?}", events[3]);
        };
        assert_eq!(message.content, "The cat sat. [Page 1]");
        assert_eq!(message.role, MessageRole::Assistant);
        assert_eq!(message.citations.as_ref().map(|c| c[0].page), Some(1));

        let stored = harness.store.list_messages(&session.id).await.expect("messages");
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].role, MessageRole::User);
        assert_eq!(stored[1], *message);
    }

    #[tokio::test]
    async fn backend_failure_streams_error_and_skips_persistence() {
        let harness = harness(ScriptedBackend::failing_after(["Half"], "upstream reset"));
        let session = open_session(&harness.store, "text").await;

        let response = harness
            .app
            .oneshot(json_request(
                Method::POST,
                "/api/chat",
                json!({ "sessionId": session.id, "question": "Anything?" }),
            ))
            .await
            .expect("router response");

        let events = body_events(response).await;
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[1], WireEvent::Error { error } if error.contains("upstream reset")));

        let stored = harness.store.list_messages(&session.id).await.expect("messages");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].role, MessageRole::User);
    }

    #[tokio::test]
    async fn history_snapshot_excludes_the_new_question() {
        let backend = Arc::new(ScriptedBackend::new(["ok"]));
        let store = Arc::new(InMemoryStore::new());
        let pipeline = Arc::new(AnswerPipeline::new(
            backend.clone(),
            ContextSettings::default(),
        ));
        let app = create_router(AppState::new(store.clone(), pipeline));
        let session = open_session(&store, "text").await;
        store
            .save_message(NewMessage::user(&session.id, "Earlier?"))
            .await
            .expect("message");

        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/chat",
                json!({ "sessionId": session.id, "question": "Now?" }),
            ))
            .await
            .expect("router response");
        let _ = body_events(response).await;

        let sent = backend.recorded_requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].history.len(), 1);
        assert_eq!(sent[0].history[0].content, "Earlier?");
        assert_eq!(sent[0].question, "Now?");
    }

    #[tokio::test]
    async fn rejects_invalid_chat_requests_synchronously() {
        let harness = harness(ScriptedBackend::new(["unused"]));
        let cases = [
            json!({ "sessionId": "not-a-uuid", "question": "Hi?" }),
            json!({ "sessionId": Uuid::new_v4().to_string(), "question": "   " }),
            json!({ "sessionId": Uuid::new_v4().to_string(), "question": "x".repeat(MAX_QUESTION_CHARS + 1) }),
            json!({ "sessionId": Uuid::new_v4().to_string(), "question": "Hi?", "extra": true }),
            json!({ "question": "Hi?" }),
        ];

        for body in cases {
            let response = harness
                .app
                .clone()
                .oneshot(json_request(Method::POST, "/api/chat", body.clone()))
                .await
                .expect("router response");
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
            let json = body_json(response).await;
            assert!(json["error"].as_str().is_some());
        }
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let harness = harness(ScriptedBackend::new(["unused"]));
        let response = harness
            .app
            .oneshot(json_request(
                Method::POST,
                "/api/chat",
                json!({ "sessionId": Uuid::new_v4().to_string(), "question": "Hello?" }),
            ))
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "Session not found");
    }

    #[tokio::test]
    async fn upload_then_list_and_clear_messages() {
        let harness = harness(ScriptedBackend::new(["unused"]));
        let response = harness
            .app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/documents",
                json!({ "originalName": "notes.pdf", "pageCount": 4, "text": "  hello  " }),
            ))
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::OK);
        let uploaded: UploadResponse =
            serde_json::from_value(body_json(response).await).expect("upload response");
        assert_eq!(uploaded.document.text_content.as_deref(), Some("hello"));
        assert_eq!(uploaded.session.document_id, uploaded.document.id);

        harness
            .store
            .save_message(NewMessage::user(&uploaded.session.id, "Q?"))
            .await
            .expect("message");

        let uri = format!("/api/chat/{}/messages", uploaded.session.id);
        let response = harness
            .app
            .clone()
            .oneshot(Request::builder().uri(&uri).body(Body::empty()).expect("request"))
            .await
            .expect("router response");
        let messages = body_json(response).await;
        assert_eq!(messages.as_array().map(Vec::len), Some(1));
        assert_eq!(messages[0]["sessionId"], uploaded.session.id.as_str());

        let response = harness
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::DELETE)
                    .uri(format!("/api/chat/{}/clear", uploaded.session.id))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");
        assert_eq!(body_json(response).await["success"], true);
        assert!(
            harness
                .store
                .list_messages(&uploaded.session.id)
                .await
                .expect("messages")
                .is_empty()
        );
    }

    #[tokio::test]
    async fn metrics_reflect_completed_answers() {
        let harness = harness(ScriptedBackend::new(["A ", "B"]));
        let session = open_session(&harness.store, "text").await;
        let response = harness
            .app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/chat",
                json!({ "sessionId": session.id, "question": "Letters?" }),
            ))
            .await
            .expect("router response");
        let _ = body_events(response).await;

        let response = harness
            .app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).expect("request"))
            .await
            .expect("router response");
        let json = body_json(response).await;
        assert_eq!(json["questions_received"], 1);
        assert_eq!(json["answers_completed"], 1);
        assert_eq!(json["fragments_streamed"], 2);
    }

    /// Store that accepts everything except assistant answers.
    struct AnswerRejectingStore {
        inner: InMemoryStore,
    }

    #[async_trait::async_trait]
    impl ChatStore for AnswerRejectingStore {
        async fn create_document(&self, document: NewDocument) -> Result<Document, StoreError> {
            self.inner.create_document(document).await
        }

        async fn get_document(&self, id: &str) -> Result<Option<Document>, StoreError> {
            self.inner.get_document(id).await
        }

        async fn create_session(&self, document_id: &str) -> Result<ChatSession, StoreError> {
            self.inner.create_session(document_id).await
        }

        async fn get_session(&self, id: &str) -> Result<Option<ChatSession>, StoreError> {
            self.inner.get_session(id).await
        }

        async fn touch_session(&self, id: &str) -> Result<(), StoreError> {
            self.inner.touch_session(id).await
        }

        async fn save_message(&self, message: NewMessage) -> Result<ChatMessage, StoreError> {
            if message.role == MessageRole::Assistant {
                return Err(StoreError::Unavailable("disk full".into()));
            }
            self.inner.save_message(message).await
        }

        async fn list_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>, StoreError> {
            self.inner.list_messages(session_id).await
        }

        async fn clear_messages(&self, session_id: &str) -> Result<(), StoreError> {
            self.inner.clear_messages(session_id).await
        }
    }

    #[tokio::test]
    async fn failed_answer_save_ends_with_error_and_counts_as_failure() {
        let store = Arc::new(AnswerRejectingStore {
            inner: InMemoryStore::new(),
        });
        let pipeline = Arc::new(AnswerPipeline::new(
            Arc::new(ScriptedBackend::new(["ok [Page 1]"])),
            ContextSettings::default(),
        ));
        let app = create_router(AppState::new(store.clone(), pipeline.clone()));
        let session = open_session(&store.inner, "[Page 1]\nok").await;

        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/chat",
                json!({ "sessionId": session.id, "question": "Is it okay?" }),
            ))
            .await
            .expect("router response");
        let events = body_events(response).await;

        assert_eq!(
            events[0],
            WireEvent::Chunk {
                content: "ok [Page 1]".into()
            }
        );
        assert!(
            matches!(events.last(), Some(WireEvent::Error { error }) if error.contains("disk full")),
            "unexpected events: {events:?}"
        );
        assert!(!events.iter().any(WireEvent::is_complete));

        let snapshot = pipeline.metrics_snapshot();
        assert_eq!(snapshot.questions_received, 1);
        assert_eq!(snapshot.answers_completed, 0);
        assert_eq!(snapshot.answers_failed, 1);
        assert_eq!(snapshot.fragments_streamed, 1);

        let stored = store.list_messages(&session.id).await.expect("messages");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].role, MessageRole::User);
    }

    #[tokio::test]
    async fn commands_catalog_exposes_chat_endpoint() {
        let response = get_commands().await;
        let commands = response.0.commands;
        let chat = commands
            .iter()
            .find(|cmd| cmd.name == "chat")
            .expect("chat command present");

        assert_eq!(chat.method, "POST");
        assert_eq!(chat.path, "/api/chat");
        assert!(commands.len() >= 4);
    }
}
