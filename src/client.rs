//! HTTP client for a running pagechat server.
//!
//! Used by the `pagechat-ask` binary and the end-to-end tests. Answers are consumed
//! incrementally through [`decode_events`], so chunks are available as soon as each frame
//! arrives.

use futures_core::Stream;
use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::pin::Pin;
use thiserror::Error;

use crate::api::UploadResponse;
use crate::storage::ChatMessage;
use crate::transport::{WireEvent, decode_events};

/// Live sequence of events for one question.
pub type AnswerEvents = Pin<Box<dyn Stream<Item = Result<WireEvent, ClientError>> + Send>>;

/// Errors surfaced while talking to the server.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// Server refused the request before streaming.
    #[error("Request rejected ({status}): {message}")]
    Rejected {
        /// Status returned by the server.
        status: StatusCode,
        /// Error text from the response body.
        message: String,
    },
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Thin client over the pagechat HTTP API.
#[derive(Clone)]
pub struct ChatClient {
    http: Client,
    base_url: String,
}

impl ChatClient {
    /// Create a client for the server at `base_url` (e.g. `http://127.0.0.1:4100`).
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = Client::builder().user_agent("pagechat-ask/0.1").build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Register extracted document text and open a session.
    pub async fn register_document(
        &self,
        original_name: &str,
        page_count: u32,
        text: &str,
    ) -> Result<UploadResponse, ClientError> {
        let response = self
            .http
            .post(self.url("/api/documents"))
            .json(&json!({
                "originalName": original_name,
                "pageCount": page_count,
                "text": text,
            }))
            .send()
            .await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    /// Ask `question` in `session_id` and stream the answer events.
    ///
    /// Validation and lookup failures surface as [`ClientError::Rejected`] before any event.
    pub async fn ask(&self, session_id: &str, question: &str) -> Result<AnswerEvents, ClientError> {
        let response = self
            .http
            .post(self.url("/api/chat"))
            .json(&json!({ "sessionId": session_id, "question": question }))
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let events = decode_events(response.bytes_stream());
        Ok(Box::pin(
            events.map(|event| event.map_err(ClientError::from)),
        ))
    }

    /// Stored messages of a session.
    pub async fn messages(&self, session_id: &str) -> Result<Vec<ChatMessage>, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("/api/chat/{session_id}/messages")))
            .send()
            .await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    /// Delete the stored messages of a session.
    pub async fn clear(&self, session_id: &str) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(self.url(&format!("/api/chat/{session_id}/clear")))
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|parsed| parsed.error)
        .unwrap_or(body);
    Err(ClientError::Rejected { status, message })
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    #[tokio::test]
    async fn ask_decodes_streamed_frames() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/chat")
                    .json_body(json!({ "sessionId": "s-1", "question": "Q?" }));
                then.status(200)
                    .header("content-type", "text/event-stream")
                    .body(concat!(
                        "data: {\"type\":\"chunk\",\"content\":\"Hel\"}\n\n",
                        "data: {\"type\":\"chunk\",\"content\":\"lo\"}\n\n",
                        "data: {\"type\":\"error\",\"error\":\"quota\"}\n\n",
                    ));
            })
            .await;

        let client = ChatClient::new(server.base_url()).expect("client");
        let events: Vec<WireEvent> = client
            .ask("s-1", "Q?")
            .await
            .expect("stream")
            .map(|event| event.expect("event"))
            .collect()
            .await;

        assert_eq!(
            events,
            vec![
                WireEvent::Chunk {
                    content: "Hel".into()
                },
                WireEvent::Chunk {
                    content: "lo".into()
                },
                WireEvent::Error {
                    error: "quota".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn rejection_carries_server_error_text() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/chat");
                then.status(404)
                    .json_body(json!({ "error": "Session not found" }));
            })
            .await;

        let client = ChatClient::new(server.base_url()).expect("client");
        let error = match client.ask("s-1", "Q?").await {
            Ok(_) => panic!("expected rejection"),
            Err(error) => error,
        };
        match error {
            ClientError::Rejected { status, message } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(message, "Session not found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
