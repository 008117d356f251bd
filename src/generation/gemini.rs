//! Gemini `streamGenerateContent` adapter.
//!
//! Sends the system instruction (preamble plus document context) separately from the
//! conversation, maps `assistant` turns to Gemini's `model` role, and requests `alt=sse` so the
//! response arrives as `data:` frames that the crate's frame decoder already understands.

use async_stream::try_stream;
use async_trait::async_trait;
use futures_core::Stream;
use futures_util::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

use super::{FragmentStream, GenerationBackend, GenerationError, GenerationRequest, MessageRole};
use crate::config::Config;
use crate::transport::frame_payloads;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the Gemini generative language API.
pub struct GeminiClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    /// Build a client for `model` at `base_url`.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, GenerationError> {
        let http = Client::builder()
            .user_agent("pagechat/0.1")
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        let client = Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        };
        tracing::debug!(
            base_url = %client.base_url,
            model = %client.model,
            has_api_key = !client.api_key.is_empty(),
            "Initialized Gemini client"
        );
        Ok(client)
    }

    /// Build a client from loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, GenerationError> {
        Self::new(
            config.gemini_api_key.clone(),
            config.gemini_model.clone(),
            config.gemini_base_url.clone(),
        )
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        )
    }
}

fn gemini_role(role: MessageRole) -> &'static str {
    match role {
        MessageRole::User => "user",
        MessageRole::Assistant => "model",
    }
}

fn content(role: &str, text: &str) -> Value {
    json!({ "role": role, "parts": [{ "text": text }] })
}

/// Build the JSON body for a `streamGenerateContent` call.
pub(crate) fn build_request_body(request: &GenerationRequest) -> Value {
    let mut contents: Vec<Value> = request
        .history
        .iter()
        .map(|turn| content(gemini_role(turn.role), &turn.content))
        .collect();
    contents.push(content("user", &request.question));

    json!({
        "systemInstruction": { "parts": [{ "text": request.system_instruction() }] },
        "contents": contents,
    })
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

/// Extract the answer text carried by one streamed chunk.
fn parse_fragment(payload: &str) -> Result<String, GenerationError> {
    let chunk: StreamChunk = serde_json::from_str(payload)
        .map_err(|error| GenerationError::InvalidResponse(error.to_string()))?;
    if let Some(error) = chunk.error {
        return Err(GenerationError::Backend(error.message));
    }

    let text = chunk
        .candidates
        .first()
        .and_then(|candidate| candidate.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter(|part| !part.thought)
                .filter_map(|part| part.text.as_deref())
                .collect::<String>()
        })
        .unwrap_or_default();
    Ok(text)
}

/// Turn a raw SSE byte stream into answer fragments, skipping chunks without text.
fn decode_fragments<S, B>(byte_stream: S) -> impl Stream<Item = Result<String, GenerationError>>
where
    S: Stream<Item = Result<B, reqwest::Error>>,
    B: AsRef<[u8]>,
{
    try_stream! {
        let mut payloads = std::pin::pin!(frame_payloads(byte_stream));
        while let Some(payload) = payloads.next().await {
            let payload = payload?;
            let text = parse_fragment(&payload)?;
            if !text.is_empty() {
                yield text;
            }
        }
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .ok()
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl GenerationBackend for GeminiClient {
    async fn generate_stream(
        &self,
        request: GenerationRequest,
    ) -> Result<FragmentStream, GenerationError> {
        let body = build_request_body(&request);
        tracing::debug!(
            model = %self.model,
            history_turns = request.history.len(),
            context_chars = request.context.len(),
            "Requesting Gemini stream"
        );

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body);
            tracing::error!(status = %status, message = %message, "Gemini request rejected");
            return Err(GenerationError::UnexpectedStatus { status, message });
        }

        Ok(Box::pin(decode_fragments(response.bytes_stream())))
    }
}
