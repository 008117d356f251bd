//! Typed events carried inside frames on the chat channel.

use async_stream::try_stream;
use futures_core::Stream;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};

use super::frame::{encode_frame, frame_payloads};
use crate::storage::ChatMessage;

/// The only three message kinds on the chat channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WireEvent {
    /// A fragment of the answer, in generation order.
    Chunk {
        /// Fragment text.
        content: String,
    },
    /// The stored assistant message, sent once the answer is complete.
    Complete {
        /// Persisted message including citations.
        message: ChatMessage,
    },
    /// Generation or persistence failed.
    Error {
        /// Human-readable failure description.
        error: String,
    },
}

impl WireEvent {
    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Chunk { .. })
    }

    /// Whether this is the `complete` event.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }

    /// Serialize into a complete frame.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self).map(|payload| encode_frame(&payload))
    }

    /// Parse a frame payload.
    pub fn from_payload(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}

/// Decode a byte stream into wire events.
///
/// Payloads that are not valid events (including a truncated trailing frame) are logged and
/// skipped. Decoding stops after the first terminal event.
pub fn decode_events<S, B, E>(byte_stream: S) -> impl Stream<Item = Result<WireEvent, E>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    try_stream! {
        let mut payloads = std::pin::pin!(frame_payloads(byte_stream));
        while let Some(payload) = payloads.next().await {
            let payload = payload?;
            let event = match WireEvent::from_payload(&payload) {
                Ok(event) => event,
                Err(error) => {
                    tracing::warn!(error = %error, payload_len = payload.len(), "Skipping malformed frame");
                    continue;
                }
            };
            let terminal = event.is_terminal();
            yield event;
            if terminal {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citations::PageCitation;
    use crate::generation::MessageRole;
    use std::convert::Infallible;

    fn stored_message() -> ChatMessage {
        ChatMessage {
            id: "m-1".into(),
            session_id: "s-1".into(),
            role: MessageRole::Assistant,
            content: "The cat sat. [Page 1]".into(),
            citations: Some(vec![PageCitation {
                page: 1,
                text: "[Page 1]".into(),
            }]),
            created_at: "2026-01-01T00:00:00Z".into(),
        }
    }

    async fn decode(chunks: Vec<String>) -> Vec<WireEvent> {
        let stream = futures_util::stream::iter(
            chunks
                .into_iter()
                .map(|chunk| Ok::<_, Infallible>(chunk.into_bytes())),
        );
        decode_events(stream)
            .map(|event| event.expect("infallible"))
            .collect()
            .await
    }

    #[test]
    fn chunk_frame_matches_wire_format() {
        let frame = WireEvent::Chunk {
            content: "Hi \"there\"\n".into(),
        }
        .to_frame()
        .expect("frame");
        assert_eq!(
            frame,
            "data: {\"type\":\"chunk\",\"content\":\"Hi \\\"there\\\"\\n\"}\n\n"
        );
    }

    #[test]
    fn error_frame_matches_wire_format() {
        let frame = WireEvent::Error {
            error: "boom".into(),
        }
        .to_frame()
        .expect("frame");
        assert_eq!(frame, "data: {\"type\":\"error\",\"error\":\"boom\"}\n\n");
    }

    #[test]
    fn complete_frame_carries_stored_message() {
        let frame = WireEvent::Complete {
            message: stored_message(),
        }
        .to_frame()
        .expect("frame");
        let payload = frame
            .strip_prefix("data: ")
            .and_then(|rest| rest.strip_suffix("\n\n"))
            .expect("framed");
        let json: serde_json::Value = serde_json::from_str(payload).expect("json");
        assert_eq!(json["type"], "complete");
        assert_eq!(json["message"]["sessionId"], "s-1");
        assert_eq!(json["message"]["role"], "assistant");
        assert_eq!(json["message"]["citations"][0]["page"], 1);
        assert_eq!(json["message"]["createdAt"], "2026-01-01T00:00:00Z");
    }

    #[tokio::test]
    async fn decodes_events_split_at_arbitrary_points() {
        let mut wire = String::new();
        for event in [
            WireEvent::Chunk {
                content: "The ".into(),
            },
            WireEvent::Chunk {
                content: "cat".into(),
            },
            WireEvent::Complete {
                message: stored_message(),
            },
        ] {
            wire.push_str(&event.to_frame().expect("frame"));
        }
        let pieces: Vec<String> = wire
            .as_bytes()
            .chunks(7)
            .map(|piece| String::from_utf8(piece.to_vec()).expect("ascii"))
            .collect();

        let events = decode(pieces).await;
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[0],
            WireEvent::Chunk {
                content: "The ".into()
            }
        );
        assert!(matches!(&events[2], WireEvent::Complete { message } if message.id == "m-1"));
    }

    #[tokio::test]
    async fn honours_complete_trailing_frame_without_terminator() {
        let frame = WireEvent::Error {
            error: "late".into(),
        }
        .to_frame()
        .expect("frame");
        let unterminated = frame.trim_end().to_string();
        let events = decode(vec![unterminated]).await;
        assert_eq!(
            events,
            vec![WireEvent::Error {
                error: "late".into()
            }]
        );
    }

    #[tokio::test]
    async fn discards_truncated_trailing_frame() {
        let events = decode(vec![
            "data: {\"type\":\"chunk\",\"content\":\"a\"}\n\n".into(),
            "data: {\"type\":\"complete\",\"mess".into(),
        ])
        .await;
        assert_eq!(events, vec![WireEvent::Chunk { content: "a".into() }]);
    }

    #[tokio::test]
    async fn skips_unknown_types_and_stops_after_terminal_event() {
        let events = decode(vec![
            "data: {\"type\":\"progress\"}\n\n".into(),
            "data: {\"type\":\"error\",\"error\":\"x\"}\n\n".into(),
            "data: {\"type\":\"chunk\",\"content\":\"after\"}\n\n".into(),
        ])
        .await;
        assert_eq!(events, vec![WireEvent::Error { error: "x".into() }]);
    }
}
