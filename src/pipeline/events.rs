//! Events produced by the answer pipeline.

use crate::citations::PageCitation;
use crate::generation::ConversationTurn;

/// Input for one answer generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRequest {
    /// The new question.
    pub question: String,
    /// Full extracted text of the document, possibly empty.
    pub document_text: String,
    /// Prior turns, oldest first, not including `question`.
    pub history: Vec<ConversationTurn>,
}

/// One event on the pipeline's output.
///
/// Zero or more `Chunk` events are followed by exactly one `Complete` or `Error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A fragment of the answer as it arrived from the backend.
    Chunk {
        /// Fragment text.
        content: String,
    },
    /// The full answer and the citations found in it.
    Complete {
        /// Concatenation of every chunk.
        answer: String,
        /// Unique citations sorted by page.
        citations: Vec<PageCitation>,
    },
    /// Generation failed; nothing follows.
    Error {
        /// Human-readable failure description.
        message: String,
    },
}

impl StreamEvent {
    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Chunk { .. })
    }

    pub(crate) fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
