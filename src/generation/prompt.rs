//! Prompt composition for document question answering.

use super::types::ConversationTurn;

/// Fixed instructions sent ahead of every document context.
pub const SYSTEM_PREAMBLE: &str = "You are an assistant that helps people understand PDF documents.
Answer questions using only the document content provided below.

Rules:
1. Base every statement on the document content.
2. Cite the page for each piece of information you use, formatted exactly as [Page N].
3. Be concise but complete.
4. If the answer is not in the document content, say so plainly.
5. Use the conversation history to resolve follow-up questions, but prefer the document content.";

/// Everything a backend needs to answer one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Instruction preamble.
    pub preamble: String,
    /// Selected document excerpts, possibly empty.
    pub context: String,
    /// Prior turns, oldest first.
    pub history: Vec<ConversationTurn>,
    /// The new question.
    pub question: String,
}

impl GenerationRequest {
    /// Build a request using [`SYSTEM_PREAMBLE`].
    pub fn new(
        context: impl Into<String>,
        history: Vec<ConversationTurn>,
        question: impl Into<String>,
    ) -> Self {
        Self {
            preamble: SYSTEM_PREAMBLE.to_string(),
            context: context.into(),
            history,
            question: question.into(),
        }
    }

    /// System instruction combining the preamble and the document context.
    pub fn system_instruction(&self) -> String {
        format!(
            "{preamble}\n\nDOCUMENT CONTENT:\n{context}\n\nWhen you cite information, use the format [Page N] where N is the page number.",
            preamble = self.preamble,
            context = self.context,
        )
    }
}
