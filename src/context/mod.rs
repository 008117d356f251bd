//! Context selection: split document text into bounded chunks and pick the ones worth sending.

pub mod chunking;
pub mod relevance;
pub mod types;

pub use chunking::chunk_text;
pub use relevance::{CONTEXT_SEPARATOR, select_chunks, select_context};
pub use types::{ContextError, ContextSettings};

/// Chunk `text` and select the most relevant excerpts for `question`.
///
/// Returns an empty string when the document has no text.
pub fn build_context(
    text: &str,
    question: &str,
    settings: ContextSettings,
) -> Result<String, ContextError> {
    let chunks = chunk_text(text, settings.chunk_size)?;
    let context = select_context(&chunks, question, settings.top_k);
    tracing::debug!(
        document_chars = text.len(),
        chunks = chunks.len(),
        context_chars = context.len(),
        "Built answer context"
    );
    Ok(context)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_builds_empty_context() {
        let context = build_context("", "What is this about?", ContextSettings::default())
            .expect("context");
        assert!(context.is_empty());
    }

    #[test]
    fn picks_relevant_paragraph_from_small_chunks() {
        let text = "Cats purr when content.\n\nDogs bark at strangers.\n\nBirds sing at dawn.";
        let settings = ContextSettings::new(25, 1).expect("settings");
        let context = build_context(text, "Why do dogs bark?", settings).expect("context");
        assert_eq!(context, "Dogs bark at strangers.");
    }
}
