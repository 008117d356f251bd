//! Lexical relevance scoring over document chunks.
//!
//! Keywords are the lowercase whitespace tokens of the question longer than three characters.
//! A chunk's score is the total number of case-insensitive, non-overlapping occurrences of every
//! keyword. The best `top_k` chunks are returned in document order so the model reads them in
//! the same sequence as the source.

/// Delimiter placed between discontinuous excerpts in the model context.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

const MIN_KEYWORD_CHARS: usize = 4;
const FALLBACK_CHUNKS: usize = 2;

/// Select the chunks most relevant to `question`, preserving their original order.
///
/// Falls back to the first two chunks when the question has no keywords or when no chunk
/// mentions any keyword.
pub fn select_chunks<'a>(chunks: &'a [String], question: &str, top_k: usize) -> Vec<&'a str> {
    let keywords = extract_keywords(question);
    let fallback = || {
        chunks
            .iter()
            .take(FALLBACK_CHUNKS)
            .map(String::as_str)
            .collect()
    };

    if keywords.is_empty() {
        tracing::debug!(chunks = chunks.len(), "Question has no keywords; using leading chunks");
        return fallback();
    }

    let mut scored: Vec<(usize, usize)> = chunks
        .iter()
        .enumerate()
        .map(|(index, chunk)| (index, score_chunk(chunk, &keywords)))
        .collect();

    if scored.iter().all(|(_, score)| *score == 0) {
        tracing::debug!(chunks = chunks.len(), "No chunk matched a keyword; using leading chunks");
        return fallback();
    }

    // Stable sort keeps document order among equal scores.
    scored.sort_by(|left, right| right.1.cmp(&left.1));
    let mut selected: Vec<usize> = scored.into_iter().take(top_k).map(|(index, _)| index).collect();
    selected.sort_unstable();

    selected.into_iter().map(|index| chunks[index].as_str()).collect()
}

/// Select relevant chunks and join them with [`CONTEXT_SEPARATOR`].
///
/// Returns an empty string when `chunks` is empty.
pub fn select_context(chunks: &[String], question: &str, top_k: usize) -> String {
    select_chunks(chunks, question, top_k).join(CONTEXT_SEPARATOR)
}

fn extract_keywords(question: &str) -> Vec<String> {
    question
        .split_whitespace()
        .map(str::to_lowercase)
        .filter(|word| word.chars().count() >= MIN_KEYWORD_CHARS)
        .collect()
}

fn score_chunk(chunk: &str, keywords: &[String]) -> usize {
    let haystack = chunk.to_lowercase();
    keywords
        .iter()
        .map(|keyword| haystack.matches(keyword.as_str()).count())
        .sum()
}
