//! Paragraph-first chunking of extracted document text.
//!
//! Text is split on blank lines and paragraphs are packed greedily into chunks of at most
//! `max_chunk_size` characters. A paragraph that cannot fit on its own is broken into
//! sentences, and a sentence that still cannot fit is broken into whitespace-delimited words.
//! A single word longer than the budget becomes its own chunk.

use regex::Regex;
use std::sync::LazyLock;

use super::types::ContextError;

static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n(?:[ \t]*\r?\n)+").expect("paragraph regex is valid"));

// Second alternative keeps a trailing run that has no terminal punctuation.
static SENTENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^.!?]*[.!?]+|[^.!?]+").expect("sentence regex is valid"));

const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Split `text` into trimmed, non-empty chunks of at most `max_chunk_size` characters.
///
/// Returns an empty vector for empty or whitespace-only input and rejects a zero budget.
pub fn chunk_text(text: &str, max_chunk_size: usize) -> Result<Vec<String>, ContextError> {
    if max_chunk_size == 0 {
        return Err(ContextError::InvalidChunkSize);
    }
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut buffer = ChunkBuffer::new(max_chunk_size);
    for paragraph in PARAGRAPH_BREAK.split(text) {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }
        if char_len(paragraph) <= max_chunk_size {
            buffer.push(paragraph, PARAGRAPH_SEPARATOR);
            continue;
        }
        push_sentences(&mut buffer, paragraph);
    }

    Ok(buffer.finish())
}

fn push_sentences(buffer: &mut ChunkBuffer, paragraph: &str) {
    for (index, sentence) in SENTENCE.find_iter(paragraph).enumerate() {
        let raw = sentence.as_str();
        if raw.trim().is_empty() {
            continue;
        }
        // Sentences keep their own leading whitespace, so only the first needs a separator.
        let separator = if index == 0 { PARAGRAPH_SEPARATOR } else { "" };
        if char_len(raw.trim()) <= buffer.max {
            buffer.push(raw, separator);
            continue;
        }

        let mut words = raw.split_whitespace();
        if let Some(first) = words.next() {
            let first_separator = if index > 0 && starts_with_whitespace(raw) {
                " "
            } else {
                separator
            };
            buffer.push(first, first_separator);
        }
        for word in words {
            buffer.push(word, " ");
        }
    }
}

/// Greedy accumulator that flushes whenever the next unit would overflow the budget.
struct ChunkBuffer {
    max: usize,
    current: String,
    current_len: usize,
    chunks: Vec<String>,
}

impl ChunkBuffer {
    fn new(max: usize) -> Self {
        Self {
            max,
            current: String::new(),
            current_len: 0,
            chunks: Vec::new(),
        }
    }

    fn push(&mut self, unit: &str, separator: &str) {
        if self.current.is_empty() {
            self.start_with(unit);
            return;
        }

        let candidate = self.current_len + char_len(separator) + char_len(unit);
        if candidate > self.max {
            self.flush();
            self.start_with(unit);
        } else {
            self.current.push_str(separator);
            self.current.push_str(unit);
            self.current_len = candidate;
        }
    }

    fn start_with(&mut self, unit: &str) {
        let unit = unit.trim_start();
        self.current.push_str(unit);
        self.current_len = char_len(unit);
    }

    fn flush(&mut self) {
        let trimmed = self.current.trim();
        if !trimmed.is_empty() {
            self.chunks.push(trimmed.to_string());
        }
        self.current.clear();
        self.current_len = 0;
    }

    fn finish(mut self) -> Vec<String> {
        self.flush();
        self.chunks
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn starts_with_whitespace(text: &str) -> bool {
    text.chars()
        .next()
        .map(|c| c.is_whitespace())
        .unwrap_or(false)
}
