//! Extraction of `[Page N]` markers from generated answers.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;

static PAGE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[Page (\d+)\]").expect("page marker regex is valid"));

/// A page reference found in an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCitation {
    /// One-based page number.
    pub page: u32,
    /// Marker text exactly as it appeared in the answer.
    pub text: String,
}

/// Collect unique page citations from `text`, sorted by page number.
///
/// The first occurrence of each page wins. Markers whose number does not fit a `u32` or is
/// zero are ignored, as is anything that only resembles a marker.
pub fn extract_citations(text: &str) -> Vec<PageCitation> {
    let mut seen = HashSet::new();
    let mut citations = Vec::new();

    for captures in PAGE_MARKER.captures_iter(text) {
        let Some(page) = captures
            .get(1)
            .and_then(|digits| digits.as_str().parse::<u32>().ok())
            .filter(|page| *page > 0)
        else {
            continue;
        };
        if seen.insert(page) {
            citations.push(PageCitation {
                page,
                text: captures[0].to_string(),
            });
        }
    }

    citations.sort_by_key(|citation| citation.page);
    citations
}
