//! Context Assembler and caller-side token utilities.

use crate::retrieve::RetrievalResult;
use sprintlens_core::CorpusEntry;

/// Render retrieval hits as `[source]: text` lines joined by `\n`.
///
/// Hits are written in the order supplied and never truncated; an empty
/// result renders as an empty string.
pub fn assemble(result: &RetrievalResult<'_>) -> String {
    result
        .iter()
        .map(|hit| format!("[{}]: {}", hit.entry.source, hit.entry.text))
        .collect::<Vec<_>>()
        .join("\n")
}

// ============================================================================
// TOKEN UTILITIES
// ============================================================================

/// Estimate token count for text.
/// Rough estimate: ~0.75 tokens per byte (English).
///
/// # Returns
/// Estimated token count (always >= 0)
pub fn estimate_tokens(text: &str) -> i32 {
    if text.is_empty() {
        return 0;
    }
    (text.len() as f32 * 0.75).ceil() as i32
}

/// Truncate text to fit within token budget.
/// Prefers sentence boundaries, falls back to word boundaries.
pub fn truncate_to_token_budget(text: &str, budget: i32) -> String {
    if budget <= 0 {
        return String::new();
    }

    let max_chars = (budget as f32 / 0.75).floor() as usize;

    if text.len() <= max_chars {
        return text.to_string();
    }

    let truncated = safe_truncate(text, max_chars);

    let last_sentence = [truncated.rfind('.'), truncated.rfind('?'), truncated.rfind('!')]
        .into_iter()
        .flatten()
        .max();

    // Sentence boundary only if it keeps more than half
    if let Some(pos) = last_sentence {
        if pos > max_chars / 2 {
            return truncated[..=pos].to_string();
        }
    }

    if let Some(pos) = truncated.rfind(' ') {
        if pos > max_chars * 4 / 5 {
            return truncated[..pos].to_string();
        }
    }

    truncated.to_string()
}

/// Safely truncate a string at a UTF-8 boundary.
fn safe_truncate(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }

    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }

    &s[..end]
}

/// Cap every entry's text at `max_tokens_per_entry`.
///
/// Entries whose text changes lose their embedding. A non-empty text keeps at
/// least its first character, even past the budget, so no entry is emptied.
/// Returns how many were shortened.
pub fn truncate_entries(entries: &mut [CorpusEntry], max_tokens_per_entry: i32) -> usize {
    let mut shortened = 0;
    for entry in entries.iter_mut() {
        if estimate_tokens(&entry.text) <= max_tokens_per_entry {
            continue;
        }
        let mut text = truncate_to_token_budget(&entry.text, max_tokens_per_entry);
        if text.is_empty() {
            text = entry.text.chars().take(1).collect();
        }
        if text != entry.text {
            entry.text = text;
            entry.embedding = None;
            shortened += 1;
        }
    }
    shortened
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieve::RetrievalHit;
    use sprintlens_test_utils::fixtures::{corpus_entry, unit_embedding};

    #[test]
    fn test_assemble_formats_lines_in_order() {
        let a = corpus_entry("SCRUM-2", "Add dark mode toggle");
        let b = corpus_entry("SCRUM-1", "Deploy payment service");
        let result = RetrievalResult::new(vec![
            RetrievalHit { entry: &a, score: 0.9, position: 1 },
            RetrievalHit { entry: &b, score: 0.1, position: 0 },
        ]);
        assert_eq!(
            assemble(&result),
            "[SCRUM-2]: Add dark mode toggle\n[SCRUM-1]: Deploy payment service"
        );
    }

    #[test]
    fn test_assemble_empty_result() {
        assert_eq!(assemble(&RetrievalResult::default()), "");
    }

    #[test]
    fn test_assemble_does_not_truncate() {
        let long = "x".repeat(10_000);
        let entry = corpus_entry("A-1", &long);
        let result = RetrievalResult::new(vec![RetrievalHit { entry: &entry, score: 1.0, position: 0 }]);
        assert_eq!(assemble(&result).len(), "[A-1]: ".len() + 10_000);
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 3);
    }

    #[test]
    fn test_truncate_prefers_sentence_boundary() {
        let text = "First sentence here. Second sentence that runs on and on.";
        let truncated = truncate_to_token_budget(text, 20);
        assert_eq!(truncated, "First sentence here.");
    }

    #[test]
    fn test_truncate_respects_utf8() {
        let text = "é".repeat(50);
        let truncated = truncate_to_token_budget(&text, 10);
        assert!(truncated.len() <= 13);
        assert!(text.starts_with(&truncated));
    }

    #[test]
    fn test_truncate_entries_clears_embedding() {
        let mut entries = vec![
            corpus_entry("A-1", "short").with_embedding(unit_embedding(2, 0)),
            corpus_entry("A-2", &"word ".repeat(100)).with_embedding(unit_embedding(2, 0)),
        ];
        assert_eq!(truncate_entries(&mut entries, 10), 1);
        assert!(entries[0].is_embedded());
        assert!(!entries[1].is_embedded());
        assert!(estimate_tokens(&entries[1].text) <= 10);
    }

    #[test]
    fn test_truncate_entries_never_empties_text() {
        let mut entries = vec![
            corpus_entry("A-1", "éclair rollout"),
            corpus_entry("A-2", "deploy pipeline"),
        ];
        assert_eq!(truncate_entries(&mut entries, 1), 2);
        assert_eq!(entries[0].text, "é");
        assert_eq!(entries[1].text, "d");
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Truncated text fits the budget and is a prefix of the input.
        #[test]
        fn prop_truncation_fits_budget(text in ".{0,400}", budget in 1i32..200) {
            let truncated = truncate_to_token_budget(&text, budget);
            prop_assert!(estimate_tokens(&truncated) <= budget);
            prop_assert!(text.starts_with(&truncated));
        }

        /// Truncated entries stay non-empty prefixes of their original text.
        #[test]
        fn prop_truncated_entries_stay_non_empty(text in ".{1,200}", budget in 1i32..20) {
            let mut entries = vec![CorpusEntry::new("A-1", text.clone())];
            truncate_entries(&mut entries, budget);
            prop_assert!(!entries[0].text.is_empty());
            prop_assert!(text.starts_with(&entries[0].text));
        }
    }
}
