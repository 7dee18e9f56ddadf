//! Text helpers.

use unicode_segmentation::UnicodeSegmentation;

/// Cut `text` to at most `max` characters without splitting a grapheme cluster.
///
/// A cluster that would cross the limit is dropped whole.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    let mut kept = 0;
    for (idx, grapheme) in text.grapheme_indices(true) {
        kept += grapheme.chars().count();
        if kept > max {
            return &text[..idx];
        }
    }
    text
}

/// Trim text, returning `None` when nothing is left.
pub fn non_empty(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
