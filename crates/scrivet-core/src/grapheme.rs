//! Grapheme cluster helpers.
//!
//! Text offsets, delete units and caret steps count extended grapheme
//! clusters, so `e` plus a combining accent or a ZWJ emoji sequence is one
//! character to the user and to the engines.

use unicode_segmentation::UnicodeSegmentation;

/// Number of grapheme clusters in `text`.
pub fn count(text: &str) -> usize {
    text.graphemes(true).count()
}

/// Byte index at which cluster `offset` starts. `offset == count(text)`
/// gives `text.len()`; anything further is `None`.
pub fn byte_offset(text: &str, offset: usize) -> Option<usize> {
    text.grapheme_indices(true)
        .map(|(byte, _)| byte)
        .chain(std::iter::once(text.len()))
        .nth(offset)
}

/// `text` minus its first cluster.
pub fn without_first(text: &str) -> &str {
    text.graphemes(true)
        .next()
        .map_or(text, |first| &text[first.len()..])
}

/// `text` minus its last cluster.
pub fn without_last(text: &str) -> &str {
    text.grapheme_indices(true)
        .next_back()
        .map_or(text, |(byte, _)| &text[..byte])
}

/// Clusters of `text` in order.
pub fn clusters(text: &str) -> Vec<&str> {
    text.graphemes(true).collect()
}
