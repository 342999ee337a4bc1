//! Lazy per-character wrapping for hit-testing.
//!
//! Spanified text is split into `span.spanified-word` wrappers (one per run
//! of word characters, whitespace or punctuation longer than one character)
//! that contain one `span.spanified` per grapheme cluster. Single characters
//! get a bare `span.spanified`. The transformation is reversible with
//! [`despanify`].

use unicode_segmentation::UnicodeSegmentation;

use crate::grapheme;
use crate::tree::{NodeId, Tree};

pub const CHAR_CLASS: &str = "spanified";
pub const WORD_CLASS: &str = "spanified-word";
pub const NO_SPANIFY_CLASS: &str = "do-not-spanify";

#[derive(Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Space,
    Word,
    Other,
}

/// A cluster takes the class of its base character.
fn char_class(cluster: &str) -> CharClass {
    match cluster.chars().next() {
        Some(ch) if ch.is_whitespace() => CharClass::Space,
        Some(ch) if ch.is_alphanumeric() || ch == '_' => CharClass::Word,
        _ => CharClass::Other,
    }
}

/// Split text into runs of whitespace, word characters and other symbols.
pub fn word_pieces(text: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut current: Option<CharClass> = None;
    for (idx, cluster) in text.grapheme_indices(true) {
        let class = char_class(cluster);
        if current.is_some_and(|c| c != class) {
            pieces.push(&text[start..idx]);
            start = idx;
        }
        current = Some(class);
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

/// Wrap the text under `node` for hit-testing. Returns whether anything
/// changed.
pub fn spanify(tree: &mut Tree, node: NodeId) -> bool {
    let targets: Vec<NodeId> = crate::traverse::leaf_nodes(tree, node)
        .into_iter()
        .filter(|n| tree.is_text(*n))
        .filter(|n| tree.closest(*n, |t, a| t.has_class(a, NO_SPANIFY_CLASS)).is_none())
        .collect();

    let mut replaced = Vec::new();
    for text_node in targets {
        let Some(text) = tree.text(text_node).map(str::to_owned) else {
            continue;
        };
        let pieces = word_pieces(&text);
        if pieces.len() <= 1 && grapheme::count(&text) <= 1 {
            continue;
        }
        if let Some(parent) = tree.parent(text_node) {
            tree.remove_class(parent, CHAR_CLASS);
        }
        for piece in pieces {
            let clusters = grapheme::clusters(piece);
            let wrapper = match clusters.as_slice() {
                [] => continue,
                [single] => char_span(tree, single),
                many => {
                    let word = tree.create_element("span");
                    tree.add_class(word, WORD_CLASS);
                    for cluster in many {
                        let span = char_span(tree, cluster);
                        tree.append_child(word, span);
                    }
                    word
                }
            };
            tree.insert_before(text_node, wrapper);
        }
        tree.detach(text_node);
        replaced.push(text_node);
    }
    // Freed last: a caller holding one of these ids must find it disconnected.
    let changed = !replaced.is_empty();
    for text_node in replaced {
        tree.remove(text_node);
    }
    if changed {
        tracing::trace!(target: "scrivet::selection", %node, "spanified");
    }
    changed
}

fn char_span(tree: &mut Tree, cluster: &str) -> NodeId {
    let span = tree.create_element("span");
    tree.add_class(span, CHAR_CLASS);
    let text = tree.create_text(cluster);
    tree.append_child(span, text);
    span
}

/// Undo [`spanify`] below `node` and merge the freed text.
pub fn despanify(tree: &mut Tree, node: NodeId) -> bool {
    let wrappers: Vec<NodeId> = tree
        .descendants(node)
        .into_iter()
        .filter(|n| tree.has_class(*n, WORD_CLASS) || tree.has_class(*n, CHAR_CLASS))
        .collect();
    if wrappers.is_empty() {
        return false;
    }
    for wrapper in wrappers {
        tree.dissolve(wrapper);
    }
    tree.normalize(node);
    true
}
