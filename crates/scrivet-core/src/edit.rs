//! Editing operations on the caret and the selected range.
//!
//! Every public operation leaves the tree normalized and re-marked, and
//! records its undo checkpoint. The `*_at_caret` helpers do the tree work
//! without touching the history so compound operations can record once.

use crate::config::AnnotationTemplates;
use crate::editor::{Editor, NOT_EDITABLE};
use crate::error::{EditorError, Result};
use crate::grapheme;
use crate::history::{UndoAction, UndoReason};
use crate::input::Key;
use crate::markup;
use crate::selection::spanify::NO_SPANIFY_CLASS;
use crate::selection::{NOT_SELECTABLE, TextPosition};
use crate::traverse::{below_block, block_of, leaf_nodes, next_leaf, previous_leaf, top_single_parent_ancestor};
use crate::tree::{NodeId, Tree};

pub const ANNOTATION: &str = "annotation";
pub const ANNOTATION_BODY: &str = "annotation-body";
/// Attribute naming the template an annotation came from.
pub const ANNOTATION_KIND_ATTR: &str = "data-annotation";

/// Stand-in for void elements when measuring block text.
const OBJECT_CLUSTER: &str = "\u{FFFC}";

/// Caret movement directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
}

impl Direction {
    pub fn from_key(key: &Key) -> Option<Self> {
        match key {
            Key::ArrowLeft => Some(Self::Left),
            Key::ArrowRight => Some(Self::Right),
            Key::ArrowUp => Some(Self::Up),
            Key::ArrowDown => Some(Self::Down),
            Key::Home => Some(Self::Home),
            Key::End => Some(Self::End),
            _ => None,
        }
    }

    /// Whether a Shift-extension in this direction grows the range at its
    /// start marker.
    fn moves_start(self) -> bool {
        matches!(self, Self::Left | Self::Up | Self::Home)
    }
}

fn is_deletable(tree: &Tree, node: NodeId) -> bool {
    !tree.is_marker(node) && !tree.is_empty_text(node)
}

/// Clusters classify by their base character.
fn is_word_cluster(cluster: &str) -> bool {
    cluster
        .chars()
        .next()
        .is_some_and(|ch| ch.is_alphanumeric() || ch == '_')
}

fn is_space_cluster(cluster: &str) -> bool {
    cluster.chars().all(char::is_whitespace)
}

fn word_left(clusters: &[&str], mut offset: usize) -> usize {
    while offset > 0 && is_space_cluster(clusters[offset - 1]) {
        offset -= 1;
    }
    if offset > 0 && !is_word_cluster(clusters[offset - 1]) {
        return offset - 1;
    }
    while offset > 0 && is_word_cluster(clusters[offset - 1]) {
        offset -= 1;
    }
    offset
}

fn word_right(clusters: &[&str], mut offset: usize) -> usize {
    while offset < clusters.len() && is_space_cluster(clusters[offset]) {
        offset += 1;
    }
    if offset < clusters.len() && !is_word_cluster(clusters[offset]) {
        return offset + 1;
    }
    while offset < clusters.len() && is_word_cluster(clusters[offset]) {
        offset += 1;
    }
    offset
}

impl Editor {
    // === Typing ===

    pub fn insert_character(&mut self, ch: char) -> Result<bool> {
        let mut buf = [0u8; 4];
        self.insert_text(ch.encode_utf8(&mut buf))
    }

    /// Type `text` at the caret, replacing any range first.
    pub fn insert_text(&mut self, text: &str) -> Result<bool> {
        if text.is_empty() {
            return Ok(false);
        }
        if !self.is_collapsed() {
            self.delete_range()?;
            self.record(UndoAction::New, Some(UndoReason::Command));
        }
        self.insert_at_caret(text)?;
        self.record(UndoAction::Coalesce, Some(UndoReason::Typing));
        Ok(true)
    }

    pub(crate) fn insert_at_caret(&mut self, text: &str) -> Result<()> {
        let caret = self.caret()?;
        let tree = &mut self.tree;
        match tree.previous_sibling(caret) {
            Some(prev) if tree.is_text(prev) => {
                let mut joined = tree.text(prev).unwrap_or_default().to_string();
                joined.push_str(text);
                tree.set_text(prev, joined);
            }
            _ => {
                let node = tree.create_text(text);
                tree.insert_before(caret, node);
            }
        }
        self.selectable.normalize(tree);
        tracing::trace!(target: "scrivet::edit", text, "inserted");
        Ok(())
    }

    // === Deleting ===

    /// Remove the selected content. Returns whether anything was removed.
    pub fn delete_selection(&mut self) -> Result<bool> {
        let removed = self.delete_range()?;
        if removed {
            self.record(UndoAction::New, Some(UndoReason::Command));
        }
        Ok(removed)
    }

    fn delete_range(&mut self) -> Result<bool> {
        if self.is_collapsed() {
            return Ok(false);
        }
        self.selectable.mark_bounds(&mut self.tree)?;
        let Some(start) = self.selectable.start(&self.tree) else {
            return Ok(false);
        };
        let leaves = self.selectable.selected_leaf_nodes(&self.tree);
        let blocks = self.selectable.selected_blocks(&self.tree);
        let tree = &mut self.tree;

        if blocks.len() > 2 {
            for block in &blocks[1..blocks.len() - 1] {
                tree.remove(*block);
            }
        }
        tree.remove(start);

        let mut removed = 0usize;
        for leaf in leaves {
            if !tree.is_connected(leaf) {
                continue;
            }
            let top = top_single_parent_ancestor(tree, leaf, below_block);
            tree.remove(top);
            removed += 1;
        }

        if let (Some(&first), Some(&last)) = (blocks.first(), blocks.last()) {
            if first != last {
                tree.move_children(first, last, true);
                tree.remove(first);
            }
        }

        self.lift_caret();
        self.selectable.normalize(&mut self.tree);
        self.selectable.mark_bounds(&mut self.tree)?;
        tracing::debug!(target: "scrivet::edit", removed, blocks = blocks.len(), "deleted selection");
        Ok(removed > 0 || blocks.len() > 1)
    }

    /// Delete backwards from the caret, or the range if there is one.
    pub fn backspace(&mut self) -> Result<bool> {
        if !self.is_collapsed() {
            return self.delete_selection();
        }
        let changed = self.delete_beside_caret(false)?;
        if changed {
            self.record(UndoAction::Coalesce, Some(UndoReason::Typing));
        }
        Ok(changed)
    }

    /// Delete forwards from the caret, or the range if there is one.
    pub fn forward_delete(&mut self) -> Result<bool> {
        if !self.is_collapsed() {
            return self.delete_selection();
        }
        let changed = self.delete_beside_caret(true)?;
        if changed {
            self.record(UndoAction::Coalesce, Some(UndoReason::Typing));
        }
        Ok(changed)
    }

    fn delete_beside_caret(&mut self, forward: bool) -> Result<bool> {
        let caret = self.caret()?;
        let tree = &mut self.tree;
        let block = block_of(tree, caret).ok_or(EditorError::OutsideRoot(caret))?;
        let neighbour = if forward {
            next_leaf(tree, caret, Some(block), is_deletable)
        } else {
            previous_leaf(tree, caret, Some(block), is_deletable)
        };

        match neighbour {
            Some(leaf) => {
                let annotation = tree.closest(leaf, |t, n| t.has_class(n, NOT_EDITABLE));
                if let Some(annotation) = annotation {
                    tree.remove(annotation);
                } else if let Some(text) = tree.text(leaf).filter(|t| grapheme::count(t) > 1) {
                    let rest = if forward {
                        grapheme::without_first(text)
                    } else {
                        grapheme::without_last(text)
                    };
                    let rest = rest.to_owned();
                    tree.set_text(leaf, rest);
                } else {
                    let top = top_single_parent_ancestor(tree, leaf, below_block);
                    tree.remove(top);
                }
                self.lift_caret();
            }
            None => {
                let other = if forward {
                    tree.next_sibling(block)
                } else {
                    tree.previous_sibling(block)
                };
                let Some(other) = other else {
                    return Ok(false);
                };
                // The later block always folds into the earlier one.
                let (into, from) = if forward { (block, other) } else { (other, block) };
                tree.move_children(from, into, false);
                tree.remove(from);
                tracing::debug!(target: "scrivet::edit", %into, "merged blocks");
            }
        }

        self.selectable.normalize(&mut self.tree);
        self.selectable.mark_bounds(&mut self.tree)?;
        Ok(true)
    }

    /// Move the caret out of inline elements it is the only content of,
    /// dropping them.
    fn lift_caret(&mut self) {
        let Ok(caret) = self.caret() else {
            return;
        };
        let tree = &mut self.tree;
        while let Some(parent) = tree.parent(caret) {
            if tree.is_block(parent) || parent == tree.root() || tree.children(parent).len() != 1 {
                break;
            }
            tree.insert_before(parent, caret);
            tree.remove(parent);
        }
    }

    // === Splitting ===

    /// Split the caret's block in two, deleting any range first. The caret
    /// ends at the start of the trailing block.
    pub fn split_block_at_caret(&mut self) -> Result<bool> {
        if !self.is_collapsed() {
            self.delete_range()?;
        }
        self.split_at_caret()?;
        self.record(UndoAction::New, Some(UndoReason::Command));
        Ok(true)
    }

    pub(crate) fn split_at_caret(&mut self) -> Result<()> {
        self.selectable.collapse(&mut self.tree)?;
        let caret = self.caret()?;
        let tree = &mut self.tree;
        let root = tree.root();
        let block = block_of(tree, caret).ok_or(EditorError::OutsideRoot(caret))?;

        let leaves = leaf_nodes(tree, block);
        let idx = leaves
            .iter()
            .position(|l| *l == caret)
            .ok_or(EditorError::Unreachable(caret))?;
        let clone = tree.deep_clone(block);
        let clone_leaves = leaf_nodes(tree, clone);
        if clone_leaves.len() != leaves.len() {
            tracing::warn!(target: "scrivet::edit", %block, "block clone does not match original");
            return Err(EditorError::CloneMismatch {
                original: leaves.len(),
                clone: clone_leaves.len(),
            });
        }

        // Never climb into the block itself, attached or not.
        let inside = |t: &Tree, n: NodeId| t.parent(n).is_some_and(|p| p != root);
        for (i, (leaf, cloned)) in leaves.iter().zip(&clone_leaves).enumerate() {
            let (remove, keep_block) = if i < idx { (*leaf, block) } else { (*cloned, clone) };
            if remove == keep_block || !tree.is_ancestor(keep_block, remove) {
                continue;
            }
            let top = top_single_parent_ancestor(tree, remove, inside);
            if top != keep_block {
                tree.remove(top);
            }
        }
        tree.insert_before(block, clone);

        self.selectable.normalize(&mut self.tree);
        self.selectable.mark_bounds(&mut self.tree)?;
        tracing::debug!(target: "scrivet::edit", at = idx, "split block");
        Ok(())
    }

    // === Caret movement ===

    /// Where `marker` sits as a block index and character offset.
    pub fn position_of(&self, marker: NodeId) -> Option<TextPosition> {
        let tree = &self.tree;
        let block = block_of(tree, marker)?;
        let index = tree.index_in_parent(block)?;
        let mut offset = 0;
        for leaf in leaf_nodes(tree, block) {
            if leaf == marker {
                return Some(TextPosition::new(index, offset));
            }
            if leaf != block && !tree.is_marker(leaf) {
                offset += tree.text(leaf).map_or(1, grapheme::count);
            }
        }
        None
    }

    pub fn caret_position(&self) -> Option<TextPosition> {
        self.caret().ok().and_then(|c| self.position_of(c))
    }

    fn block_clusters(&self, index: usize) -> Vec<&str> {
        let tree = &self.tree;
        let Some(&block) = tree.children(tree.root()).get(index) else {
            return Vec::new();
        };
        leaf_nodes(tree, block)
            .into_iter()
            .filter(|l| *l != block && !tree.is_marker(*l))
            .flat_map(|l| match tree.text(l) {
                Some(text) => grapheme::clusters(text),
                None => vec![OBJECT_CLUSTER],
            })
            .collect()
    }

    fn step(&self, from: TextPosition, direction: Direction, by_word: bool) -> TextPosition {
        let blocks = self.tree.children(self.tree.root()).len();
        let clusters = self.block_clusters(from.block);
        let len = clusters.len();
        let TextPosition { block, offset } = from;
        match direction {
            Direction::Left if offset > 0 => {
                let offset = if by_word { word_left(&clusters, offset) } else { offset - 1 };
                TextPosition::new(block, offset)
            }
            Direction::Left if block > 0 => {
                TextPosition::new(block - 1, self.block_clusters(block - 1).len())
            }
            Direction::Right if offset < len => {
                let offset = if by_word { word_right(&clusters, offset) } else { offset + 1 };
                TextPosition::new(block, offset)
            }
            Direction::Right if block + 1 < blocks => TextPosition::new(block + 1, 0),
            Direction::Left | Direction::Right => from,
            Direction::Up => TextPosition::new(block.saturating_sub(1), 0),
            Direction::Down if block + 1 < blocks => TextPosition::new(block + 1, 0),
            Direction::Down | Direction::End => TextPosition::new(block, len),
            Direction::Home => TextPosition::new(block, 0),
        }
    }

    /// Move the caret, or with `extend` grow the range in `direction`.
    pub fn move_caret(&mut self, direction: Direction, extend: bool, by_word: bool) -> Result<bool> {
        let caret = self.caret()?;
        let caret_pos = self
            .position_of(caret)
            .ok_or(EditorError::Unreachable(caret))?;
        let start_pos = self
            .selectable
            .start(&self.tree)
            .and_then(|s| self.position_of(s));

        if extend {
            let start_pos = start_pos.unwrap_or(caret_pos);
            let (anchor, focus) = if direction.moves_start() {
                (caret_pos, self.step(start_pos, direction, by_word))
            } else {
                (start_pos, self.step(caret_pos, direction, by_word))
            };
            self.select(anchor, focus)?;
            return Ok(true);
        }

        if start_pos.is_some() {
            if direction.moves_start() {
                self.selectable.collapse_to_start(&mut self.tree)?;
            } else {
                self.selectable.collapse(&mut self.tree)?;
            }
            if matches!(direction, Direction::Left | Direction::Right) {
                self.selection_changed();
                return Ok(true);
            }
        }

        let from = self
            .caret()
            .ok()
            .and_then(|c| self.position_of(c))
            .unwrap_or(caret_pos);
        let to = self.step(from, direction, by_word);
        self.set_caret(to)?;
        Ok(to != from)
    }

    // === Clipboard ===

    /// Selected text, one line per block the range touches.
    pub fn copy_text(&self) -> String {
        let tree = &self.tree;
        let bounds = self
            .selectable
            .start(tree)
            .zip(self.caret().ok())
            .and_then(|(start, caret)| Some((self.position_of(start)?, self.position_of(caret)?)));
        let Some((start, caret)) = bounds else {
            return String::new();
        };
        let from = start.block.min(caret.block);
        let mut lines = vec![String::new(); start.block.max(caret.block) - from + 1];
        for leaf in self.selectable.selected_leaf_nodes(tree) {
            let line = block_of(tree, leaf)
                .and_then(|block| tree.index_in_parent(block))
                .and_then(|index| index.checked_sub(from))
                .and_then(|index| lines.get_mut(index));
            if let (Some(line), Some(text)) = (line, tree.text(leaf)) {
                line.push_str(text);
            }
        }
        lines.join("\n")
    }

    /// Copy the selected text and delete it.
    pub fn cut_text(&mut self) -> Result<String> {
        let text = self.copy_text();
        self.delete_selection()?;
        Ok(text)
    }

    /// Insert plain text at the caret, one block per line.
    pub fn paste_text(&mut self, text: &str) -> Result<bool> {
        if text.is_empty() {
            return Ok(false);
        }
        if !self.is_collapsed() {
            self.delete_range()?;
        }
        let text = text.replace("\r\n", "\n");
        for (idx, line) in text.split('\n').enumerate() {
            if idx > 0 {
                self.split_at_caret()?;
            }
            if !line.is_empty() {
                self.insert_at_caret(line)?;
            }
        }
        self.selectable.mark_bounds(&mut self.tree)?;
        self.record(UndoAction::New, Some(UndoReason::Command));
        Ok(true)
    }

    // === Annotations ===

    /// Insert an annotation using the configured templates.
    pub fn annotate(&mut self, kind: &str) -> Result<bool> {
        let template = self.config().template(kind);
        self.insert_annotation(kind, template)
    }

    /// Insert an annotation with templates from `templates`.
    pub fn annotate_with(&mut self, kind: &str, templates: &dyn AnnotationTemplates) -> Result<bool> {
        let template = templates.template(kind);
        self.insert_annotation(kind, template)
    }

    fn insert_annotation(&mut self, kind: &str, template: Option<String>) -> Result<bool> {
        let Some(template) = template else {
            tracing::debug!(target: "scrivet::edit", kind, "annotation cancelled");
            return Ok(false);
        };
        let caret = self.caret()?;
        let tree = &mut self.tree;

        let scratch = tree.create_element("span");
        let nodes = markup::parse_into(tree, scratch, &template)?;
        let annotation = tree.create_element("span");
        for class in [ANNOTATION, NO_SPANIFY_CLASS, NOT_SELECTABLE, NOT_EDITABLE] {
            tree.add_class(annotation, class);
        }
        tree.set_attr(annotation, ANNOTATION_KIND_ATTR, kind);
        for node in nodes {
            if tree.is_marker(node) {
                continue;
            }
            if tree.is_text(node) {
                let body = tree.create_element("span");
                tree.add_class(body, ANNOTATION_BODY);
                tree.append_child(body, node);
                tree.append_child(annotation, body);
            } else {
                tree.add_class(node, ANNOTATION_BODY);
                tree.append_child(annotation, node);
            }
        }
        tree.remove(scratch);
        tree.insert_after(caret, annotation);

        self.selectable.normalize(&mut self.tree);
        self.selectable.mark_bounds(&mut self.tree)?;
        self.record(UndoAction::New, Some(UndoReason::Command));
        tracing::debug!(target: "scrivet::edit", kind, %annotation, "annotated");
        Ok(true)
    }

    /// Drop the body of the annotation containing `node`. Whatever else the
    /// annotation held stays in place as ordinary content.
    pub fn remove_annotation(&mut self, node: NodeId) -> Result<bool> {
        let tree = &mut self.tree;
        if !tree.is_connected(node) {
            return Err(EditorError::Unreachable(node));
        }
        let Some(annotation) = tree.closest(node, |t, n| t.has_class(n, ANNOTATION)) else {
            return Ok(false);
        };
        for child in tree.children(annotation).to_vec() {
            if tree.has_class(child, ANNOTATION_BODY) {
                tree.remove(child);
            }
        }
        if tree.children(annotation).is_empty() {
            tree.remove(annotation);
        } else {
            tree.dissolve(annotation);
        }

        self.selectable.normalize(&mut self.tree);
        self.selectable.mark_bounds(&mut self.tree)?;
        self.record(UndoAction::New, Some(UndoReason::Command));
        Ok(true)
    }
}
