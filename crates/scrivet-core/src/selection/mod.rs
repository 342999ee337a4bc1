//! Selection engine.
//!
//! The selection lives in the tree itself: a `Caret` marker is the insertion
//! point, and a `Start` marker before it turns the selection into a range.
//! Every change re-derives the annotation cache (`selected` on leaves or
//! their single-text wrappers, `selected-block`, `first-block` and
//! `last-block` on blocks) from the marker positions.

mod pointer;
pub mod spanify;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};

use crate::error::{EditorError, Result};
use crate::grapheme;
use crate::traverse::{
    any_leaf, block_of, first_leaf, is_before, last_leaf, leaf_nodes, leaf_nodes_between,
    next_leaf, previous_leaf,
};
use crate::tree::{Bound, NodeId, Tree, is_void_tag};

pub use pointer::{Geometry, PointerInput, Rect, side_of};
pub use spanify::{despanify, spanify};

pub const SELECTED: &str = "selected";
pub const SELECTED_BLOCK: &str = "selected-block";
pub const FIRST_BLOCK: &str = "first-block";
pub const LAST_BLOCK: &str = "last-block";
pub const NOT_SELECTABLE: &str = "not-selectable";

/// Attribute carried by the root while an engine is attached.
pub const ATTACHED_ATTR: &str = "data-selectable";

/// Which side of a leaf a marker goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum Side {
    #[default]
    Before,
    After,
}

/// Granularity of a pointer-driven selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum SelectMode {
    #[default]
    Character,
    Word,
    Block,
}

impl SelectMode {
    /// Single click selects characters, double click words, anything more
    /// whole blocks.
    pub fn from_click_count(count: u32) -> Self {
        match count {
            0 | 1 => Self::Character,
            2 => Self::Word,
            _ => Self::Block,
        }
    }
}

/// Block index plus character offset within the block's text.
///
/// Offsets count grapheme clusters. Void elements count as one character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextPosition {
    pub block: usize,
    pub offset: usize,
}

impl TextPosition {
    pub fn new(block: usize, offset: usize) -> Self {
        Self { block, offset }
    }
}

/// Per-root selection state.
///
/// The engine holds no node references between calls; markers are looked up
/// in the tree each time.
#[derive(Debug, Default)]
pub struct Selectable {
    /// Click count of the pointer gesture in progress, 0 when idle.
    selecting: u32,
}

impl Selectable {
    /// Attach to the tree's root and normalize its content.
    pub fn attach(tree: &mut Tree) -> Result<Self> {
        let root = tree.root();
        if tree.attr(root, ATTACHED_ATTR).is_some() {
            return Err(EditorError::AlreadyAttached);
        }
        tree.set_attr(root, ATTACHED_ATTR, "");
        let selectable = Self::default();
        selectable.normalize(tree);
        Ok(selectable)
    }

    /// Release the root so another engine may attach.
    pub fn detach(self, tree: &mut Tree) {
        let root = tree.root();
        tree.remove_attr(root, ATTACHED_ATTR);
    }

    pub fn caret(&self, tree: &Tree) -> Option<NodeId> {
        tree.find_marker(Bound::Caret)
    }

    pub fn start(&self, tree: &Tree) -> Option<NodeId> {
        tree.find_marker(Bound::Start)
    }

    /// No range: either a lone caret or no markers at all.
    pub fn is_collapsed(&self, tree: &Tree) -> bool {
        self.start(tree).is_none()
    }

    /// A pointer gesture is in progress.
    pub fn is_selecting(&self) -> bool {
        self.selecting > 0
    }

    fn check_target(tree: &Tree, node: NodeId) -> Result<()> {
        if !tree.is_connected(node) {
            return Err(EditorError::Unreachable(node));
        }
        if node == tree.root() {
            return Err(EditorError::OutsideRoot(node));
        }
        Ok(())
    }

    fn is_not_selectable(tree: &Tree, node: NodeId) -> bool {
        tree.closest(node, |t, n| t.has_class(n, NOT_SELECTABLE))
            .is_some()
    }

    fn is_selectable_leaf(tree: &Tree, node: NodeId) -> bool {
        !tree.is_marker(node) && !Self::is_not_selectable(tree, node)
    }

    /// Move (or create) the `bound` marker next to `target`. Blocks receive
    /// the marker as their first or last child.
    fn place_marker(tree: &mut Tree, bound: Bound, target: NodeId, side: Side) -> NodeId {
        let marker = tree
            .find_marker(bound)
            .unwrap_or_else(|| tree.create_marker(bound));
        if marker == target {
            return marker;
        }
        match (tree.is_block(target), side) {
            (true, Side::Before) => tree.prepend_child(target, marker),
            (true, Side::After) => tree.append_child(target, marker),
            (false, Side::Before) => tree.insert_before(target, marker),
            (false, Side::After) => tree.insert_after(target, marker),
        }
        marker
    }

    /// Collapse any range and put the caret beside `anchor`.
    pub fn begin_selection(&mut self, tree: &mut Tree, anchor: NodeId, side: Side) -> Result<()> {
        Self::check_target(tree, anchor)?;
        if Self::is_not_selectable(tree, anchor) {
            tracing::trace!(target: "scrivet::selection", %anchor, "ignoring non-selectable anchor");
            return Ok(());
        }
        if let Some(start) = self.start(tree) {
            tree.remove(start);
        }
        Self::place_marker(tree, Bound::Caret, anchor, side);
        tracing::debug!(target: "scrivet::selection", %anchor, ?side, "begin selection");
        self.mark_bounds(tree)
    }

    /// Keep the anchor, move the caret beside `target` and re-mark.
    pub fn extend_selection(
        &mut self,
        tree: &mut Tree,
        target: NodeId,
        side: Side,
        mode: SelectMode,
    ) -> Result<()> {
        Self::check_target(tree, target)?;
        if Self::is_not_selectable(tree, target) {
            return Ok(());
        }
        let caret = self
            .caret(tree)
            .ok_or(EditorError::MissingBoundary("caret"))?;
        if self.start(tree).is_none() {
            let start = tree.create_marker(Bound::Start);
            tree.insert_before(caret, start);
        }
        Self::place_marker(tree, Bound::Caret, target, side);
        self.extend_marked(tree, mode)
    }

    /// Re-mark from the current markers, snapping the endpoints per `mode`.
    pub fn extend_marked(&self, tree: &mut Tree, mode: SelectMode) -> Result<()> {
        let caret = self
            .caret(tree)
            .ok_or(EditorError::MissingBoundary("caret"))?;
        let start = self.start(tree).unwrap_or(caret);
        let (first, last) = match mode {
            SelectMode::Character => (start, caret),
            SelectMode::Word => {
                let word = |node: NodeId| {
                    tree.closest(node, |t, n| t.has_class(n, spanify::WORD_CLASS))
                        .unwrap_or(node)
                };
                (word(start), word(caret))
            }
            SelectMode::Block => (
                block_of(tree, start).unwrap_or(start),
                block_of(tree, caret).unwrap_or(caret),
            ),
        };
        tracing::trace!(target: "scrivet::selection", ?mode, %first, %last, "extend");
        self.mark_range(tree, first, last)
    }

    /// Drop the range, keeping the caret where it is.
    pub fn collapse(&self, tree: &mut Tree) -> Result<()> {
        if let Some(start) = self.start(tree) {
            tree.remove(start);
        }
        self.mark_bounds(tree)
    }

    /// Collapse to the start of the range instead of its end.
    pub fn collapse_to_start(&self, tree: &mut Tree) -> Result<()> {
        if let (Some(start), Some(caret)) = (self.start(tree), self.caret(tree)) {
            tree.replace_with(start, caret);
            tree.remove(start);
        }
        self.mark_bounds(tree)
    }

    /// Annotate everything between `first` and `last`.
    ///
    /// Marker endpoints are exclusive; element endpoints contribute all of
    /// their leaves. Afterwards the markers bracket the annotated nodes.
    /// When nothing was annotated the range collapses to the caret, unless
    /// the endpoints sit in different blocks: then the range holds just the
    /// block boundary and keeps its start.
    pub fn mark_range(&self, tree: &mut Tree, first: NodeId, last: NodeId) -> Result<()> {
        Self::check_target(tree, first)?;
        Self::check_target(tree, last)?;
        let (first, last) = if is_before(tree, last, first) {
            (last, first)
        } else {
            (first, last)
        };

        self.clear_marks(tree);

        let first_block = block_of(tree, first).ok_or(EditorError::OutsideRoot(first))?;
        let last_block = block_of(tree, last).ok_or(EditorError::OutsideRoot(last))?;
        let root = tree.root();
        let blocks = tree.children(root).to_vec();
        let from = tree
            .index_in_parent(first_block)
            .ok_or(EditorError::Unreachable(first_block))?;
        let to = tree
            .index_in_parent(last_block)
            .ok_or(EditorError::Unreachable(last_block))?;

        for (idx, block) in blocks.iter().enumerate() {
            if (from..=to).contains(&idx) {
                tree.add_class(*block, SELECTED_BLOCK);
            } else {
                spanify::despanify(tree, *block);
            }
        }
        tree.add_class(first_block, FIRST_BLOCK);
        tree.add_class(last_block, LAST_BLOCK);

        let start_leaf = if tree.is_marker(first) {
            next_leaf(tree, first, None, any_leaf)
        } else {
            Some(first_leaf(tree, first))
        };
        let end_leaf = if tree.is_marker(last) {
            previous_leaf(tree, last, None, any_leaf)
        } else {
            Some(last_leaf(tree, last))
        };

        let mut marked = 0usize;
        if let (Some(start_leaf), Some(end_leaf)) = (start_leaf, end_leaf) {
            let leaves: Vec<NodeId> = blocks[from..=to]
                .iter()
                .flat_map(|b| leaf_nodes(tree, *b))
                .collect();
            let i = leaves.iter().position(|l| *l == start_leaf);
            let j = leaves.iter().position(|l| *l == end_leaf);
            if let (Some(i), Some(j)) = (i, j) {
                if i <= j {
                    for leaf in &leaves[i..=j] {
                        if Self::is_selectable_leaf(tree, *leaf) {
                            Self::mark_node(tree, *leaf);
                            marked += 1;
                        }
                    }
                }
            }
        }

        if marked > 0 {
            self.reset_bounds(tree);
        } else if let Some(start) = self.start(tree) {
            if first_block == last_block {
                tree.remove(start);
            } else {
                Self::order_bounds(tree, start);
            }
        }
        tree.normalize(root);
        tracing::trace!(target: "scrivet::selection", marked, from, to, "marked range");
        Ok(())
    }

    fn mark_node(tree: &mut Tree, leaf: NodeId) {
        if tree.is_text(leaf) {
            let root = tree.root();
            match tree.parent(leaf) {
                Some(parent)
                    if parent != root
                        && !tree.is_block(parent)
                        && tree.children(parent).len() == 1 =>
                {
                    tree.add_class(parent, SELECTED);
                }
                _ => {
                    let span = tree.create_element("span");
                    tree.add_class(span, SELECTED);
                    tree.wrap(leaf, span);
                }
            }
        } else if tree.is_element(leaf) {
            tree.add_class(leaf, SELECTED);
        }
    }

    /// `mark_range` over the current markers.
    pub fn mark_bounds(&self, tree: &mut Tree) -> Result<()> {
        let caret = self
            .caret(tree)
            .ok_or(EditorError::MissingBoundary("caret"))?;
        let start = self.start(tree).unwrap_or(caret);
        self.mark_range(tree, start, caret)
    }

    /// Move the markers to bracket the `selected` annotation. Without any
    /// annotation the markers stay put. A marker already outside the
    /// annotation with nothing selectable in between keeps its place, so a
    /// range that starts at the end of a block still spans the boundary.
    pub fn reset_bounds(&self, tree: &mut Tree) {
        let selected = tree.with_class(SELECTED);
        let (Some(&first), Some(&last)) = (selected.first(), selected.last()) else {
            return;
        };
        match self.start(tree) {
            Some(start) if Self::hugs(tree, start, first) => {}
            start => {
                let start = start.unwrap_or_else(|| tree.create_marker(Bound::Start));
                tree.insert_before(first, start);
            }
        }
        match self.caret(tree) {
            Some(caret) if Self::hugs(tree, last, caret) => {}
            caret => {
                let caret = caret.unwrap_or_else(|| tree.create_marker(Bound::Caret));
                tree.insert_after(last, caret);
            }
        }
    }

    /// `before` precedes `after` outside of it, with no selectable content
    /// between the two.
    fn hugs(tree: &Tree, before: NodeId, after: NodeId) -> bool {
        let content = |leaf: &NodeId| !tree.is_empty_text(*leaf) && Self::is_selectable_leaf(tree, *leaf);
        is_before(tree, before, after)
            && !tree.is_ancestor(before, after)
            && !leaf_nodes_between(tree, before, after).iter().any(content)
    }

    /// Swap the markers when the start ended up after the caret.
    fn order_bounds(tree: &mut Tree, start: NodeId) {
        let Some(caret) = tree.find_marker(Bound::Caret) else {
            return;
        };
        if is_before(tree, caret, start) {
            tree.swap_positions(start, caret);
        }
    }

    /// Remove both markers from the tree.
    pub fn remove_bounds(&self, tree: &mut Tree) {
        for bound in [Bound::Start, Bound::Caret] {
            if let Some(marker) = tree.find_marker(bound) {
                tree.remove(marker);
            }
        }
    }

    /// Strip the annotation without merging text.
    fn clear_marks(&self, tree: &mut Tree) {
        for node in tree.with_class(SELECTED) {
            tree.remove_class(node, SELECTED);
            let bare_span = tree
                .element(node)
                .is_some_and(|e| e.tag == "span" && e.is_bare());
            if bare_span {
                tree.dissolve(node);
            }
        }
        for class in [SELECTED_BLOCK, FIRST_BLOCK, LAST_BLOCK] {
            for node in tree.with_class(class) {
                tree.remove_class(node, class);
            }
        }
    }

    /// Strip the selection annotation and merge the freed text.
    pub fn unmark(&self, tree: &mut Tree) {
        self.clear_marks(tree);
        let root = tree.root();
        tree.normalize(root);
    }

    /// Selectable leaves strictly between the markers.
    pub fn selected_leaf_nodes(&self, tree: &Tree) -> Vec<NodeId> {
        let (Some(start), Some(caret)) = (self.start(tree), self.caret(tree)) else {
            return Vec::new();
        };
        leaf_nodes_between(tree, start, caret)
            .into_iter()
            .filter(|n| Self::is_selectable_leaf(tree, *n))
            .collect()
    }

    /// Blocks carrying `selected-block`, in order.
    pub fn selected_blocks(&self, tree: &Tree) -> Vec<NodeId> {
        tree.children(tree.root())
            .iter()
            .copied()
            .filter(|b| tree.has_class(*b, SELECTED_BLOCK))
            .collect()
    }

    /// Restore the structural invariants without moving markers: no
    /// whitespace or stray leaves at root level, no adjacent text nodes, and
    /// a placeholder text in every block without content.
    pub fn normalize(&self, tree: &mut Tree) {
        let root = tree.root();
        for child in tree.children(root).to_vec() {
            if tree.text(child).is_some_and(|t| t.trim().is_empty()) {
                tree.remove(child);
            }
        }

        let mut loft: Option<NodeId> = None;
        for child in tree.children(root).to_vec() {
            let stray = tree.is_text(child)
                || tree.is_marker(child)
                || tree.tag(child).is_some_and(is_void_tag);
            if !stray {
                loft = None;
                continue;
            }
            let block = match loft {
                Some(block) => block,
                None => {
                    let block = tree.create_element("p");
                    tree.insert_before(child, block);
                    loft = Some(block);
                    block
                }
            };
            tree.append_child(block, child);
        }

        tree.normalize(root);

        for block in tree.children(root).to_vec() {
            let empty = leaf_nodes(tree, block)
                .iter()
                .all(|leaf| tree.is_marker(*leaf) || *leaf == block);
            if empty {
                let placeholder = tree.create_text("");
                tree.prepend_child(block, placeholder);
            }
        }
    }

    /// Find the leaf and side addressed by `position`, splitting a text node
    /// when the offset falls inside it.
    pub fn resolve_position(&self, tree: &mut Tree, position: TextPosition) -> Result<(NodeId, Side)> {
        let invalid = || EditorError::InvalidPosition {
            block: position.block,
            offset: position.offset,
        };
        let block = tree
            .children(tree.root())
            .get(position.block)
            .copied()
            .ok_or_else(invalid)?;
        let leaves: Vec<NodeId> = leaf_nodes(tree, block)
            .into_iter()
            .filter(|n| *n != block && !tree.is_marker(*n))
            .collect();
        let Some(&first) = leaves.first() else {
            return if position.offset == 0 {
                Ok((block, Side::Before))
            } else {
                Err(invalid())
            };
        };
        if position.offset == 0 {
            return Ok((first, Side::Before));
        }

        let mut consumed = 0;
        for leaf in leaves {
            let len = tree.text(leaf).map_or(1, grapheme::count);
            if position.offset <= consumed + len {
                let local = position.offset - consumed;
                if local < len {
                    tree.split_text(leaf, local);
                }
                return Ok((leaf, Side::After));
            }
            consumed += len;
        }
        Err(invalid())
    }
}
