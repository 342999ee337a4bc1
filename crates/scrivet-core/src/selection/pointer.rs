//! Pointer gestures: press, drag and release.
//!
//! Hit-testing needs layout, which only the host has. The host reports the
//! node under the pointer and answers geometry queries through [`Geometry`].

use super::spanify::{self, CHAR_CLASS};
use super::{SelectMode, Selectable, Side};
use crate::error::{EditorError, Result};
use crate::traverse::{block_of, leaf_nodes};
use crate::tree::{NodeId, Tree};

/// Axis-aligned box in host coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Layout queries answered by the host.
pub trait Geometry {
    /// Bounding box of a rendered node, if it is laid out.
    fn bounding_rect(&self, tree: &Tree, node: NodeId) -> Option<Rect>;
}

/// Which half of `rect` the x coordinate falls in.
pub fn side_of(rect: &Rect, x: f64) -> Side {
    if x - rect.left < rect.width / 2.0 {
        Side::Before
    } else {
        Side::After
    }
}

/// A pointer event after host-side hit-testing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerInput {
    /// Node under the pointer.
    pub target: NodeId,
    pub x: f64,
    pub y: f64,
    /// 1 for a single click, 2 for double, and so on.
    pub click_count: u32,
    pub shift: bool,
}

impl PointerInput {
    pub fn new(target: NodeId, x: f64, y: f64) -> Self {
        Self {
            target,
            x,
            y,
            click_count: 1,
            shift: false,
        }
    }
}

impl Selectable {
    /// Character spans, leaves and empty blocks can take a marker.
    fn hit_target(tree: &Tree, target: NodeId) -> Option<NodeId> {
        if target == tree.root() || tree.is_marker(target) {
            return None;
        }
        if tree.has_class(target, CHAR_CLASS) || tree.is_leaf(target) {
            return Some(target);
        }
        let empty_block = tree.is_block(target)
            && leaf_nodes(tree, target)
                .iter()
                .all(|l| tree.is_marker(*l) || tree.is_empty_text(*l));
        empty_block.then_some(target)
    }

    fn side_for(tree: &Tree, geometry: &dyn Geometry, node: NodeId, x: f64) -> Side {
        geometry
            .bounding_rect(tree, node)
            .map(|rect| side_of(&rect, x))
            .unwrap_or_default()
    }

    fn check_pointer_target(tree: &Tree, target: NodeId) -> Result<bool> {
        if !tree.is_connected(target) {
            return Err(EditorError::Unreachable(target));
        }
        Ok(!Self::is_not_selectable(tree, target))
    }

    /// Start, extend or re-mode a selection. Returns whether the selection
    /// was touched.
    pub fn pointer_down(
        &mut self,
        tree: &mut Tree,
        geometry: &dyn Geometry,
        input: &PointerInput,
    ) -> Result<bool> {
        if !Self::check_pointer_target(tree, input.target)? {
            return Ok(false);
        }
        let Some(hit) = Self::hit_target(tree, input.target) else {
            return Ok(false);
        };
        self.selecting = input.click_count.max(1);
        let side = Self::side_for(tree, geometry, hit, input.x);
        let mode = SelectMode::from_click_count(self.selecting);

        let has_caret = self.caret(tree).is_some();
        if (input.shift || self.selecting > 1) && has_caret {
            self.extend_selection(tree, hit, side, mode)?;
        } else {
            self.begin_selection(tree, hit, side)?;
            if self.selecting > 1 {
                self.extend_marked(tree, mode)?;
            }
        }
        Ok(true)
    }

    /// Spanify the hovered block and, mid-gesture, drag the caret along.
    /// Returns whether the tree changed.
    pub fn pointer_move(
        &mut self,
        tree: &mut Tree,
        geometry: &dyn Geometry,
        input: &PointerInput,
    ) -> Result<bool> {
        if !Self::check_pointer_target(tree, input.target)? {
            return Ok(false);
        }
        let mut changed = false;
        if let Some(block) = block_of(tree, input.target) {
            changed |= spanify::spanify(tree, block);
        }
        if self.selecting == 0 || !tree.is_connected(input.target) {
            return Ok(changed);
        }
        if let Some(hit) = Self::hit_target(tree, input.target) {
            let side = Self::side_for(tree, geometry, hit, input.x);
            let mode = SelectMode::from_click_count(self.selecting);
            self.extend_selection(tree, hit, side, mode)?;
            changed = true;
        }
        Ok(changed)
    }

    /// End the gesture: final extend, despanify, re-mark on plain text.
    /// Returns whether a selection-changed notification is due.
    pub fn pointer_up(
        &mut self,
        tree: &mut Tree,
        _geometry: &dyn Geometry,
        input: &PointerInput,
    ) -> Result<bool> {
        if !Self::check_pointer_target(tree, input.target)? {
            return Ok(false);
        }
        if self.caret(tree).is_none() {
            self.selecting = 0;
            return Ok(false);
        }
        if self.selecting > 0 {
            let mode = SelectMode::from_click_count(self.selecting);
            self.extend_marked(tree, mode)?;
            self.selecting = 0;
        }
        let root = tree.root();
        spanify::despanify(tree, root);
        self.mark_bounds(tree)?;
        tracing::debug!(target: "scrivet::selection", collapsed = self.is_collapsed(tree), "pointer gesture ended");
        Ok(true)
    }
}
