//! Arena-backed document tree.
//!
//! The engines operate on a DOM-like tree of elements, text nodes and
//! zero-width boundary markers. Nodes live in a flat arena and are addressed
//! by [`NodeId`]. A detached node keeps its slot so it can be re-inserted;
//! [`Tree::remove`] hands the slots of a discarded subtree back for reuse.
//!
//! The root node is the editing root. Its direct children are *blocks*.

use std::cmp::Ordering;
use std::fmt;

use smol_str::SmolStr;

/// Handle to a node in a [`Tree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Arena index of this node.
    pub fn index(self) -> usize {
        self.0
    }

    /// Rebuild a handle from an arena index (e.g. one round-tripped through
    /// a `data-node-id` attribute). The handle may be stale or name a reused
    /// slot; check it with [`Tree::is_connected`] before use.
    pub fn from_index(index: usize) -> Self {
        Self(index)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which selection boundary a marker node represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Bound {
    /// Start of a non-collapsed range.
    Start,
    /// End of a range, or the insertion point when collapsed.
    Caret,
}

/// Elements that never have children.
pub const VOID_TAGS: &[&str] = &["br", "hr", "img", "input", "wbr"];

/// Check whether `tag` is a void (childless) element.
pub fn is_void_tag(tag: &str) -> bool {
    VOID_TAGS.iter().any(|t| t.eq_ignore_ascii_case(tag))
}

/// Element payload: tag, class list, inline style and other attributes.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Element {
    pub tag: SmolStr,
    pub classes: Vec<SmolStr>,
    /// Inline style declarations in insertion order.
    pub style: Vec<(SmolStr, String)>,
    pub attrs: Vec<(SmolStr, String)>,
}

impl Element {
    pub fn new(tag: impl Into<SmolStr>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// No classes, no style, no attributes.
    pub fn is_bare(&self) -> bool {
        self.classes.is_empty() && self.style.is_empty() && self.attrs.is_empty()
    }

    pub fn style(&self, property: &str) -> Option<&str> {
        self.style
            .iter()
            .find(|(p, _)| p == property)
            .map(|(_, v)| v.as_str())
    }

    /// Set a style declaration. An empty value removes it.
    pub fn set_style(&mut self, property: &str, value: &str) {
        if value.is_empty() {
            self.style.retain(|(p, _)| p != property);
            return;
        }
        match self.style.iter_mut().find(|(p, _)| p == property) {
            Some((_, v)) => *v = value.to_string(),
            None => self.style.push((property.into(), value.to_string())),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// What a node is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Element(Element),
    Text(String),
    Marker(Bound),
}

#[derive(Clone, Debug)]
struct Slot {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Cleared while the slot sits on the free list.
    live: bool,
}

impl Slot {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            live: true,
        }
    }
}

/// The document tree. Slot 0 is always the editing root.
#[derive(Clone, Debug)]
pub struct Tree {
    slots: Vec<Slot>,
    /// Removed slots, reissued by [`Tree::create`] before the arena grows.
    free: Vec<NodeId>,
    root: NodeId,
}

impl Tree {
    /// Create an empty tree whose root is a `root_tag` element.
    pub fn new(root_tag: impl Into<SmolStr>) -> Self {
        Self::with_root(Element::new(root_tag))
    }

    /// Create an empty tree with the given root element.
    pub fn with_root(root: Element) -> Self {
        Self {
            slots: vec![Slot::new(NodeKind::Element(root))],
            free: Vec::new(),
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Drop every node except the root. All previously issued ids become stale.
    pub fn clear(&mut self) {
        self.slots.truncate(1);
        self.slots[0].children.clear();
        self.free.clear();
    }

    /// Number of arena slots, detached and free ones included.
    pub fn arena_len(&self) -> usize {
        self.slots.len()
    }

    /// Slots currently holding a node, attached or not.
    pub fn live_len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    fn slot(&self, id: NodeId) -> &Slot {
        &self.slots[id.index()]
    }

    fn slot_mut(&mut self, id: NodeId) -> &mut Slot {
        &mut self.slots[id.index()]
    }

    // === Creation ===

    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.slots[id.index()] = Slot::new(kind);
            return id;
        }
        let id = NodeId(self.slots.len());
        self.slots.push(Slot::new(kind));
        id
    }

    pub fn create_element(&mut self, tag: impl Into<SmolStr>) -> NodeId {
        self.create(NodeKind::Element(Element::new(tag)))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.create(NodeKind::Text(text.into()))
    }

    pub fn create_marker(&mut self, bound: Bound) -> NodeId {
        self.create(NodeKind::Marker(bound))
    }

    // === Inspection ===

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.slot(id).kind
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.slot(id).kind {
            NodeKind::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.slot_mut(id).kind {
            NodeKind::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag.as_str())
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.slot(id).kind {
            NodeKind::Text(t) => Some(t.as_str()),
            _ => None,
        }
    }

    /// Replace the content of a text node. No-op for other kinds.
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        if let NodeKind::Text(t) = &mut self.slot_mut(id).kind {
            *t = text.into();
        }
    }

    pub fn marker(&self, id: NodeId) -> Option<Bound> {
        match self.slot(id).kind {
            NodeKind::Marker(b) => Some(b),
            _ => None,
        }
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.slot(id).kind, NodeKind::Text(_))
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.slot(id).kind, NodeKind::Element(_))
    }

    pub fn is_marker(&self, id: NodeId) -> bool {
        matches!(self.slot(id).kind, NodeKind::Marker(_))
    }

    /// Text node with no characters.
    pub fn is_empty_text(&self, id: NodeId) -> bool {
        self.text(id).is_some_and(str::is_empty)
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.slot(id).children.is_empty()
    }

    /// Direct child of the root.
    pub fn is_block(&self, id: NodeId) -> bool {
        self.parent(id) == Some(self.root)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.slot(id).children
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).children.first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).children.last().copied()
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.slot(parent).children.iter().position(|c| *c == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let idx = self.index_in_parent(id)?;
        self.slot(parent).children.get(idx + 1).copied()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let idx = self.index_in_parent(id)?;
        idx.checked_sub(1)
            .and_then(|i| self.slot(parent).children.get(i).copied())
    }

    /// Ancestors from the parent upwards, root included.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), |n| self.parent(*n))
    }

    /// Strict ancestry test.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).any(|a| a == ancestor)
    }

    /// Whether `id` names a live slot attached under the root.
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.slots.get(id.index()).is_some_and(|slot| slot.live)
            && (id == self.root || self.is_ancestor(self.root, id))
    }

    /// Closest inclusive ancestor satisfying `pred`.
    pub fn closest(&self, id: NodeId, pred: impl Fn(&Tree, NodeId) -> bool) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|n| pred(self, *n))
    }

    /// Preorder descendants, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Attached nodes satisfying `pred`, in document order.
    pub fn find_all(&self, pred: impl Fn(&Tree, NodeId) -> bool) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|n| pred(self, *n))
            .collect()
    }

    pub fn find_marker(&self, bound: Bound) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|n| self.marker(*n) == Some(bound))
    }

    pub fn with_class(&self, class: &str) -> Vec<NodeId> {
        self.find_all(|t, n| t.has_class(n, class))
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_string();
        }
        self.descendants(id)
            .into_iter()
            .filter_map(|n| self.text(n))
            .collect()
    }

    // === Classes, style, attributes ===

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id).is_some_and(|e| e.has_class(class))
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if let Some(e) = self.element_mut(id) {
            if !e.has_class(class) {
                e.classes.push(class.into());
            }
        }
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if let Some(e) = self.element_mut(id) {
            e.classes.retain(|c| c != class);
        }
    }

    pub fn style(&self, id: NodeId, property: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.style(property))
    }

    pub fn set_style(&mut self, id: NodeId, property: &str, value: &str) {
        if let Some(e) = self.element_mut(id) {
            e.set_style(property, value);
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.attr(name))
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let Some(e) = self.element_mut(id) {
            let value = value.into();
            match e.attrs.iter_mut().find(|(n, _)| n == name) {
                Some((_, v)) => *v = value,
                None => e.attrs.push((name.into(), value)),
            }
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(e) = self.element_mut(id) {
            e.attrs.retain(|(n, _)| n != name);
        }
    }

    // === Document order ===

    /// Child-index path from the root, or `None` when detached.
    pub fn path(&self, id: NodeId) -> Option<Vec<usize>> {
        let mut path = Vec::new();
        let mut node = id;
        while node != self.root {
            path.push(self.index_in_parent(node)?);
            node = self.parent(node)?;
        }
        path.reverse();
        Some(path)
    }

    /// Compare two nodes in document order. An ancestor sorts before its
    /// descendants. `None` when either node is detached from the root.
    pub fn compare(&self, a: NodeId, b: NodeId) -> Option<Ordering> {
        Some(self.path(a)?.cmp(&self.path(b)?))
    }

    // === Mutation ===

    /// Remove `id` from its parent. The subtree stays intact.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.slot_mut(id).parent.take() {
            self.slot_mut(parent).children.retain(|c| *c != id);
        }
    }

    /// Detach `id` and free its whole subtree. Ids into the subtree go
    /// stale and may be reissued by later [`Tree::create`] calls. The root
    /// and already freed slots are left alone.
    pub fn remove(&mut self, id: NodeId) {
        if id == self.root || !self.slot(id).live {
            return;
        }
        self.detach(id);
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            let slot = self.slot_mut(node);
            if !slot.live {
                continue;
            }
            stack.append(&mut slot.children);
            slot.parent = None;
            slot.live = false;
            slot.kind = NodeKind::Text(String::new());
            self.free.push(node);
        }
    }

    /// Replace an element with its children and free it.
    pub fn dissolve(&mut self, id: NodeId) {
        self.unwrap(id);
        if self.slot(id).parent.is_none() {
            self.remove(id);
        }
    }

    fn would_cycle(&self, parent: NodeId, child: NodeId) -> bool {
        parent == child || self.is_ancestor(child, parent)
    }

    fn insert_at(&mut self, parent: NodeId, index: usize, child: NodeId) {
        let index = index.min(self.slot(parent).children.len());
        self.slot_mut(parent).children.insert(index, child);
        self.slot_mut(child).parent = Some(parent);
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if self.would_cycle(parent, child) {
            tracing::warn!(%parent, %child, "refusing to append a node into its own subtree");
            return;
        }
        self.detach(child);
        let len = self.slot(parent).children.len();
        self.insert_at(parent, len, child);
    }

    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        if self.would_cycle(parent, child) {
            tracing::warn!(%parent, %child, "refusing to prepend a node into its own subtree");
            return;
        }
        self.detach(child);
        self.insert_at(parent, 0, child);
    }

    /// Insert `node` as the previous sibling of `reference`.
    pub fn insert_before(&mut self, reference: NodeId, node: NodeId) {
        if reference == node {
            return;
        }
        let Some(parent) = self.parent(reference) else {
            tracing::warn!(%reference, "insert_before on a detached reference");
            return;
        };
        if self.would_cycle(parent, node) {
            tracing::warn!(%parent, %node, "refusing to insert a node into its own subtree");
            return;
        }
        self.detach(node);
        if let Some(idx) = self.index_in_parent(reference) {
            self.insert_at(parent, idx, node);
        }
    }

    /// Insert `node` as the next sibling of `reference`.
    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) {
        if reference == node {
            return;
        }
        let Some(parent) = self.parent(reference) else {
            tracing::warn!(%reference, "insert_after on a detached reference");
            return;
        };
        if self.would_cycle(parent, node) {
            tracing::warn!(%parent, %node, "refusing to insert a node into its own subtree");
            return;
        }
        self.detach(node);
        if let Some(idx) = self.index_in_parent(reference) {
            self.insert_at(parent, idx + 1, node);
        }
    }

    /// Exchange the places of two attached nodes, neither inside the other.
    pub fn swap_positions(&mut self, a: NodeId, b: NodeId) {
        if a == b || self.is_ancestor(a, b) || self.is_ancestor(b, a) {
            return;
        }
        let (Some(parent_a), Some(idx_a), Some(parent_b), Some(idx_b)) = (
            self.parent(a),
            self.index_in_parent(a),
            self.parent(b),
            self.index_in_parent(b),
        ) else {
            return;
        };
        self.slot_mut(parent_a).children[idx_a] = b;
        self.slot_mut(parent_b).children[idx_b] = a;
        self.slot_mut(a).parent = Some(parent_b);
        self.slot_mut(b).parent = Some(parent_a);
    }

    /// Put `replacement` where `old` is and detach `old`.
    pub fn replace_with(&mut self, old: NodeId, replacement: NodeId) {
        self.insert_before(old, replacement);
        self.detach(old);
    }

    /// Replace an element with its children.
    pub fn unwrap(&mut self, id: NodeId) {
        let (Some(parent), Some(idx)) = (self.parent(id), self.index_in_parent(id)) else {
            return;
        };
        let children = std::mem::take(&mut self.slot_mut(id).children);
        for child in &children {
            self.slot_mut(*child).parent = Some(parent);
        }
        self.slot_mut(parent).children.splice(idx..idx + 1, children);
        self.slot_mut(id).parent = None;
    }

    /// Insert `wrapper` in place of `id` and move `id` inside it.
    pub fn wrap(&mut self, id: NodeId, wrapper: NodeId) {
        self.insert_before(id, wrapper);
        self.append_child(wrapper, id);
    }

    /// Move all children of `from` into `to`, at the front or the back.
    pub fn move_children(&mut self, from: NodeId, to: NodeId, at_front: bool) {
        let children = self.slot(from).children.clone();
        if at_front {
            for child in children.into_iter().rev() {
                self.prepend_child(to, child);
            }
        } else {
            for child in children {
                self.append_child(to, child);
            }
        }
    }

    /// Split a text node at a grapheme offset. The tail becomes a new
    /// sibling which is returned. `None` when the offset is not strictly
    /// inside the text.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> Option<NodeId> {
        let text = self.text(id)?;
        let byte = crate::grapheme::byte_offset(text, offset)?;
        if byte == 0 || byte == text.len() {
            return None;
        }
        let tail = text[byte..].to_string();
        let head = text[..byte].to_string();
        self.set_text(id, head);
        let tail_id = self.create_text(tail);
        self.insert_after(id, tail_id);
        Some(tail_id)
    }

    /// Clone a subtree. The copy is detached.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let kind = self.slot(id).kind.clone();
        let copy = self.create(kind);
        let children = self.slot(id).children.clone();
        for child in children {
            let child_copy = self.deep_clone(child);
            self.slot_mut(child_copy).parent = Some(copy);
            self.slot_mut(copy).children.push(child_copy);
        }
        copy
    }

    /// Merge adjacent text nodes and drop empty ones below `id`.
    ///
    /// An empty text node survives only as the placeholder of a parent that
    /// has no other non-marker child.
    pub fn normalize(&mut self, id: NodeId) {
        let children = self.slot(id).children.clone();
        for child in &children {
            if self.is_element(*child) {
                self.normalize(*child);
            }
        }

        let mut kept: Vec<NodeId> = Vec::with_capacity(children.len());
        for child in children {
            let text = self.text(child).map(str::to_owned);
            if let Some(text) = text {
                if let Some(&prev) = kept.last() {
                    if let NodeKind::Text(prev_text) = &mut self.slot_mut(prev).kind {
                        prev_text.push_str(&text);
                        self.remove(child);
                        continue;
                    }
                }
            }
            kept.push(child);
        }

        let has_content = kept
            .iter()
            .any(|c| !self.is_marker(*c) && !self.is_empty_text(*c));
        let mut placeholder_kept = has_content;
        for child in kept {
            if self.is_empty_text(child) {
                if placeholder_kept {
                    self.remove(child);
                } else {
                    placeholder_kept = true;
                }
            }
        }
    }
}
