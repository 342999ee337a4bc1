//! Leaf-level traversal over the document tree.
//!
//! Leaves are nodes without children: text, void elements, empty elements
//! and markers. Everything the engines do is phrased in terms of leaves, so
//! these helpers are the foundation for both selection and editing.

use std::cmp::Ordering;

use crate::tree::{NodeId, Tree};

/// Leaves under `node` in document order. A leaf yields itself.
pub fn leaf_nodes(tree: &Tree, node: NodeId) -> Vec<NodeId> {
    if tree.is_leaf(node) {
        return vec![node];
    }
    tree.descendants(node)
        .into_iter()
        .filter(|n| tree.is_leaf(*n))
        .collect()
}

pub fn first_leaf(tree: &Tree, node: NodeId) -> NodeId {
    let mut current = node;
    while let Some(child) = tree.first_child(current) {
        current = child;
    }
    current
}

pub fn last_leaf(tree: &Tree, node: NodeId) -> NodeId {
    let mut current = node;
    while let Some(child) = tree.last_child(current) {
        current = child;
    }
    current
}

/// Leaf following `node` in document order that passes `filter`, without
/// leaving `base` (the root when `None`).
pub fn next_leaf(
    tree: &Tree,
    node: NodeId,
    base: Option<NodeId>,
    filter: impl Fn(&Tree, NodeId) -> bool,
) -> Option<NodeId> {
    let base = base.unwrap_or_else(|| tree.root());
    let mut current = node;
    loop {
        let mut climb = current;
        let sibling = loop {
            if climb == base {
                return None;
            }
            match tree.next_sibling(climb) {
                Some(sibling) => break sibling,
                None => climb = tree.parent(climb)?,
            }
        };
        let leaf = first_leaf(tree, sibling);
        if filter(tree, leaf) {
            return Some(leaf);
        }
        current = leaf;
    }
}

/// Mirror of [`next_leaf`].
pub fn previous_leaf(
    tree: &Tree,
    node: NodeId,
    base: Option<NodeId>,
    filter: impl Fn(&Tree, NodeId) -> bool,
) -> Option<NodeId> {
    let base = base.unwrap_or_else(|| tree.root());
    let mut current = node;
    loop {
        let mut climb = current;
        let sibling = loop {
            if climb == base {
                return None;
            }
            match tree.previous_sibling(climb) {
                Some(sibling) => break sibling,
                None => climb = tree.parent(climb)?,
            }
        };
        let leaf = last_leaf(tree, sibling);
        if filter(tree, leaf) {
            return Some(leaf);
        }
        current = leaf;
    }
}

/// Filter accepting every leaf.
pub fn any_leaf(_: &Tree, _: NodeId) -> bool {
    true
}

/// `a` strictly precedes `b` in document order.
pub fn is_before(tree: &Tree, a: NodeId, b: NodeId) -> bool {
    tree.compare(a, b) == Some(Ordering::Less)
}

/// Top-level block containing `node` (inclusive).
pub fn block_of(tree: &Tree, node: NodeId) -> Option<NodeId> {
    tree.closest(node, |t, n| t.is_block(n))
}

/// Leaves strictly between two positions in document order. The positions
/// may be given in either order; leaves inside either position node are
/// not "between".
pub fn leaf_nodes_between(tree: &Tree, a: NodeId, b: NodeId) -> Vec<NodeId> {
    let (first, last) = if is_before(tree, b, a) { (b, a) } else { (a, b) };
    let (Some(first_block), Some(last_block)) = (block_of(tree, first), block_of(tree, last))
    else {
        return Vec::new();
    };
    let (Some(from), Some(to)) = (
        tree.index_in_parent(first_block),
        tree.index_in_parent(last_block),
    ) else {
        return Vec::new();
    };
    tree.children(tree.root())[from..=to]
        .iter()
        .flat_map(|block| leaf_nodes(tree, *block))
        .filter(|leaf| {
            *leaf != first
                && *leaf != last
                && is_before(tree, first, *leaf)
                && is_before(tree, *leaf, last)
                && !tree.is_ancestor(first, *leaf)
        })
        .collect()
}

/// Climb from `node` while the parent has exactly one child and passes
/// `filter`. Returns the highest node reached (possibly `node` itself).
pub fn top_single_parent_ancestor(
    tree: &Tree,
    node: NodeId,
    filter: impl Fn(&Tree, NodeId) -> bool,
) -> NodeId {
    let mut current = node;
    while let Some(parent) = tree.parent(current) {
        if tree.children(parent).len() != 1 || !filter(tree, parent) {
            break;
        }
        current = parent;
    }
    current
}

/// Filter for [`top_single_parent_ancestor`] that never climbs into a block
/// or the root.
pub fn below_block(tree: &Tree, node: NodeId) -> bool {
    tree.parent(node).is_some_and(|p| p != tree.root())
}

/// Nearest strict ancestor satisfying `pred`, reachable through a chain of
/// single-child parents.
pub fn closest_single_parent_ancestor(
    tree: &Tree,
    node: NodeId,
    pred: impl Fn(&Tree, NodeId) -> bool,
) -> Option<NodeId> {
    let mut current = tree.parent(node)?;
    loop {
        if pred(tree, current) {
            return Some(current);
        }
        let parent = tree.parent(current)?;
        if tree.children(parent).len() != 1 {
            return None;
        }
        current = parent;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::parse_into;

    fn tree(markup: &str) -> Tree {
        let mut tree = Tree::new("div");
        let root = tree.root();
        parse_into(&mut tree, root, markup).unwrap();
        tree
    }

    fn texts(tree: &Tree, nodes: &[NodeId]) -> Vec<String> {
        nodes.iter().map(|n| tree.text_content(*n)).collect()
    }

    #[test]
    fn test_leaf_walk_crosses_blocks() {
        let t = tree("<p>a<b>b</b></p><p>c<br></p>");
        let root = t.root();
        let leaves = leaf_nodes(&t, root);
        assert_eq!(texts(&t, &leaves), vec!["a", "b", "c", ""]);
        assert_eq!(next_leaf(&t, leaves[1], None, any_leaf), Some(leaves[2]));
        assert_eq!(previous_leaf(&t, leaves[2], None, any_leaf), Some(leaves[1]));
        assert_eq!(next_leaf(&t, leaves[3], None, any_leaf), None);
        assert_eq!(previous_leaf(&t, leaves[0], None, any_leaf), None);
    }

    #[test]
    fn test_leaf_walk_respects_base() {
        let t = tree("<p>a</p><p>b</p>");
        let leaves = leaf_nodes(&t, t.root());
        let block = block_of(&t, leaves[1]).unwrap();
        assert_eq!(previous_leaf(&t, leaves[1], Some(block), any_leaf), None);
    }

    #[test]
    fn test_leaf_walk_filter_skips() {
        let t = tree("<p>a<span class=\"sel-end caret\"></span>b</p>");
        let leaves = leaf_nodes(&t, t.root());
        let next = next_leaf(&t, leaves[0], None, |t, n| !t.is_marker(n));
        assert_eq!(next, Some(leaves[2]));
    }

    #[test]
    fn test_leaves_between_blocks() {
        let t = tree("<p>ab</p><p>c</p><p>de</p>");
        let blocks = t.children(t.root()).to_vec();
        let a = t.first_child(blocks[0]).unwrap();
        let e = t.first_child(blocks[2]).unwrap();
        let between = leaf_nodes_between(&t, e, a);
        assert_eq!(texts(&t, &between), vec!["c"]);
    }

    #[test]
    fn test_single_parent_chains() {
        let t = tree("<p>x<i><b>y</b></i></p>");
        let leaves = leaf_nodes(&t, t.root());
        let y = leaves[1];
        let top = top_single_parent_ancestor(&t, y, below_block);
        assert_eq!(t.tag(top), Some("i"));

        let b = closest_single_parent_ancestor(&t, y, |t, n| t.tag(n) == Some("b"));
        assert_eq!(b.and_then(|n| t.tag(n)), Some("b"));
        let p = closest_single_parent_ancestor(&t, y, |t, n| t.tag(n) == Some("p"));
        assert_eq!(p, None);
    }
}
