//! Inline and block styling of the selection.

use crate::command::Declarations;
use crate::editor::Editor;
use crate::error::{EditorError, Result};
use crate::history::{UndoAction, UndoReason};
use crate::selection::{SELECTED, despanify};
use crate::traverse::closest_single_parent_ancestor;
use crate::tree::{NodeId, NodeKind, Tree, is_void_tag};

/// Class of the spans carrying inline styles.
pub const SET_TEXT_CLASS: &str = "setText";

fn apply(tree: &mut Tree, node: NodeId, decls: &Declarations) {
    for (property, value) in decls {
        tree.set_style(node, property, value);
    }
}

/// The wrapper `mark_range` put around a partially selected text.
fn is_selection_wrapper(tree: &Tree, node: NodeId) -> bool {
    tree.element(node).is_some_and(|e| {
        e.tag == "span" && e.classes.len() == 1 && e.has_class(SELECTED) && e.style.is_empty() && e.attrs.is_empty()
    })
}

impl Editor {
    /// Style the selected text. A collapsed selection is left alone.
    pub fn set_inline_style(&mut self, decls: &Declarations) -> Result<bool> {
        if self.is_collapsed() {
            return Ok(false);
        }
        let root = self.tree.root();
        despanify(&mut self.tree, root);
        self.selectable.mark_bounds(&mut self.tree)?;
        let leaves = self.selectable.selected_leaf_nodes(&self.tree);
        self.selectable.remove_bounds(&mut self.tree);

        let tree = &mut self.tree;
        let mut styled = 0usize;
        for leaf in leaves {
            if !tree.is_text(leaf) {
                continue;
            }
            let existing =
                closest_single_parent_ancestor(tree, leaf, |t, n| t.has_class(n, SET_TEXT_CLASS));
            let target = match (existing, tree.parent(leaf)) {
                (Some(span), _) => span,
                (None, Some(parent)) if is_selection_wrapper(tree, parent) => {
                    tree.add_class(parent, SET_TEXT_CLASS);
                    parent
                }
                _ => {
                    let span = tree.create_element("span");
                    tree.add_class(span, SET_TEXT_CLASS);
                    tree.wrap(leaf, span);
                    span
                }
            };
            apply(tree, target, decls);
            styled += 1;
        }

        self.selectable.reset_bounds(&mut self.tree);
        self.selectable.mark_bounds(&mut self.tree)?;
        tracing::debug!(target: "scrivet::edit", styled, "inline style applied");
        if styled > 0 {
            self.record(UndoAction::New, Some(UndoReason::Command));
        }
        Ok(styled > 0)
    }

    /// Style every selected block.
    pub fn set_block_style(&mut self, decls: &Declarations) -> Result<bool> {
        let blocks = self.selectable.selected_blocks(&self.tree);
        if blocks.is_empty() {
            return Ok(false);
        }
        for block in &blocks {
            apply(&mut self.tree, *block, decls);
        }
        tracing::debug!(target: "scrivet::edit", blocks = blocks.len(), "block style applied");
        self.record(UndoAction::New, Some(UndoReason::Command));
        Ok(true)
    }

    /// Turn every selected block into a `tag` element.
    pub fn change_block_type(&mut self, tag: &str) -> Result<bool> {
        let valid = !tag.is_empty()
            && tag.chars().all(|c| c.is_ascii_alphanumeric())
            && tag.starts_with(|c: char| c.is_ascii_alphabetic())
            && !is_void_tag(&tag.to_ascii_lowercase());
        if !valid {
            return Err(EditorError::MalformedArguments {
                command: "setBlockType".into(),
                reason: format!("{tag:?} cannot hold a block"),
            });
        }
        let tag = tag.to_ascii_lowercase();

        let blocks = self.selectable.selected_blocks(&self.tree);
        if blocks.is_empty() {
            return Ok(false);
        }
        let tree = &mut self.tree;
        for block in blocks {
            let Some(mut element) = tree.element(block).cloned() else {
                continue;
            };
            if element.tag == tag {
                continue;
            }
            element.tag = tag.as_str().into();
            let replacement = tree.create(NodeKind::Element(element));
            tree.move_children(block, replacement, false);
            tree.replace_with(block, replacement);
            tree.remove(block);
        }

        self.selectable.mark_bounds(&mut self.tree)?;
        tracing::debug!(target: "scrivet::edit", %tag, "block type changed");
        self.record(UndoAction::New, Some(UndoReason::Command));
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use crate::command::Command;
    use crate::config::EditorConfig;
    use crate::editor::Editor;
    use crate::selection::TextPosition;

    fn editor(markup: &str) -> Editor {
        Editor::from_markup(markup, EditorConfig::default()).unwrap()
    }

    #[test]
    fn test_inline_style_wraps_partial_text() {
        let mut ed = editor("<p>abcd</p>");
        ed.select(TextPosition::new(0, 1), TextPosition::new(0, 3)).unwrap();
        assert_eq!(ed.do_command("setText font-weight bold"), 1);
        insta::assert_snapshot!(
            ed.content_markup(),
            @r#"<p>a<span class="setText" style="font-weight: bold">bc</span>d</p>"#
        );
        assert_eq!(ed.copy_text(), "bc");
    }

    #[test]
    fn test_inline_style_restyles_existing_span() {
        let mut ed = editor(r#"<p>a<span class="setText" style="color: red">bc</span>d</p>"#);
        ed.select(TextPosition::new(0, 1), TextPosition::new(0, 3)).unwrap();
        ed.execute(&"setText color blue".parse::<Command>().unwrap()).unwrap();
        insta::assert_snapshot!(
            ed.content_markup(),
            @r#"<p>a<span class="setText" style="color: blue">bc</span>d</p>"#
        );
    }

    #[test]
    fn test_inline_style_needs_a_range() {
        let mut ed = editor("<p>abcd</p>");
        ed.set_caret(TextPosition::new(0, 2)).unwrap();
        let decls = vec![("color".into(), "red".to_string())];
        assert!(!ed.set_inline_style(&decls).unwrap());
        assert_eq!(ed.content_markup(), "<p>abcd</p>");
    }

    #[test]
    fn test_block_style_and_type() {
        let mut ed = editor("<p>one</p><p>two</p><p>three</p>");
        ed.select(TextPosition::new(0, 1), TextPosition::new(1, 1)).unwrap();
        assert_eq!(ed.do_command("setBlocks text-align center; setBlockType H2"), 2);
        insta::assert_snapshot!(
            ed.content_markup(),
            @r#"<h2 style="text-align: center">one</h2><h2 style="text-align: center">two</h2><p>three</p>"#
        );
        assert_eq!(ed.tool_state().block_tag.as_deref(), Some("h2"));
    }

    #[test]
    fn test_block_type_rejects_void_and_garbage() {
        let mut ed = editor("<p>one</p>");
        assert!(ed.change_block_type("br").is_err());
        assert!(ed.change_block_type("h1;").is_err());
        assert!(ed.change_block_type("").is_err());
        assert_eq!(ed.content_markup(), "<p>one</p>");
    }

    #[test]
    fn test_caret_block_is_styled_without_a_range() {
        let mut ed = editor("<p>one</p><p>two</p>");
        ed.set_caret(TextPosition::new(1, 0)).unwrap();
        ed.do_command("setBlockType blockquote");
        insta::assert_snapshot!(ed.content_markup(), @"<p>one</p><blockquote>two</blockquote>");
    }
}
