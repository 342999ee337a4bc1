//! The editor: one document tree, its selection engine and its history.

use std::collections::HashMap;
use std::fmt;

use smol_str::SmolStr;

use crate::command::{self, Command};
use crate::config::EditorConfig;
use crate::error::{EditorError, Result};
use crate::event::{EditorEvent, ToolState};
use crate::history::{UndoAction, UndoHistory, UndoManager, UndoReason};
use crate::input::{Key, KeyCombo, KeydownResult};
use crate::markup::{self, MarkupOptions};
use crate::selection::{Geometry, PointerInput, SelectMode, Selectable, Side, TextPosition};
use crate::traverse::block_of;
use crate::tree::{Bound, Element, NodeId, Tree};

/// Class marking content the keyboard must not edit.
pub const NOT_EDITABLE: &str = "not-editable";

type Listener = Box<dyn FnMut(&EditorEvent)>;

/// Editing engine bound to one root.
///
/// The editor owns the tree. Hosts read it through [`Editor::tree`] and
/// change it only through editor operations.
pub struct Editor {
    pub(crate) tree: Tree,
    pub(crate) selectable: Selectable,
    history: UndoHistory,
    config: EditorConfig,
    bindings: HashMap<KeyCombo, String>,
    listeners: Vec<Listener>,
}

impl fmt::Debug for Editor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Editor")
            .field("tree", &self.tree)
            .field("selectable", &self.selectable)
            .field("history", &self.history)
            .field("config", &self.config)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Editor {
    /// Take ownership of `tree` and start editing it.
    ///
    /// The root's content is normalized. Without a caret in the content, one
    /// is put at the end of the last block.
    pub fn attach(mut tree: Tree, config: EditorConfig) -> Result<Self> {
        let selectable = Selectable::attach(&mut tree)?;
        if tree.find_marker(Bound::Caret).is_none() {
            let root = tree.root();
            let block = match tree.last_child(root) {
                Some(block) => block,
                None => {
                    let block = tree.create_element("p");
                    tree.append_child(root, block);
                    block
                }
            };
            let caret = tree.create_marker(Bound::Caret);
            tree.append_child(block, caret);
        }
        selectable.normalize(&mut tree);
        selectable.mark_bounds(&mut tree)?;

        let bindings = config.key_bindings().into_iter().collect();
        let mut editor = Self {
            tree,
            selectable,
            history: UndoHistory::new(config.undo_limit),
            config,
            bindings,
            listeners: Vec::new(),
        };
        editor.update_undo(UndoAction::Init, None)?;
        tracing::debug!(target: "scrivet::edit", blocks = editor.tree.children(editor.tree.root()).len(), "editor attached");
        Ok(editor)
    }

    /// Parse `markup` into a fresh `div` root and attach to it.
    pub fn from_markup(markup: &str, config: EditorConfig) -> Result<Self> {
        let mut tree = Tree::new("div");
        let root = tree.root();
        markup::parse_into(&mut tree, root, markup)?;
        Self::attach(tree, config)
    }

    /// Release the tree, selection annotation and markers included.
    pub fn detach(self) -> Tree {
        let mut tree = self.tree;
        self.selectable.detach(&mut tree);
        tree
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn selectable(&self) -> &Selectable {
        &self.selectable
    }

    pub fn history(&self) -> &UndoHistory {
        &self.history
    }

    /// Root content with markers and annotation, as stored in the history.
    pub fn markup(&self) -> String {
        markup::inner_markup(&self.tree, self.tree.root(), MarkupOptions::SNAPSHOT)
    }

    /// Root content without any selection state.
    pub fn content_markup(&self) -> String {
        markup::inner_markup(&self.tree, self.tree.root(), MarkupOptions::CONTENT)
    }

    /// Root content for live rendering, with node ids for hit-testing.
    pub fn render_markup(&self) -> String {
        markup::inner_markup(&self.tree, self.tree.root(), MarkupOptions::RENDER)
    }

    /// Replace the root's content. Every previously issued [`NodeId`]
    /// becomes stale. Does not record undo.
    pub fn set_inner_markup(&mut self, content: &str) -> Result<()> {
        let root = self.tree.root();
        let root_element = self
            .tree
            .element(root)
            .cloned()
            .unwrap_or_else(|| Element::new("div"));
        let mut fresh = Tree::with_root(root_element);
        let fresh_root = fresh.root();
        markup::parse_into(&mut fresh, fresh_root, content)?;
        self.tree = fresh;
        self.selectable.normalize(&mut self.tree);
        if self.caret().is_ok() {
            self.selectable.mark_bounds(&mut self.tree)?;
        }
        Ok(())
    }

    pub(crate) fn caret(&self) -> Result<NodeId> {
        self.selectable
            .caret(&self.tree)
            .ok_or(EditorError::MissingBoundary("caret"))
    }

    pub fn is_collapsed(&self) -> bool {
        self.selectable.is_collapsed(&self.tree)
    }

    /// The caret sits inside content that must not be edited.
    pub fn caret_in_not_editable(&self) -> bool {
        self.caret().is_ok_and(|caret| {
            self.tree
                .closest(caret, |t, n| t.has_class(n, NOT_EDITABLE))
                .is_some()
        })
    }

    // === Events ===

    /// Register a listener. Listeners cannot reach back into the editor.
    pub fn on_event(&mut self, listener: impl FnMut(&EditorEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn emit(&mut self, event: EditorEvent) {
        tracing::trace!(target: "scrivet::edit", ?event, "emit");
        for listener in &mut self.listeners {
            listener(&event);
        }
    }

    fn selected_block_tags(&self) -> Vec<SmolStr> {
        self.selectable
            .selected_blocks(&self.tree)
            .into_iter()
            .filter_map(|b| self.tree.tag(b).map(SmolStr::from))
            .collect()
    }

    pub fn tool_state(&self) -> ToolState {
        ToolState {
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
            block_tag: ToolState::common_tag(&self.selected_block_tags()),
        }
    }

    /// Tell listeners the selection settled, then checkpoint it. Consecutive
    /// selection changes share one snapshot.
    pub fn selection_changed(&mut self) {
        let event = EditorEvent::SelectionChanged {
            collapsed: self.is_collapsed(),
            block_tags: self.selected_block_tags(),
        };
        self.emit(event);
        self.record(UndoAction::Coalesce, Some(UndoReason::SelectionChanged));
    }

    // === Undo ===

    /// Drive the history. Undo and redo restore the snapshot into the root.
    /// Returns whether the tree was restored from a snapshot.
    pub fn update_undo(&mut self, action: UndoAction, reason: Option<UndoReason>) -> Result<bool> {
        let current = self.markup();
        let restore = self
            .history
            .update(action, reason, &current)
            .map(str::to_owned);
        if let Some(snapshot) = &restore {
            self.set_inner_markup(snapshot)?;
        }
        let tools = self.tool_state();
        self.emit(EditorEvent::ToolsChanged(tools));
        Ok(restore.is_some())
    }

    /// Checkpoint after an edit. History errors are logged, never returned.
    pub(crate) fn record(&mut self, action: UndoAction, reason: Option<UndoReason>) {
        if let Err(err) = self.update_undo(action, reason) {
            tracing::warn!(target: "scrivet::undo", %err, "failed to update undo history");
        }
    }

    // === Selection ===

    /// Put a collapsed caret at `position`.
    pub fn set_caret(&mut self, position: TextPosition) -> Result<()> {
        let (leaf, side) = self.selectable.resolve_position(&mut self.tree, position)?;
        self.selectable.begin_selection(&mut self.tree, leaf, side)?;
        self.selection_changed();
        Ok(())
    }

    /// Select from `anchor` to `focus` (either order).
    pub fn select(&mut self, anchor: TextPosition, focus: TextPosition) -> Result<()> {
        let (leaf, side) = self.selectable.resolve_position(&mut self.tree, anchor)?;
        self.selectable.begin_selection(&mut self.tree, leaf, side)?;
        let (leaf, side) = self.selectable.resolve_position(&mut self.tree, focus)?;
        self.selectable
            .extend_selection(&mut self.tree, leaf, side, SelectMode::Character)?;
        self.selection_changed();
        Ok(())
    }

    /// Select every block.
    pub fn select_all(&mut self) -> Result<()> {
        let root = self.tree.root();
        let (Some(first), Some(last)) = (self.tree.first_child(root), self.tree.last_child(root))
        else {
            return Ok(());
        };
        self.selectable.begin_selection(&mut self.tree, first, Side::Before)?;
        self.selectable
            .extend_selection(&mut self.tree, last, Side::After, SelectMode::Character)?;
        self.selection_changed();
        Ok(())
    }

    /// Selectable leaves of the current range.
    pub fn selected_leaf_nodes(&self) -> Vec<NodeId> {
        self.selectable.selected_leaf_nodes(&self.tree)
    }

    /// Block holding the caret.
    pub fn caret_block(&self) -> Option<NodeId> {
        self.caret().ok().and_then(|c| block_of(&self.tree, c))
    }

    // === Pointer ===

    pub fn pointer_down(&mut self, geometry: &dyn Geometry, input: &PointerInput) -> Result<bool> {
        self.selectable.pointer_down(&mut self.tree, geometry, input)
    }

    pub fn pointer_move(&mut self, geometry: &dyn Geometry, input: &PointerInput) -> Result<bool> {
        self.selectable.pointer_move(&mut self.tree, geometry, input)
    }

    /// Ends the gesture and, when due, reports the selection change.
    pub fn pointer_up(&mut self, geometry: &dyn Geometry, input: &PointerInput) -> Result<bool> {
        let changed = self.selectable.pointer_up(&mut self.tree, geometry, input)?;
        if changed {
            self.selection_changed();
        }
        Ok(changed)
    }

    // === Commands ===

    /// Run one parsed command. Returns whether it changed anything.
    pub fn execute(&mut self, command: &Command) -> Result<bool> {
        tracing::debug!(target: "scrivet::edit", %command, "execute");
        match command {
            Command::SetBlockType(tag) => self.change_block_type(tag),
            Command::SetBlocks(decls) => self.set_block_style(decls),
            Command::SetText(decls) => self.set_inline_style(decls),
            Command::UpdateUndo(action) => self.update_undo(*action, None),
            Command::Annotate(kind) => self.annotate(kind),
        }
    }

    /// Run a command string. Bad commands are logged and skipped. Returns
    /// how many commands ran.
    pub fn do_command(&mut self, src: &str) -> usize {
        let mut ran = 0;
        for parsed in command::parse_commands(src) {
            match parsed.and_then(|cmd| self.execute(&cmd)) {
                Ok(_) => ran += 1,
                Err(err) => tracing::error!(target: "scrivet::edit", %err, src, "command failed"),
            }
        }
        ran
    }

    // === Keyboard ===

    /// Handle a key press. Errors are logged; the caret stays where it was.
    pub fn keydown(&mut self, combo: &KeyCombo) -> KeydownResult {
        match self.handle_key(combo) {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(target: "scrivet::edit", %err, %combo, "key handling failed");
                KeydownResult::Handled
            }
        }
    }

    fn handle_key(&mut self, combo: &KeyCombo) -> Result<KeydownResult> {
        if let Some(command) = self.bindings.get(&combo.normalized()).cloned() {
            self.do_command(&command);
            return Ok(KeydownResult::Handled);
        }
        if self.caret_in_not_editable() {
            return Ok(KeydownResult::PassThrough);
        }

        let modifiers = combo.modifiers;
        match &combo.key {
            Key::Backspace => {
                self.backspace()?;
            }
            Key::Delete => {
                self.forward_delete()?;
            }
            Key::Enter => {
                self.split_block_at_caret()?;
            }
            Key::Undo => {
                self.update_undo(UndoAction::Undo, None)?;
            }
            Key::Redo => {
                self.update_undo(UndoAction::Redo, None)?;
            }
            key if key.is_navigation() => {
                let Some(direction) = crate::edit::Direction::from_key(key) else {
                    return Ok(KeydownResult::PassThrough);
                };
                self.move_caret(direction, modifiers.shift, modifiers.alt)?;
            }
            Key::Character(text) if !modifiers.is_command() => {
                self.insert_text(text)?;
            }
            _ if modifiers.is_command() => return Ok(KeydownResult::PassThrough),
            _ => return Ok(KeydownResult::NotHandled),
        }
        Ok(KeydownResult::Handled)
    }
}

impl UndoManager for Editor {
    fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn undo(&mut self) -> bool {
        self.update_undo(UndoAction::Undo, None).unwrap_or(false)
    }

    fn redo(&mut self) -> bool {
        self.update_undo(UndoAction::Redo, None).unwrap_or(false)
    }

    fn clear_history(&mut self) {
        let current = self.markup();
        self.history.clear(&current);
        let tools = self.tool_state();
        self.emit(EditorEvent::ToolsChanged(tools));
    }
}
