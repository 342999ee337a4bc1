//! Snapshot-based undo history.
//!
//! Provides:
//! - `UndoManager` trait for anything that can undo and redo
//! - `UndoHistory` - a bounded list of markup snapshots with a depth cursor
//!
//! Snapshots are most recent first. Depth 0 is the live state; undo moves
//! the cursor towards older snapshots and redo back. Recording while the
//! cursor is not at 0 discards the snapshots newer than the cursor.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Trait for managing undo/redo operations.
///
/// Implementations must actually perform the undo/redo, not just track state.
pub trait UndoManager {
    /// Check if undo is available.
    fn can_undo(&self) -> bool;

    /// Check if redo is available.
    fn can_redo(&self) -> bool;

    /// Perform undo. Returns true if successful.
    fn undo(&mut self) -> bool;

    /// Perform redo. Returns true if successful.
    fn redo(&mut self) -> bool;

    /// Clear all undo/redo history.
    fn clear_history(&mut self);
}

/// What to do with the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UndoAction {
    /// Reset the history to the current state alone.
    Init,
    /// Push the current state as a new snapshot.
    New,
    /// Step back one snapshot.
    Undo,
    /// Step forward one snapshot.
    Redo,
    /// Fold the current state into the latest snapshot when possible.
    #[default]
    Coalesce,
}

/// Why a state is being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UndoReason {
    Typing,
    SelectionChanged,
    /// Structural edits. Never folded into the previous record.
    Command,
}

impl UndoReason {
    /// Whether consecutive records with this reason fold together.
    pub fn coalesces(self) -> bool {
        !matches!(self, Self::Command)
    }
}

/// Bounded snapshot history.
#[derive(Debug, Clone)]
pub struct UndoHistory {
    snapshots: VecDeque<String>,
    depth: usize,
    last_reason: Option<UndoReason>,
    limit: usize,
}

impl Default for UndoHistory {
    fn default() -> Self {
        Self::new(100)
    }
}

impl UndoHistory {
    /// Create an empty history keeping at most `limit` snapshots.
    pub fn new(limit: usize) -> Self {
        Self {
            snapshots: VecDeque::new(),
            depth: 0,
            last_reason: None,
            limit: limit.max(1),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Snapshots, most recent first.
    pub fn snapshots(&self) -> impl Iterator<Item = &str> {
        self.snapshots.iter().map(String::as_str)
    }

    pub fn last_reason(&self) -> Option<UndoReason> {
        self.last_reason
    }

    pub fn can_undo(&self) -> bool {
        self.depth + 1 < self.snapshots.len()
    }

    pub fn can_redo(&self) -> bool {
        self.depth > 0
    }

    /// Apply `action` to the history. `current` is the serialized live state.
    ///
    /// Returns the snapshot to restore for a successful undo or redo.
    pub fn update(
        &mut self,
        action: UndoAction,
        reason: Option<UndoReason>,
        current: &str,
    ) -> Option<&str> {
        let action = if self.snapshots.is_empty() {
            UndoAction::Init
        } else {
            action
        };
        let previous_reason = self.last_reason;
        self.last_reason = reason;

        match action {
            UndoAction::Init => {
                tracing::debug!(target: "scrivet::undo", "initializing undo");
                self.snapshots.clear();
                self.snapshots.push_front(current.to_string());
                self.depth = 0;
                None
            }
            UndoAction::New => {
                tracing::trace!(target: "scrivet::undo", ?reason, "new undo snapshot");
                self.push(current);
                None
            }
            UndoAction::Undo => {
                if !self.can_undo() {
                    return None;
                }
                self.depth += 1;
                tracing::debug!(target: "scrivet::undo", depth = self.depth, "undo");
                self.snapshots.get(self.depth).map(String::as_str)
            }
            UndoAction::Redo => {
                if !self.can_redo() {
                    return None;
                }
                self.depth -= 1;
                tracing::debug!(target: "scrivet::undo", depth = self.depth, "redo");
                self.snapshots.get(self.depth).map(String::as_str)
            }
            UndoAction::Coalesce => {
                let folds = reason.is_none_or(UndoReason::coalesces) && previous_reason == reason;
                if self.depth > 0 || self.snapshots.len() == 1 || !folds {
                    tracing::trace!(target: "scrivet::undo", ?reason, "coalesce starts a new snapshot");
                    self.push(current);
                } else if let Some(latest) = self.snapshots.front_mut() {
                    tracing::trace!(target: "scrivet::undo", ?reason, "updating latest snapshot");
                    *latest = current.to_string();
                }
                None
            }
        }
    }

    fn push(&mut self, current: &str) {
        if self.depth > 0 {
            self.snapshots.drain(..self.depth);
            self.depth = 0;
        }
        self.snapshots.push_front(current.to_string());
        while self.snapshots.len() > self.limit {
            self.snapshots.pop_back();
        }
    }

    /// Forget everything but `current`.
    pub fn clear(&mut self, current: &str) {
        self.last_reason = None;
        self.update(UndoAction::Init, None, current);
    }
}
