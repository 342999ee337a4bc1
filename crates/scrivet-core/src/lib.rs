//! scrivet-core: rich-text editing logic without host dependencies.
//!
//! This crate provides:
//! - `Tree` - arena document tree with in-tree selection markers
//! - `Selectable` - the selection engine (markers, annotation, pointer gestures)
//! - `Editor` - typing, deleting, splitting, styling and annotations
//! - `UndoHistory` - markup snapshots with reason-based coalescing
//! - `Command` - the string command protocol used by toolbars and shortcuts
//!
//! Hosts own layout and events; they feed pointer and key input in and read
//! the tree (or its markup) back out.

pub mod command;
pub mod config;
pub mod edit;
pub mod editor;
pub mod error;
pub mod event;
pub mod grapheme;
pub mod history;
pub mod input;
pub mod markup;
pub mod selection;
pub mod style;
pub mod traverse;
pub mod tree;

pub use command::{Command, Declarations, parse_commands};
pub use config::{AnnotationTemplates, EditorConfig};
pub use edit::Direction;
pub use editor::Editor;
pub use error::{EditorError, Result};
pub use event::{EditorEvent, ToolState};
pub use history::{UndoAction, UndoHistory, UndoManager, UndoReason};
pub use input::{Key, KeyCombo, KeydownResult, Modifiers};
pub use markup::{MarkupError, MarkupOptions};
pub use selection::{Geometry, PointerInput, Rect, SelectMode, Selectable, Side, TextPosition};
pub use smol_str::SmolStr;
pub use tree::{Bound, Element, NodeId, NodeKind, Tree};
