//! Error types for editor operations.

use smol_str::SmolStr;
use thiserror::Error;

use crate::markup::MarkupError;
use crate::tree::NodeId;

/// Errors that can occur while selecting or editing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EditorError {
    /// The node is not attached under the editing root.
    #[error("node {0} is not reachable from the editing root")]
    Unreachable(NodeId),

    /// The target of an operation lies outside the editing root.
    #[error("node {0} lies outside the editing root")]
    OutsideRoot(NodeId),

    /// The operation needs a caret (or range start) that is not in the tree.
    #[error("no {0} marker in the tree")]
    MissingBoundary(&'static str),

    /// A cloned block did not match its original leaf for leaf.
    #[error("cloned block has {clone} leaves, original has {original}")]
    CloneMismatch { original: usize, clone: usize },

    /// Command name not in the protocol.
    #[error("unknown command: {0}")]
    UnknownCommand(SmolStr),

    /// Command arguments that cannot be interpreted.
    #[error("malformed arguments for {command}: {reason}")]
    MalformedArguments { command: SmolStr, reason: String },

    /// The editing root already has an engine attached.
    #[error("a selection engine is already attached to this root")]
    AlreadyAttached,

    /// A programmatic position that does not exist in the document.
    #[error("invalid position: block {block}, offset {offset}")]
    InvalidPosition { block: usize, offset: usize },

    /// Markup could not be parsed.
    #[error(transparent)]
    Markup(#[from] MarkupError),
}

pub type Result<T, E = EditorError> = std::result::Result<T, E>;
