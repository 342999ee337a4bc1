//! Notifications emitted by the editor.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// What a toolbar needs to render itself.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ToolState {
    pub can_undo: bool,
    pub can_redo: bool,
    /// Tag shared by every selected block, `None` when they differ.
    pub block_tag: Option<SmolStr>,
}

/// Events delivered to listeners registered with `Editor::on_event`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EditorEvent {
    /// The markers settled after a pointer gesture or caret movement.
    SelectionChanged {
        collapsed: bool,
        /// Tags of the selected blocks, in order.
        block_tags: Vec<SmolStr>,
    },
    /// Undo availability or the selected block type may have changed.
    ToolsChanged(ToolState),
}

impl ToolState {
    /// Common tag of `tags`, if they all agree.
    pub fn common_tag<'a>(tags: impl IntoIterator<Item = &'a SmolStr>) -> Option<SmolStr> {
        let mut tags = tags.into_iter();
        let first = tags.next()?;
        tags.all(|t| t == first).then(|| first.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_tag() {
        let same: Vec<SmolStr> = vec!["p".into(), "p".into()];
        assert_eq!(ToolState::common_tag(&same), Some("p".into()));
        let mixed: Vec<SmolStr> = vec!["p".into(), "h1".into()];
        assert_eq!(ToolState::common_tag(&mixed), None);
        assert_eq!(ToolState::common_tag(&Vec::<SmolStr>::new()), None);
    }

    #[test]
    fn test_event_json_shape() {
        let event = EditorEvent::SelectionChanged {
            collapsed: true,
            block_tags: vec!["p".into()],
        };
        insta::assert_snapshot!(
            serde_json::to_string(&event).unwrap(),
            @r#"{"type":"selection-changed","collapsed":true,"block_tags":["p"]}"#
        );
    }
}
