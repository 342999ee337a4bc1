//! Editor configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::input::KeyCombo;

/// Per-editor settings. Every field has a default, so an empty JSON object
/// is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Id of the element holding the toolbar, for hosts that wire one up.
    pub tools: Option<String>,
    /// Maximum number of undo snapshots kept.
    pub undo_limit: usize,
    /// Key combo (`"ctrl+shift+z"`) to command string.
    pub shortcuts: BTreeMap<String, String>,
    /// Annotation kind to template markup.
    pub annotations: BTreeMap<String, String>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        let shortcuts = [
            ("ctrl+z", "updateUndo undo"),
            ("ctrl+y", "updateUndo redo"),
            ("ctrl+shift+z", "updateUndo redo"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Self {
            tools: None,
            undo_limit: 100,
            shortcuts,
            annotations: BTreeMap::new(),
        }
    }
}

impl EditorConfig {
    /// Parse the shortcut table. Unparsable combos are logged and skipped.
    pub fn key_bindings(&self) -> Vec<(KeyCombo, String)> {
        self.shortcuts
            .iter()
            .filter_map(|(combo, command)| match combo.parse::<KeyCombo>() {
                Ok(parsed) => Some((parsed.normalized(), command.clone())),
                Err(err) => {
                    tracing::warn!(%combo, %err, "ignoring shortcut");
                    None
                }
            })
            .collect()
    }
}

/// Source of annotation template markup.
///
/// `None` means the kind is unavailable or the user cancelled; the editor
/// treats it as a no-op.
pub trait AnnotationTemplates {
    fn template(&self, kind: &str) -> Option<String>;
}

impl AnnotationTemplates for EditorConfig {
    fn template(&self, kind: &str) -> Option<String> {
        self.annotations.get(kind).cloned()
    }
}

impl<F> AnnotationTemplates for F
where
    F: Fn(&str) -> Option<String>,
{
    fn template(&self, kind: &str) -> Option<String> {
        self(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{Key, Modifiers};

    #[test]
    fn test_empty_json_is_default() {
        let config: EditorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EditorConfig::default());
        assert_eq!(config.undo_limit, 100);
        assert_eq!(config.shortcuts.len(), 3);
    }

    #[test]
    fn test_partial_json_keeps_other_defaults() {
        let config: EditorConfig = serde_json::from_str(
            r#"{"undo_limit": 5, "annotations": {"note": "<em>note</em>"}}"#,
        )
        .unwrap();
        assert_eq!(config.undo_limit, 5);
        assert_eq!(config.template("note").as_deref(), Some("<em>note</em>"));
        assert_eq!(config.template("missing"), None);
        assert!(config.shortcuts.contains_key("ctrl+z"));
    }

    #[test]
    fn test_key_bindings_skip_garbage() {
        let mut config = EditorConfig::default();
        config
            .shortcuts
            .insert("ctrl+B".into(), "setText font-weight bold".into());
        config.shortcuts.insert("hyper+q".into(), "annotate x".into());
        let bindings = config.key_bindings();
        assert_eq!(bindings.len(), 4);
        assert!(bindings.contains(&(
            KeyCombo::with_modifiers(Key::character("b"), Modifiers::CTRL),
            "setText font-weight bold".to_string()
        )));
    }

    #[test]
    fn test_closure_templates() {
        let lookup = |kind: &str| (kind == "cite").then(|| "<cite>?</cite>".to_string());
        assert!(lookup.template("cite").is_some());
        assert!(lookup.template("other").is_none());
    }
}
