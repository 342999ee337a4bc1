//! Translation of DOM events into core editor input.
//!
//! The core knows nothing about `web_sys`; these helpers turn keyboard and
//! mouse events into [`KeyCombo`]s and [`PointerInput`]s, resolving the
//! event target through the `data-node-id` attributes written by
//! [`Editor::render_markup`](scrivet_core::Editor::render_markup).

use scrivet_core::{Key, KeyCombo, KeydownResult, Modifiers, NodeId, PointerInput};
use wasm_bindgen::JsCast;
use web_sys::{Element, KeyboardEvent, MouseEvent};

/// Attribute carrying the arena index of a rendered node.
pub const NODE_ID_ATTR: &str = "data-node-id";

/// Modifier state of a keyboard event.
pub fn modifiers_of(event: &KeyboardEvent) -> Modifiers {
    Modifiers {
        ctrl: event.ctrl_key(),
        alt: event.alt_key(),
        shift: event.shift_key(),
        meta: event.meta_key(),
    }
}

/// Key and modifiers of a keyboard event.
pub fn key_combo(event: &KeyboardEvent) -> KeyCombo {
    KeyCombo::with_modifiers(Key::from_key_value(&event.key()), modifiers_of(event))
}

/// Whether the host should call `preventDefault` for this keydown result.
pub fn should_prevent_default(result: KeydownResult) -> bool {
    matches!(result, KeydownResult::Handled)
}

/// Parse a `data-node-id` attribute value.
pub fn parse_node_id(value: &str) -> Option<NodeId> {
    value.trim().parse::<usize>().ok().map(NodeId::from_index)
}

/// Node id of `element` or its closest rendered ancestor.
pub fn node_id_of(element: &Element) -> Option<NodeId> {
    let rendered = element
        .closest(&format!("[{NODE_ID_ATTR}]"))
        .ok()
        .flatten()?;
    rendered.get_attribute(NODE_ID_ATTR).as_deref().and_then(parse_node_id)
}

/// Hit-test a mouse event. `None` when the target is not a rendered node.
pub fn pointer_input(event: &MouseEvent) -> Option<PointerInput> {
    let target = event.target()?.dyn_into::<Element>().ok()?;
    let node = node_id_of(&target)?;
    Some(PointerInput {
        target: node,
        x: f64::from(event.client_x()),
        y: f64::from(event.client_y()),
        click_count: u32::try_from(event.detail()).unwrap_or(1).max(1),
        shift: event.shift_key(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_node_id() {
        assert_eq!(parse_node_id("12"), Some(NodeId::from_index(12)));
        assert_eq!(parse_node_id(" 3 "), Some(NodeId::from_index(3)));
        assert_eq!(parse_node_id("x"), None);
        assert_eq!(parse_node_id("-1"), None);
    }

    #[test]
    fn test_prevent_default_only_when_handled() {
        assert!(should_prevent_default(KeydownResult::Handled));
        assert!(!should_prevent_default(KeydownResult::NotHandled));
        assert!(!should_prevent_default(KeydownResult::PassThrough));
    }
}
