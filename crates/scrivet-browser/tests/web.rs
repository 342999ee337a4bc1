//! WASM browser tests for scrivet-browser.
//!
//! Run with: `wasm-pack test --headless --firefox` or `--chrome`

use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

use scrivet_browser::{MountedEditor, key_combo, node_id_of};
use scrivet_core::{Key, KeyCombo, Modifiers};
use web_sys::{Element, KeyboardEvent, KeyboardEventInit};

fn host(id: &str, markup: &str) -> Element {
    let document = gloo_utils::document();
    let el = document.create_element("div").unwrap();
    el.set_id(id);
    el.set_inner_html(markup);
    document.body().unwrap().append_child(&el).unwrap();
    el
}

fn mount(id: &str, config: Option<&str>) -> MountedEditor {
    match MountedEditor::new(id, config.map(str::to_string)) {
        Ok(editor) => editor,
        Err(_) => panic!("mounting {id} failed"),
    }
}

fn keydown(key: &str, ctrl: bool) -> KeyboardEvent {
    let init = KeyboardEventInit::new();
    init.set_key(key);
    init.set_ctrl_key(ctrl);
    init.set_bubbles(true);
    init.set_cancelable(true);
    KeyboardEvent::new_with_keyboard_event_init_dict("keydown", &init).unwrap()
}

// === Event translation ===

#[wasm_bindgen_test]
fn test_key_combo_from_event() {
    assert_eq!(key_combo(&keydown("x", false)), KeyCombo::new(Key::character("x")));
    assert_eq!(
        key_combo(&keydown("Z", true)),
        KeyCombo::with_modifiers(Key::character("Z"), Modifiers::CTRL)
    );
    assert_eq!(key_combo(&keydown("Backspace", false)).key, Key::Backspace);
}

#[wasm_bindgen_test]
fn test_node_id_from_rendered_element() {
    let el = host("scrivet-ids", r#"<p data-node-id="4"><b data-node-id="7">x</b></p>"#);
    let bold = el.query_selector("b").unwrap().unwrap();
    assert_eq!(node_id_of(&bold).map(|n| n.index()), Some(7));
    let p = el.query_selector("p").unwrap().unwrap();
    assert_eq!(node_id_of(&p).map(|n| n.index()), Some(4));
    assert_eq!(node_id_of(&el), None);
    el.remove();
}

// === Mounting ===

#[wasm_bindgen_test]
fn test_mount_renders_node_ids() {
    let el = host("scrivet-mount", "<p>ab</p>");
    let editor = mount("scrivet-mount", None);
    assert_eq!(editor.content(), "<p>ab</p>");
    assert!(el.query_selector("p[data-node-id]").unwrap().is_some());
    assert!(el.query_selector(".caret").unwrap().is_some());
    editor.unmount();
    assert_eq!(el.inner_html(), "<p>ab</p>");
    el.remove();
}

#[wasm_bindgen_test]
fn test_keydown_types_and_undoes() {
    let el = host("scrivet-keys", "<p>ab</p>");
    let editor = mount("scrivet-keys", None);

    let typed = keydown("x", false);
    el.dispatch_event(&typed).unwrap();
    assert!(typed.default_prevented());
    assert_eq!(editor.content(), "<p>abx</p>");

    el.dispatch_event(&keydown("z", true)).unwrap();
    assert_eq!(editor.content(), "<p>ab</p>");
    assert!(editor.redo());
    assert_eq!(editor.content(), "<p>abx</p>");
    editor.unmount();
    el.remove();
}

#[wasm_bindgen_test]
fn test_command_and_config() {
    let el = host("scrivet-cmd", "<p>one</p>");
    let editor = mount(
        "scrivet-cmd",
        Some(r#"{"shortcuts": {"ctrl+1": "setBlockType h1"}}"#),
    );
    assert_eq!(editor.do_command("setBlocks text-align right"), 1);
    el.dispatch_event(&keydown("1", true)).unwrap();
    assert_eq!(editor.content(), r#"<h1 style="text-align: right">one</h1>"#);
    assert!(el.query_selector("h1[data-node-id]").unwrap().is_some());
    editor.unmount();
    el.remove();
}

#[wasm_bindgen_test]
fn test_missing_host_is_an_error() {
    assert!(MountedEditor::new("scrivet-nowhere", None).is_err());
    assert!(MountedEditor::new("scrivet-nowhere", Some("{".into())).is_err());
}

#[wasm_bindgen_test]
fn test_change_callback_can_read_the_editor() {
    let el = host("scrivet-reentrant", "<p>ab</p>");
    let editor = mount("scrivet-reentrant", None);
    editor.set_on_change(js_sys::Function::new_with_args(
        "json",
        "if (window.__scrivetSeen === undefined) { window.__scrivetSeen = window.__scrivetEditor.getContent(); }",
    ));
    let window = gloo_utils::window();
    js_sys::Reflect::set(&window, &"__scrivetEditor".into(), &editor.into()).unwrap();

    el.dispatch_event(&keydown("x", false)).unwrap();

    let seen = js_sys::Reflect::get(&window, &"__scrivetSeen".into()).unwrap();
    assert_eq!(seen.as_string().as_deref(), Some("<p>abx</p>"));
    el.remove();
}
