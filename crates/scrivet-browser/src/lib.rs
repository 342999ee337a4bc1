//! Browser DOM layer for the scrivet editor.
//!
//! Mounts an [`Editor`] on a host element: the element's markup becomes the
//! document, DOM events are translated into core input, and the tree is
//! re-rendered into the element after every change. Assumes a
//! `wasm32-unknown-unknown` target environment.
//!
//! - `dom`: rendering and layout queries
//! - `events`: keyboard and mouse event translation
//! - `queue`: deferred delivery of editor events to host callbacks

pub use scrivet_core;

pub mod dom;
pub mod events;
pub mod queue;

use std::cell::RefCell;
use std::rc::Rc;

use gloo_events::{EventListener, EventListenerOptions};
use scrivet_core::{Editor, EditorConfig, EditorEvent, PointerInput, UndoManager};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{ClipboardEvent, Element, KeyboardEvent, MouseEvent};

pub use dom::{BrowserGeometry, render};
pub use events::{key_combo, node_id_of, pointer_input};
pub use queue::EventQueue;

/// Install the panic hook and the console tracing subscriber. Safe to call
/// more than once.
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging() {
    console_error_panic_hook::set_once();

    #[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
    {
        use tracing::Level;
        use tracing::subscriber::set_global_default;
        use tracing_subscriber::Registry;
        use tracing_subscriber::layer::SubscriberExt;

        let console_level = if cfg!(debug_assertions) {
            Level::DEBUG
        } else {
            Level::INFO
        };

        let wasm_layer = tracing_wasm::WASMLayer::new(
            tracing_wasm::WASMLayerConfigBuilder::new()
                .set_max_level(console_level)
                .build(),
        );
        let reg = Registry::default().with(wasm_layer);
        let _ = set_global_default(reg);
    }
}

fn js_error(err: impl std::fmt::Display) -> JsError {
    JsError::new(&err.to_string())
}

/// Everything the DOM listeners share.
///
/// Handlers take the editor borrow only for the edit itself, then call
/// [`Session::settle`] to re-render and deliver queued events.
struct Session {
    editor: RefCell<Editor>,
    events: EventQueue,
    host: Element,
    tools: Option<Element>,
    on_change: RefCell<Option<js_sys::Function>>,
}

type Shared = Rc<Session>;

impl Session {
    fn settle(&self) {
        match self.editor.try_borrow() {
            Ok(editor) => render(&self.host, &editor),
            Err(_) => {
                tracing::warn!("editor busy, render skipped");
                return;
            }
        }
        self.events.drain(|event| {
            if let (EditorEvent::ToolsChanged(state), Some(tools)) = (&event, &self.tools) {
                dom::sync_tools(tools, state);
            }
            // Cloned out so the callback may replace itself.
            let callback = self.on_change.borrow().clone();
            if let Some(callback) = callback {
                notify(&callback, &event);
            }
        });
    }
}

/// An editor mounted on a host element.
///
/// Dropping it (or calling `unmount`) removes every DOM listener.
#[wasm_bindgen]
pub struct MountedEditor {
    session: Shared,
    listeners: Vec<EventListener>,
}

#[wasm_bindgen]
impl MountedEditor {
    /// Mount on the element with id `host_id`. `config_json` is an
    /// `EditorConfig` as JSON; omitted fields take their defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(host_id: &str, config_json: Option<String>) -> Result<MountedEditor, JsError> {
        let document = gloo_utils::document();
        let host = document
            .get_element_by_id(host_id)
            .ok_or_else(|| JsError::new(&format!("no element with id {host_id:?}")))?;
        let config: EditorConfig = match config_json.as_deref() {
            Some(json) => serde_json::from_str(json).map_err(js_error)?,
            None => EditorConfig::default(),
        };
        let tools = config
            .tools
            .as_deref()
            .and_then(|id| document.get_element_by_id(id));

        let mut editor = Editor::from_markup(&host.inner_html(), config).map_err(js_error)?;
        let events = EventQueue::new();
        editor.on_event(events.listener());
        if let Some(tools) = &tools {
            dom::sync_tools(tools, &editor.tool_state());
        }

        if let Err(err) = host.set_attribute("tabindex", "0") {
            tracing::warn!("could not make host focusable: {:?}", err);
        }
        render(&host, &editor);

        let session = Rc::new(Session {
            editor: RefCell::new(editor),
            events,
            host,
            tools,
            on_change: RefCell::new(None),
        });
        let mut listeners = listen_host(&session);
        if let Some(tools) = &session.tools {
            listeners.push(listen_tools(&session, tools));
        }
        tracing::info!(host = host_id, "editor mounted");

        Ok(Self { session, listeners })
    }

    /// Register a function called with every editor event as a JSON string.
    /// It runs after the edit completes and may call back into the editor.
    #[wasm_bindgen(js_name = onChange)]
    pub fn set_on_change(&self, callback: js_sys::Function) {
        *self.session.on_change.borrow_mut() = Some(callback);
    }

    /// Run a command string. Returns how many commands succeeded.
    #[wasm_bindgen(js_name = doCommand)]
    pub fn do_command(&self, command: &str) -> usize {
        let count = self.session.editor.borrow_mut().do_command(command);
        self.session.settle();
        count
    }

    /// Document markup without selection state.
    #[wasm_bindgen(js_name = getContent)]
    pub fn content(&self) -> String {
        self.session.editor.borrow().content_markup()
    }

    /// Replace the document. Does not record undo.
    #[wasm_bindgen(js_name = setContent)]
    pub fn set_content(&self, markup: &str) -> Result<(), JsError> {
        let result = self.session.editor.borrow_mut().set_inner_markup(markup);
        result.map_err(js_error)?;
        self.session.settle();
        Ok(())
    }

    pub fn undo(&self) -> bool {
        let changed = self.session.editor.borrow_mut().undo();
        self.session.settle();
        changed
    }

    pub fn redo(&self) -> bool {
        let changed = self.session.editor.borrow_mut().redo();
        self.session.settle();
        changed
    }

    /// Remove the listeners and leave plain content in the host.
    pub fn unmount(self) {
        let Self { session, listeners } = self;
        drop(listeners);
        let content = session.editor.borrow().content_markup();
        session.host.set_inner_html(&content);
        let _ = session.host.remove_attribute("tabindex");
    }
}

fn notify(callback: &js_sys::Function, event: &EditorEvent) {
    match serde_json::to_string(event) {
        Ok(json) => {
            if let Err(err) = callback.call1(&JsValue::NULL, &JsValue::from_str(&json)) {
                tracing::warn!("change callback threw: {:?}", err);
            }
        }
        Err(err) => tracing::warn!(%err, "could not serialize editor event"),
    }
}

/// Keyboard, pointer and clipboard listeners on the host element.
fn listen_host(session: &Shared) -> Vec<EventListener> {
    let prevent = EventListenerOptions::enable_prevent_default;
    let host = &session.host;
    let mut listeners = Vec::new();

    {
        let session = session.clone();
        listeners.push(EventListener::new_with_options(host, "keydown", prevent(), move |event| {
            let Some(event) = event.dyn_ref::<KeyboardEvent>() else {
                return;
            };
            let combo = key_combo(event);
            let result = session.editor.borrow_mut().keydown(&combo);
            if events::should_prevent_default(result) {
                event.prevent_default();
            }
            session.settle();
        }));
    }

    type PointerStep =
        fn(&mut Editor, &BrowserGeometry, &PointerInput) -> scrivet_core::Result<bool>;
    let steps: [(&str, PointerStep); 3] = [
        ("mousedown", |ed, geo, input| ed.pointer_down(geo, input)),
        ("mousemove", |ed, geo, input| ed.pointer_move(geo, input)),
        ("mouseup", |ed, geo, input| ed.pointer_up(geo, input)),
    ];
    for (name, step) in steps {
        let session = session.clone();
        listeners.push(EventListener::new_with_options(host, name, prevent(), move |event| {
            let Some(input) = event.dyn_ref::<MouseEvent>().and_then(pointer_input) else {
                return;
            };
            if name == "mousedown" {
                // Keep the native selection out of the way.
                event.prevent_default();
                let _ = session
                    .host
                    .dyn_ref::<web_sys::HtmlElement>()
                    .map(|el| el.focus());
            }
            let geometry = BrowserGeometry::new(session.host.clone());
            let result = step(&mut session.editor.borrow_mut(), &geometry, &input);
            match result {
                Ok(true) => session.settle(),
                Ok(false) => {}
                Err(err) => tracing::error!(event = name, %err, "pointer gesture failed"),
            }
        }));
    }

    for name in ["copy", "cut"] {
        let session = session.clone();
        listeners.push(EventListener::new_with_options(host, name, prevent(), move |event| {
            let Some(event) = event.dyn_ref::<ClipboardEvent>() else {
                return;
            };
            let Some(data) = event.clipboard_data() else {
                return;
            };
            let text = if name == "cut" {
                let cut = session.editor.borrow_mut().cut_text();
                match cut {
                    Ok(text) => text,
                    Err(err) => {
                        tracing::error!(%err, "cut failed");
                        return;
                    }
                }
            } else {
                session.editor.borrow().copy_text()
            };
            if let Err(err) = data.set_data("text/plain", &text) {
                tracing::warn!("clipboard write failed: {:?}", err);
            }
            event.prevent_default();
            session.settle();
        }));
    }

    {
        let session = session.clone();
        listeners.push(EventListener::new_with_options(host, "paste", prevent(), move |event| {
            let Some(event) = event.dyn_ref::<ClipboardEvent>() else {
                return;
            };
            event.prevent_default();
            let text = event
                .clipboard_data()
                .and_then(|data| data.get_data("text/plain").ok())
                .unwrap_or_default();
            let pasted = session.editor.borrow_mut().paste_text(&text);
            if let Err(err) = pasted {
                tracing::error!(%err, "paste failed");
            }
            session.settle();
        }));
    }

    listeners
}

/// Clicks on `[data-command]` elements inside the tools container run
/// their command string.
fn listen_tools(session: &Shared, tools: &Element) -> EventListener {
    let session = session.clone();
    EventListener::new(tools, "click", move |event| {
        let Some(target) = event.target().and_then(|t| t.dyn_into::<Element>().ok()) else {
            return;
        };
        let Some(command) = target
            .closest("[data-command]")
            .ok()
            .flatten()
            .and_then(|el| el.get_attribute("data-command"))
        else {
            return;
        };
        let ran = session.editor.borrow_mut().do_command(&command);
        tracing::debug!(%command, ran, "tool command");
        session.settle();
    })
}
