//! Deferred delivery of editor events.
//!
//! The editor emits while a DOM handler still holds it mutably borrowed.
//! Events are parked here and handed to host callbacks only once that
//! borrow is gone, so a callback may call straight back into the editor.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use scrivet_core::EditorEvent;

#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    pending: Rc<RefCell<VecDeque<EditorEvent>>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listener for `Editor::on_event` that parks every event.
    pub fn listener(&self) -> impl FnMut(&EditorEvent) + 'static {
        let pending = self.pending.clone();
        move |event| pending.borrow_mut().push_back(event.clone())
    }

    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }

    /// Deliver parked events in order, including any queued by `deliver`
    /// itself. No borrow of the queue is held while `deliver` runs.
    pub fn drain(&self, mut deliver: impl FnMut(EditorEvent)) {
        loop {
            let next = self.pending.borrow_mut().pop_front();
            match next {
                Some(event) => deliver(event),
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrivet_core::{Editor, EditorConfig};

    fn shared(markup: &str) -> (Rc<RefCell<Editor>>, EventQueue) {
        let queue = EventQueue::new();
        let mut editor = Editor::from_markup(markup, EditorConfig::default()).unwrap();
        editor.on_event(queue.listener());
        (Rc::new(RefCell::new(editor)), queue)
    }

    #[test]
    fn test_events_wait_for_the_edit_to_finish() {
        let (editor, queue) = shared("<p>ab</p>");
        editor.borrow_mut().insert_text("x").unwrap();
        assert!(!queue.is_empty());

        let mut seen = Vec::new();
        queue.drain(|event| {
            // The editor is free again by the time callbacks run.
            let content = editor.borrow().content_markup();
            seen.push((event, content));
        });
        assert!(queue.is_empty());
        assert!(seen.iter().all(|(_, content)| content == "<p>abx</p>"));
        assert!(matches!(seen.last(), Some((EditorEvent::ToolsChanged(state), _)) if state.can_undo));
    }

    #[test]
    fn test_callbacks_may_edit_again() {
        let (editor, queue) = shared("<p>ab</p>");
        editor.borrow_mut().insert_text("x").unwrap();

        let mut delivered = 0;
        queue.drain(|_| {
            delivered += 1;
            if delivered == 1 {
                editor.borrow_mut().do_command("setBlockType h2");
            }
        });
        assert!(delivered > 1);
        assert!(queue.is_empty());
        assert_eq!(editor.borrow().content_markup(), "<h2>abx</h2>");
    }
}
