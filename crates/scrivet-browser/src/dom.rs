//! Mirroring the core tree into the DOM, and layout queries back out.

use scrivet_core::{Editor, Geometry, NodeId, Rect, Tree};
use web_sys::Element;

use crate::events::NODE_ID_ATTR;

/// Replace the host element's content with the editor's rendered markup.
///
/// The markup carries `data-node-id` on every element so that later events
/// can be mapped back onto tree nodes.
pub fn render(host: &Element, editor: &Editor) {
    host.set_inner_html(&editor.render_markup());
}

/// Rendered element for `node`, if it is currently in the host.
pub fn element_for(host: &Element, node: NodeId) -> Option<Element> {
    host.query_selector(&format!("[{NODE_ID_ATTR}=\"{node}\"]"))
        .ok()
        .flatten()
}

/// Answers hit-testing geometry from the live layout of a host element.
pub struct BrowserGeometry {
    host: Element,
}

impl BrowserGeometry {
    pub fn new(host: Element) -> Self {
        Self { host }
    }
}

impl Geometry for BrowserGeometry {
    fn bounding_rect(&self, _tree: &Tree, node: NodeId) -> Option<Rect> {
        let rect = element_for(&self.host, node)?.get_bounding_client_rect();
        Some(Rect {
            left: rect.left(),
            top: rect.top(),
            width: rect.width(),
            height: rect.height(),
        })
    }
}

/// Reflect toolbar state onto the tools container as data attributes.
pub fn sync_tools(tools: &Element, state: &scrivet_core::ToolState) {
    let flag = |b: bool| if b { "true" } else { "false" };
    let result = tools
        .set_attribute("data-can-undo", flag(state.can_undo))
        .and_then(|_| tools.set_attribute("data-can-redo", flag(state.can_redo)));
    if let Err(err) = result {
        tracing::warn!("failed to update tool state: {:?}", err);
    }
    match &state.block_tag {
        Some(tag) => {
            if let Err(err) = tools.set_attribute("data-block-tag", tag) {
                tracing::warn!("failed to update block tag: {:?}", err);
            }
        }
        None => {
            let _ = tools.remove_attribute("data-block-tag");
        }
    }
}
