//! HTML-subset codec for the document tree.
//!
//! The serializer produces the markup used for undo snapshots, rendering and
//! content export. The parser accepts the same subset: elements with quoted
//! or bare attributes, text with the common entities, comments (skipped),
//! void tags and `/>`.
//!
//! Boundary markers have a fixed serialized form, see [`START_MARKUP`] and
//! [`CARET_MARKUP`]. Parsing either form yields a marker node.

use smol_str::SmolStr;

use crate::tree::{Bound, Element, NodeId, NodeKind, Tree, is_void_tag};

pub const START_MARKUP: &str = r#"<span class="sel-start"></span>"#;
pub const CARET_MARKUP: &str = r#"<span class="sel-end caret"></span>"#;

/// Classes that only describe selection or hit-testing state.
pub const TRANSIENT_CLASSES: &[&str] = &[
    "selected",
    "selected-block",
    "first-block",
    "last-block",
    "spanified",
    "spanified-word",
];

/// What to include when serializing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkupOptions {
    /// Emit boundary markers.
    pub markers: bool,
    /// Keep selection and spanification classes and their wrapper spans.
    pub selection: bool,
    /// Tag every element with `data-node-id` for hit-testing.
    pub node_ids: bool,
}

impl MarkupOptions {
    /// Everything the undo history needs to restore a state exactly.
    pub const SNAPSHOT: Self = Self {
        markers: true,
        selection: true,
        node_ids: false,
    };

    /// Document content only.
    pub const CONTENT: Self = Self {
        markers: false,
        selection: false,
        node_ids: false,
    };

    /// Live rendering into a host element.
    pub const RENDER: Self = Self {
        markers: true,
        selection: true,
        node_ids: true,
    };
}

impl Default for MarkupOptions {
    fn default() -> Self {
        Self::SNAPSHOT
    }
}

/// Serialize the children of `node`.
pub fn inner_markup(tree: &Tree, node: NodeId, options: MarkupOptions) -> String {
    let mut out = String::new();
    for child in tree.children(node) {
        write_node(tree, *child, options, &mut out);
    }
    out
}

/// Serialize `node` itself.
pub fn outer_markup(tree: &Tree, node: NodeId, options: MarkupOptions) -> String {
    let mut out = String::new();
    write_node(tree, node, options, &mut out);
    out
}

fn write_node(tree: &Tree, node: NodeId, options: MarkupOptions, out: &mut String) {
    match tree.kind(node) {
        NodeKind::Text(text) => escape_text(text, out),
        NodeKind::Marker(bound) => {
            if !options.markers {
                return;
            }
            let class = match bound {
                Bound::Start => "sel-start",
                Bound::Caret => "sel-end caret",
            };
            out.push_str("<span class=\"");
            out.push_str(class);
            out.push('"');
            if options.node_ids {
                push_node_id(node, out);
            }
            out.push_str("></span>");
        }
        NodeKind::Element(element) => write_element(tree, node, element, options, out),
    }
}

fn write_element(
    tree: &Tree,
    node: NodeId,
    element: &Element,
    options: MarkupOptions,
    out: &mut String,
) {
    let classes: Vec<&str> = element
        .classes
        .iter()
        .map(SmolStr::as_str)
        .filter(|c| options.selection || !TRANSIENT_CLASSES.contains(c))
        .collect();

    // A wrapper that only existed to carry selection state disappears.
    let transient_wrapper = !options.selection
        && element.tag == "span"
        && classes.is_empty()
        && element.style.is_empty()
        && element.attrs.is_empty()
        && !element.classes.is_empty();
    if transient_wrapper {
        for child in tree.children(node) {
            write_node(tree, *child, options, out);
        }
        return;
    }

    out.push('<');
    out.push_str(&element.tag);
    if !classes.is_empty() {
        out.push_str(" class=\"");
        escape_attr(&classes.join(" "), out);
        out.push('"');
    }
    if !element.style.is_empty() {
        out.push_str(" style=\"");
        escape_attr(&style_to_string(&element.style), out);
        out.push('"');
    }
    for (name, value) in &element.attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        escape_attr(value, out);
        out.push('"');
    }
    if options.node_ids {
        push_node_id(node, out);
    }
    out.push('>');
    if is_void_tag(&element.tag) {
        return;
    }
    for child in tree.children(node) {
        write_node(tree, *child, options, out);
    }
    out.push_str("</");
    out.push_str(&element.tag);
    out.push('>');
}

fn push_node_id(node: NodeId, out: &mut String) {
    out.push_str(" data-node-id=\"");
    out.push_str(&node.to_string());
    out.push('"');
}

fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

fn escape_attr(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

/// `font-weight: bold; color: red`
pub fn style_to_string(style: &[(SmolStr, String)]) -> String {
    style
        .iter()
        .map(|(p, v)| format!("{p}: {v}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Parse a `style` attribute into declarations. Malformed entries are skipped.
pub fn parse_style(style: &str) -> Vec<(SmolStr, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (property, value) = decl.split_once(':')?;
            let property = property.trim();
            let value = value.trim();
            (!property.is_empty() && !value.is_empty())
                .then(|| (SmolStr::from(property.to_ascii_lowercase()), value.to_string()))
        })
        .collect()
}

/// Error produced while parsing markup.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed markup at byte {offset}: {kind}")]
pub struct MarkupError {
    pub offset: usize,
    pub kind: MarkupErrorKind,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MarkupErrorKind {
    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("expected a tag name")]
    MissingTagName,

    #[error("closing tag </{found}> does not match <{expected}>")]
    MismatchedClose { expected: SmolStr, found: SmolStr },

    #[error("unexpected closing tag </{0}>")]
    UnexpectedClose(SmolStr),

    #[error("unterminated attribute value")]
    UnterminatedAttribute,
}

/// Parse `markup` and append the resulting nodes to `parent`.
///
/// Returns the top-level nodes created. On error the nodes parsed so far
/// stay attached; callers that need atomicity parse into a scratch element.
pub fn parse_into(
    tree: &mut Tree,
    parent: NodeId,
    markup: &str,
) -> Result<Vec<NodeId>, MarkupError> {
    Parser { src: markup, pos: 0 }.run(tree, parent)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

struct StartTag {
    name: SmolStr,
    element: Element,
    self_closing: bool,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn error(&self, kind: MarkupErrorKind) -> MarkupError {
        MarkupError {
            offset: self.pos,
            kind,
        }
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn at_tag_open(&self) -> bool {
        let rest = self.rest();
        rest.starts_with("<!--")
            || rest.starts_with("</")
            || (rest.starts_with('<')
                && rest[1..].chars().next().is_some_and(|c| c.is_ascii_alphabetic()))
    }

    fn run(&mut self, tree: &mut Tree, parent: NodeId) -> Result<Vec<NodeId>, MarkupError> {
        let mut stack: Vec<(NodeId, SmolStr)> = Vec::new();
        let mut top = Vec::new();

        while self.pos < self.src.len() {
            let current = stack.last().map(|(id, _)| *id).unwrap_or(parent);
            let rest = self.rest();

            if rest.starts_with("<!--") {
                match rest.find("-->") {
                    Some(end) => self.pos += end + 3,
                    None => return Err(self.error(MarkupErrorKind::UnexpectedEof)),
                }
            } else if rest.starts_with("</") {
                self.pos += 2;
                let name = self.tag_name()?;
                self.skip_whitespace();
                if self.bump() != Some('>') {
                    return Err(self.error(MarkupErrorKind::UnexpectedEof));
                }
                match stack.pop() {
                    Some((_, open)) if open == name => {}
                    Some((_, open)) => {
                        return Err(self.error(MarkupErrorKind::MismatchedClose {
                            expected: open,
                            found: name,
                        }));
                    }
                    None => return Err(self.error(MarkupErrorKind::UnexpectedClose(name))),
                }
            } else if self.at_tag_open() {
                self.pos += 1;
                let tag = self.start_tag()?;
                let node = tree.create(classify(tag.element));
                tree.append_child(current, node);
                if current == parent {
                    top.push(node);
                }
                if !tag.self_closing && !is_void_tag(&tag.name) {
                    stack.push((node, tag.name));
                }
            } else {
                let text = self.text_run();
                let node = tree.create_text(decode_entities(text));
                tree.append_child(current, node);
                if current == parent {
                    top.push(node);
                }
            }
        }

        if !stack.is_empty() {
            return Err(self.error(MarkupErrorKind::UnexpectedEof));
        }
        Ok(top)
    }

    fn text_run(&mut self) -> &'a str {
        let start = self.pos;
        // Always consume at least one char so a stray '<' becomes text.
        self.bump();
        while self.pos < self.src.len() && !self.at_tag_open() {
            self.bump();
        }
        &self.src[start..self.pos]
    }

    fn tag_name(&mut self) -> Result<SmolStr, MarkupError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ':')
        {
            self.bump();
        }
        if start == self.pos {
            return Err(self.error(MarkupErrorKind::MissingTagName));
        }
        Ok(self.src[start..self.pos].to_ascii_lowercase().into())
    }

    fn start_tag(&mut self) -> Result<StartTag, MarkupError> {
        let name = self.tag_name()?;
        let mut element = Element::new(name.clone());
        loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.starts_with("/>") {
                self.pos += 2;
                return Ok(StartTag {
                    name,
                    element,
                    self_closing: true,
                });
            }
            if rest.starts_with('>') {
                self.pos += 1;
                return Ok(StartTag {
                    name,
                    element,
                    self_closing: false,
                });
            }
            if rest.is_empty() {
                return Err(self.error(MarkupErrorKind::UnexpectedEof));
            }
            let (attr, value) = self.attribute()?;
            match attr.as_str() {
                "class" => element.classes = value.split_whitespace().map(SmolStr::from).collect(),
                "style" => element.style = parse_style(&value),
                _ => element.attrs.push((attr, value)),
            }
        }
    }

    fn attribute(&mut self) -> Result<(SmolStr, String), MarkupError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| !c.is_whitespace() && c != '=' && c != '>' && c != '/')
        {
            self.bump();
        }
        if start == self.pos {
            // Lone '/' not followed by '>'.
            self.bump();
            return Ok((SmolStr::default(), String::new()));
        }
        let name = SmolStr::from(self.src[start..self.pos].to_ascii_lowercase());
        self.skip_whitespace();
        if self.peek() != Some('=') {
            return Ok((name, String::new()));
        }
        self.bump();
        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                let rest = self.rest();
                let Some(end) = rest.find(quote) else {
                    return Err(self.error(MarkupErrorKind::UnterminatedAttribute));
                };
                let raw = &rest[..end];
                self.pos += end + 1;
                raw
            }
            _ => {
                let start = self.pos;
                while self.peek().is_some_and(|c| !c.is_whitespace() && c != '>') {
                    self.bump();
                }
                &self.src[start..self.pos]
            }
        };
        Ok((name, decode_entities(value)))
    }
}

/// Marker spans become marker nodes, everything else stays an element.
fn classify(mut element: Element) -> NodeKind {
    element.attrs.retain(|(name, _)| !name.is_empty());
    if element.tag == "span" {
        if element.has_class("sel-start") {
            return NodeKind::Marker(Bound::Start);
        }
        if element.has_class("sel-end") || element.has_class("caret") {
            return NodeKind::Marker(Bound::Caret);
        }
    }
    NodeKind::Element(element)
}

/// Decode the named entities the serializer emits plus numeric references.
/// Unknown entities are kept literally.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').and_then(|semi| {
            let entity = &rest[1..semi];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity.strip_prefix('#').and_then(|num| {
                    let code = match num.strip_prefix(['x', 'X']) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => num.parse().ok(),
                    };
                    code.and_then(char::from_u32)
                }),
            };
            ch.map(|c| (c, semi + 1))
        });
        match decoded {
            Some((ch, len)) => {
                out.push(ch);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(markup: &str) -> Tree {
        let mut tree = Tree::new("div");
        let root = tree.root();
        parse_into(&mut tree, root, markup).unwrap();
        tree
    }

    #[test]
    fn test_roundtrip_preserves_structure() {
        let src = r#"<p class="x" style="color: red">a &amp; <b>b</b><br>c</p><p><img src="i.png"></p>"#;
        let tree = parse(src);
        assert_eq!(inner_markup(&tree, tree.root(), MarkupOptions::SNAPSHOT), src);
    }

    #[test]
    fn test_markers_parse_as_marker_nodes() {
        let tree = parse(r#"<p>a<span class="sel-start"></span>b<span class="sel-end caret"></span></p>"#);
        let p = tree.children(tree.root())[0];
        let kinds: Vec<_> = tree.children(p).iter().map(|c| tree.marker(*c)).collect();
        assert_eq!(kinds, vec![None, Some(Bound::Start), None, Some(Bound::Caret)]);
        insta::assert_snapshot!(
            inner_markup(&tree, tree.root(), MarkupOptions::CONTENT),
            @"<p>ab</p>"
        );
    }

    #[test]
    fn test_content_strips_selection_wrappers() {
        let tree = parse(
            r#"<p class="selected-block first-block last-block"><span class="selected">ab</span><b class="selected">c</b><span class="note">d</span></p>"#,
        );
        insta::assert_snapshot!(
            inner_markup(&tree, tree.root(), MarkupOptions::CONTENT),
            @r#"<p>ab<b>c</b><span class="note">d</span></p>"#
        );
    }

    #[test]
    fn test_node_ids_are_emitted() {
        let tree = parse("<p>a</p>");
        insta::assert_snapshot!(
            inner_markup(&tree, tree.root(), MarkupOptions::RENDER),
            @r#"<p data-node-id="1">a</p>"#
        );
    }

    #[test]
    fn test_attribute_forms() {
        let tree = parse(r#"<p data-a=1 data-b='two' hidden>x</p>"#);
        let p = tree.children(tree.root())[0];
        assert_eq!(tree.attr(p, "data-a"), Some("1"));
        assert_eq!(tree.attr(p, "data-b"), Some("two"));
        assert_eq!(tree.attr(p, "hidden"), Some(""));
    }

    #[test]
    fn test_self_closing_and_comments() {
        let tree = parse("<p>a<br/><!-- note -->b</p>");
        insta::assert_snapshot!(
            inner_markup(&tree, tree.root(), MarkupOptions::SNAPSHOT),
            @"<p>a<br>b</p>"
        );
    }

    #[test]
    fn test_stray_angle_bracket_is_text() {
        let tree = parse("<p>1 < 2</p>");
        insta::assert_snapshot!(
            inner_markup(&tree, tree.root(), MarkupOptions::SNAPSHOT),
            @"<p>1 &lt; 2</p>"
        );
    }

    #[test]
    fn test_errors() {
        let mut tree = Tree::new("div");
        let root = tree.root();
        let err = parse_into(&mut tree, root, "<p><b>x</p>").unwrap_err();
        assert!(matches!(err.kind, MarkupErrorKind::MismatchedClose { .. }));

        let err = parse_into(&mut tree, root, "<p>x").unwrap_err();
        assert_eq!(err.kind, MarkupErrorKind::UnexpectedEof);

        let err = parse_into(&mut tree, root, "</p>").unwrap_err();
        assert_eq!(err.kind, MarkupErrorKind::UnexpectedClose("p".into()));

        let err = parse_into(&mut tree, root, r#"<p class="x>"#).unwrap_err();
        assert_eq!(err.kind, MarkupErrorKind::UnterminatedAttribute);
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a &lt;b&gt; &#65;&#x42; &bogus; &"), "a <b> AB &bogus; &");
    }

    #[test]
    fn test_parse_style() {
        assert_eq!(
            parse_style("Font-Weight: bold; ;color:red;broken"),
            vec![
                (SmolStr::from("font-weight"), "bold".to_string()),
                (SmolStr::from("color"), "red".to_string()),
            ]
        );
    }
}
