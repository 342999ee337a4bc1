use super::*;
use crate::markup::{MarkupOptions, inner_markup, parse_into};
use crate::tree::Tree;

fn setup(markup: &str) -> (Tree, Selectable) {
    let mut tree = Tree::new("div");
    let root = tree.root();
    parse_into(&mut tree, root, markup).unwrap();
    let selectable = Selectable::attach(&mut tree).unwrap();
    (tree, selectable)
}

fn html(tree: &Tree) -> String {
    inner_markup(tree, tree.root(), MarkupOptions::SNAPSHOT)
}

fn selected_text(tree: &Tree, sel: &Selectable) -> Vec<String> {
    sel.selected_leaf_nodes(tree)
        .into_iter()
        .map(|n| tree.text_content(n))
        .collect()
}

struct NoLayout;

impl Geometry for NoLayout {
    fn bounding_rect(&self, _: &Tree, _: NodeId) -> Option<Rect> {
        None
    }
}

#[test]
fn test_mark_bounds_orders_markers() {
    let (mut tree, sel) = setup(
        r#"<p>ab<span class="sel-end caret"></span>cd<span class="sel-start"></span>e</p>"#,
    );
    sel.mark_bounds(&mut tree).unwrap();
    insta::assert_snapshot!(
        html(&tree),
        @r#"<p class="selected-block first-block last-block">ab<span class="sel-start"></span><span class="selected">cd</span><span class="sel-end caret"></span>e</p>"#
    );
    let start = sel.start(&tree).unwrap();
    let caret = sel.caret(&tree).unwrap();
    assert!(crate::traverse::is_before(&tree, start, caret));
}

#[test]
fn test_collapsed_caret_marks_only_its_block() {
    let (mut tree, sel) = setup(r#"<p>ab<span class="sel-end caret"></span>c</p><p>d</p>"#);
    sel.mark_bounds(&mut tree).unwrap();
    insta::assert_snapshot!(
        html(&tree),
        @r#"<p class="selected-block first-block last-block">ab<span class="sel-end caret"></span>c</p><p>d</p>"#
    );
    assert!(sel.is_collapsed(&tree));
    assert!(sel.selected_leaf_nodes(&tree).is_empty());
}

#[test]
fn test_range_across_blocks() {
    let (mut tree, sel) = setup(
        r#"<p>a<span class="sel-start"></span>b</p><p>c</p><p>d<span class="sel-end caret"></span>e</p>"#,
    );
    sel.mark_bounds(&mut tree).unwrap();
    insta::assert_snapshot!(
        html(&tree),
        @r#"<p class="selected-block first-block">a<span class="sel-start"></span><span class="selected">b</span></p><p class="selected-block"><span class="selected">c</span></p><p class="selected-block last-block"><span class="selected">d</span><span class="sel-end caret"></span>e</p>"#
    );
    assert_eq!(selected_text(&tree, &sel), vec!["b", "c", "d"]);
    assert_eq!(sel.selected_blocks(&tree).len(), 3);
}

#[test]
fn test_not_selectable_content_is_skipped() {
    let (mut tree, sel) = setup(
        r#"<p>a<span class="sel-start"></span>b<span class="not-selectable">x</span>c<span class="sel-end caret"></span></p>"#,
    );
    sel.mark_bounds(&mut tree).unwrap();
    insta::assert_snapshot!(
        html(&tree),
        @r#"<p class="selected-block first-block last-block">a<span class="sel-start"></span><span class="selected">b</span><span class="not-selectable">x</span><span class="selected">c</span><span class="sel-end caret"></span></p>"#
    );
    assert_eq!(selected_text(&tree, &sel), vec!["b", "c"]);
}

#[test]
fn test_empty_range_drops_start() {
    let (mut tree, sel) = setup(
        r#"<p>ab<span class="sel-start"></span><span class="sel-end caret"></span>c</p>"#,
    );
    sel.mark_bounds(&mut tree).unwrap();
    assert!(sel.is_collapsed(&tree));
    insta::assert_snapshot!(
        html(&tree),
        @r#"<p class="selected-block first-block last-block">ab<span class="sel-end caret"></span>c</p>"#
    );
}

#[test]
fn test_only_child_text_marks_its_wrapper() {
    let (mut tree, sel) = setup(
        r#"<p><span class="sel-start"></span><b>bold</b><span class="sel-end caret"></span>x</p>"#,
    );
    sel.mark_bounds(&mut tree).unwrap();
    insta::assert_snapshot!(
        html(&tree),
        @r#"<p class="selected-block first-block last-block"><span class="sel-start"></span><b class="selected">bold</b><span class="sel-end caret"></span>x</p>"#
    );
}

#[test]
fn test_unmark_restores_plain_markup() {
    let (mut tree, sel) = setup(
        r#"<p>a<span class="sel-start"></span>b</p><p>c<span class="sel-end caret"></span></p>"#,
    );
    sel.mark_bounds(&mut tree).unwrap();
    sel.unmark(&mut tree);
    insta::assert_snapshot!(
        html(&tree),
        @r#"<p>a<span class="sel-start"></span>b</p><p>c<span class="sel-end caret"></span></p>"#
    );
}

#[test]
fn test_begin_and_extend_by_position() {
    let (mut tree, mut sel) = setup("<p>abc</p>");
    let (anchor, side) = sel.resolve_position(&mut tree, TextPosition::new(0, 1)).unwrap();
    sel.begin_selection(&mut tree, anchor, side).unwrap();
    let (target, side) = sel.resolve_position(&mut tree, TextPosition::new(0, 2)).unwrap();
    sel.extend_selection(&mut tree, target, side, SelectMode::Character)
        .unwrap();
    insta::assert_snapshot!(
        html(&tree),
        @r#"<p class="selected-block first-block last-block">a<span class="sel-start"></span><span class="selected">b</span><span class="sel-end caret"></span>c</p>"#
    );
}

#[test]
fn test_extend_backwards_keeps_start_first() {
    let (mut tree, mut sel) = setup("<p>abcd</p>");
    let (anchor, side) = sel.resolve_position(&mut tree, TextPosition::new(0, 3)).unwrap();
    sel.begin_selection(&mut tree, anchor, side).unwrap();
    let (target, side) = sel.resolve_position(&mut tree, TextPosition::new(0, 1)).unwrap();
    sel.extend_selection(&mut tree, target, side, SelectMode::Character)
        .unwrap();
    assert_eq!(selected_text(&tree, &sel), vec!["bc"]);
    let start = sel.start(&tree).unwrap();
    let caret = sel.caret(&tree).unwrap();
    assert!(crate::traverse::is_before(&tree, start, caret));
}

#[test]
fn test_block_mode_selects_whole_blocks() {
    let (mut tree, mut sel) = setup("<p>ab</p><p>cd</p><p>ef</p>");
    let (anchor, side) = sel.resolve_position(&mut tree, TextPosition::new(0, 1)).unwrap();
    sel.begin_selection(&mut tree, anchor, side).unwrap();
    let (target, side) = sel.resolve_position(&mut tree, TextPosition::new(1, 1)).unwrap();
    sel.extend_selection(&mut tree, target, side, SelectMode::Block)
        .unwrap();
    assert_eq!(selected_text(&tree, &sel), vec!["a", "b", "c", "d"]);
    let blocks = tree.children(tree.root()).to_vec();
    assert!(tree.has_class(blocks[0], FIRST_BLOCK));
    assert!(tree.has_class(blocks[1], LAST_BLOCK));
    assert!(!tree.has_class(blocks[2], SELECTED_BLOCK));
}

#[test]
fn test_double_click_selects_word() {
    let (mut tree, mut sel) = setup("<p>hello world</p>");
    let text = crate::traverse::first_leaf(&tree, tree.root());
    let hover = PointerInput::new(text, 0.0, 0.0);
    assert!(sel.pointer_move(&mut tree, &NoLayout, &hover).unwrap());
    assert_eq!(tree.with_class(spanify::CHAR_CLASS).len(), 11);

    let o = tree.with_class(spanify::CHAR_CLASS)[7];
    let press = PointerInput {
        click_count: 2,
        ..PointerInput::new(o, 0.0, 0.0)
    };
    assert!(sel.pointer_down(&mut tree, &NoLayout, &press).unwrap());
    assert!(sel.is_selecting());
    assert!(sel.pointer_up(&mut tree, &NoLayout, &press).unwrap());
    assert!(!sel.is_selecting());

    insta::assert_snapshot!(
        html(&tree),
        @r#"<p class="selected-block first-block last-block">hello <span class="sel-start"></span><span class="selected">world</span><span class="sel-end caret"></span></p>"#
    );
}

#[test]
fn test_drag_extends_by_character() {
    let (mut tree, mut sel) = setup("<p>abc</p>");
    let text = crate::traverse::first_leaf(&tree, tree.root());
    sel.pointer_move(&mut tree, &NoLayout, &PointerInput::new(text, 0.0, 0.0))
        .unwrap();
    let spans = tree.with_class(spanify::CHAR_CLASS);
    // NoLayout puts every marker before the hit node.
    sel.pointer_down(&mut tree, &NoLayout, &PointerInput::new(spans[0], 0.0, 0.0))
        .unwrap();
    sel.pointer_move(&mut tree, &NoLayout, &PointerInput::new(spans[2], 0.0, 0.0))
        .unwrap();
    sel.pointer_up(&mut tree, &NoLayout, &PointerInput::new(spans[2], 0.0, 0.0))
        .unwrap();
    insta::assert_snapshot!(
        html(&tree),
        @r#"<p class="selected-block first-block last-block"><span class="sel-start"></span><span class="selected">ab</span><span class="sel-end caret"></span>c</p>"#
    );
}

#[test]
fn test_not_selectable_target_is_ignored() {
    let (mut tree, mut sel) = setup(r#"<p>a<span class="not-selectable">x</span></p>"#);
    let x = tree.with_class(NOT_SELECTABLE)[0];
    let x_text = tree.first_child(x).unwrap();
    sel.begin_selection(&mut tree, x_text, Side::After).unwrap();
    assert!(sel.caret(&tree).is_none());
    let down = PointerInput::new(x_text, 0.0, 0.0);
    assert!(!sel.pointer_down(&mut tree, &NoLayout, &down).unwrap());
}

#[test]
fn test_detached_target_is_unreachable() {
    let (mut tree, mut sel) = setup("<p>a</p>");
    let loose = tree.create_text("x");
    let err = sel.begin_selection(&mut tree, loose, Side::Before).unwrap_err();
    assert_eq!(err, EditorError::Unreachable(loose));
    let root = tree.root();
    let err = sel.mark_range(&mut tree, root, root).unwrap_err();
    assert_eq!(err, EditorError::OutsideRoot(root));
}

#[test]
fn test_attach_twice_is_reported() {
    let (mut tree, sel) = setup("<p>a</p>");
    assert_eq!(
        Selectable::attach(&mut tree).unwrap_err(),
        EditorError::AlreadyAttached
    );
    sel.detach(&mut tree);
    assert!(Selectable::attach(&mut tree).is_ok());
}

#[test]
fn test_normalize_lofts_stray_content() {
    let (tree, _sel) = setup("loose<br> <p>kept</p><p></p>");
    insta::assert_snapshot!(html(&tree), @"<p>loose<br></p><p>kept</p><p></p>");
    let last = tree.last_child(tree.root()).unwrap();
    let children = tree.children(last);
    assert_eq!(children.len(), 1);
    assert!(tree.is_empty_text(children[0]));
}

#[test]
fn test_empty_block_takes_caret_as_child() {
    let (mut tree, mut sel) = setup("<p>a</p><p></p>");
    let empty = tree.last_child(tree.root()).unwrap();
    sel.begin_selection(&mut tree, empty, Side::After).unwrap();
    assert_eq!(tree.parent(sel.caret(&tree).unwrap()), Some(empty));
}

#[test]
fn test_resolve_position_bounds() {
    let (mut tree, sel) = setup("<p>ab<img src=\"x\"></p>");
    let (leaf, side) = sel.resolve_position(&mut tree, TextPosition::new(0, 3)).unwrap();
    assert_eq!(tree.tag(leaf), Some("img"));
    assert_eq!(side, Side::After);
    assert_eq!(
        sel.resolve_position(&mut tree, TextPosition::new(0, 4)).unwrap_err(),
        EditorError::InvalidPosition { block: 0, offset: 4 }
    );
    assert!(sel.resolve_position(&mut tree, TextPosition::new(3, 0)).is_err());
}

#[test]
fn test_range_over_a_bare_block_boundary() {
    let (mut tree, sel) = setup(
        r#"<p>ab<span class="sel-start"></span></p><p><span class="sel-end caret"></span>cd</p>"#,
    );
    sel.mark_bounds(&mut tree).unwrap();
    assert!(!sel.is_collapsed(&tree));
    assert!(sel.selected_leaf_nodes(&tree).is_empty());
    assert_eq!(sel.selected_blocks(&tree).len(), 2);
    insta::assert_snapshot!(
        html(&tree),
        @r#"<p class="selected-block first-block">ab<span class="sel-start"></span></p><p class="selected-block last-block"><span class="sel-end caret"></span>cd</p>"#
    );
}

#[test]
fn test_bare_boundary_range_puts_start_first() {
    let (mut tree, sel) = setup(
        r#"<p>ab<span class="sel-end caret"></span></p><p><span class="sel-start"></span>cd</p>"#,
    );
    sel.mark_bounds(&mut tree).unwrap();
    insta::assert_snapshot!(
        html(&tree),
        @r#"<p class="selected-block first-block">ab<span class="sel-start"></span></p><p class="selected-block last-block"><span class="sel-end caret"></span>cd</p>"#
    );
}

#[test]
fn test_start_at_block_end_survives_marking() {
    let (mut tree, sel) = setup(
        r#"<p>ab<span class="sel-start"></span></p><p>c<span class="sel-end caret"></span>d</p>"#,
    );
    sel.mark_bounds(&mut tree).unwrap();
    assert_eq!(selected_text(&tree, &sel), vec!["c"]);
    insta::assert_snapshot!(
        html(&tree),
        @r#"<p class="selected-block first-block">ab<span class="sel-start"></span></p><p class="selected-block last-block"><span class="selected">c</span><span class="sel-end caret"></span>d</p>"#
    );
}

#[test]
fn test_repeated_gestures_reuse_arena_slots() {
    let (mut tree, mut sel) = setup("<p>hello world</p><p>again</p>");
    for round in 0..200 {
        let block = tree.children(tree.root())[round % 2];
        let text = crate::traverse::leaf_nodes(&tree, block)
            .into_iter()
            .find(|n| tree.is_text(*n))
            .unwrap();
        sel.pointer_move(&mut tree, &NoLayout, &PointerInput::new(text, 0.0, 0.0))
            .unwrap();
        let span = tree.with_class(spanify::CHAR_CLASS)[round % 5];
        let press = PointerInput {
            click_count: 1 + (round % 2) as u32,
            ..PointerInput::new(span, 0.0, 0.0)
        };
        sel.pointer_down(&mut tree, &NoLayout, &press).unwrap();
        sel.pointer_up(&mut tree, &NoLayout, &press).unwrap();
    }
    assert!(tree.arena_len() < 100, "arena grew to {}", tree.arena_len());
    assert!(tree.with_class(spanify::CHAR_CLASS).is_empty());
    sel.unmark(&mut tree);
    sel.remove_bounds(&mut tree);
    let root = tree.root();
    tree.normalize(root);
    assert_eq!(
        inner_markup(&tree, root, MarkupOptions::CONTENT),
        "<p>hello world</p><p>again</p>"
    );
}
