//! Integration tests: performance ("tuned") mode.
//!
//! Large visible sets are windowed to the viewport plus two rows of overscan,
//! and the container reports the full synthetic height.

use treeview_core::{NodeId, RawNode, Transition, Tree, TreeOptions};

const CHILDREN: usize = 5000;

/// R → P → c0..c4999
fn big_tree() -> Tree {
    let mut nodes = vec![
        RawNode::new("R").with("label", "root"),
        RawNode::new("P").with("label", "parent").with("parentId", "R"),
    ];
    nodes.extend(
        (0..CHILDREN).map(|i| RawNode::new(format!("c{i}")).with("label", format!("child {i}")).with("parentId", "P")),
    );
    Tree::with_nodes(TreeOptions::default(), nodes).unwrap()
}

#[test]
fn expand_all_windows_five_thousand_rows() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut tree = big_tree();
    tree.collapse_all();
    assert!(!tree.is_tuned());
    assert_eq!(tree.visible_count(), 2);
    assert_eq!(tree.container_height(), None);

    tree.expand_all();
    let options = tree.options();
    let bound = (options.viewport_height / options.height) as usize + 5;
    assert!(tree.is_tuned());
    assert_eq!(tree.visible_count(), CHILDREN + 2);
    assert!(tree.rows().count() <= bound, "{} rows rendered", tree.rows().count());
    assert_eq!(
        tree.container_height(),
        Some((CHILDREN + 2) as f32 * options.height)
    );
    assert_eq!(tree.last_patch().unwrap().transition, Transition::Immediate);
}

#[test]
fn window_follows_the_scroll_position() {
    let mut tree = big_tree();
    let top = tree.scroll_to(40_000.0);
    assert_eq!(top, 40_000.0);
    let height = tree.options().height;
    let first = tree.rows().next().unwrap().y;
    let last = tree.rows().last().unwrap().y;
    assert!(first >= top - 2.0 * height);
    assert!(last <= top + tree.viewport().height + 2.0 * height);
    assert!(tree.row(NodeId::intern("R")).is_none());

    // Clamped to the content.
    let max = tree.content_height() - tree.viewport().height;
    assert_eq!(tree.scroll_to(1.0e9), max);
    assert!(tree.row(NodeId::intern("c4999")).is_some());
}

#[test]
fn scroll_into_view_reaches_far_rows() {
    let mut tree = big_tree();
    let target = NodeId::intern("c2500");
    assert!(tree.row(target).is_none());
    assert!(tree.scroll_into_view(target));
    assert!(tree.row(target).is_some());
    assert!(!tree.scroll_into_view(NodeId::intern("missing")));
}

#[test]
fn leaving_tuned_mode_restores_natural_sizing() {
    let mut tree = big_tree();
    assert!(tree.is_tuned());
    tree.toggle(NodeId::intern("P"));
    assert!(!tree.is_tuned());
    assert_eq!(tree.container_height(), None);
    assert_eq!(tree.rows().count(), 2);
}
