//! Integration tests: pointer input → drag controller → tree structure.
//!
//! Exercises live previews, legality fallbacks, rollback, auto-scroll and
//! the events a drag leaves behind.

use pretty_assertions::assert_eq;
use treeview_core::{DragPolicy, NodeId, RawNode, SelectOptions, Tree, TreeEvent, TreeOptions};
use treeview_editor::{DragController, DragOutcome, DragPhase, InputEvent, TreeAction};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn node(id: &str, parent: Option<&str>) -> RawNode {
    let raw = RawNode::new(id).with("label", id);
    match parent {
        Some(p) => raw.with("parentId", p),
        None => raw,
    }
}

fn id(s: &str) -> NodeId {
    NodeId::intern(s)
}

/// Rejects drops under the listed parents.
struct NoDropInto(&'static [&'static str]);

impl DragPolicy for NoDropInto {
    fn droppable(&self, _node: &RawNode, parent: Option<&RawNode>) -> bool {
        let parent = parent.and_then(|p| p.get("id")).and_then(|v| v.as_str());
        !parent.is_some_and(|p| self.0.contains(&p))
    }
}

/// Pins the listed nodes in place.
struct Pinned(&'static [&'static str]);

impl DragPolicy for Pinned {
    fn movable(&self, node: &RawNode) -> bool {
        let id = node.get("id").and_then(|v| v.as_str());
        !id.is_some_and(|n| self.0.contains(&n))
    }
}

/// R, A, A1, B, C at y = 0, 20, 40, 60, 80.
fn nodes() -> Vec<RawNode> {
    vec![
        node("R", None),
        node("A", Some("R")),
        node("A1", Some("A")),
        node("B", Some("R")),
        node("C", Some("R")),
    ]
}

fn editable(tree: Tree) -> (Tree, DragController) {
    let mut tree = tree;
    tree.editable(true);
    let drag = DragController::for_tree(&tree);
    (tree, drag)
}

fn down(y: f32) -> InputEvent {
    InputEvent::PointerDown { x: 10.0, y }
}

fn to(y: f32) -> InputEvent {
    InputEvent::PointerMove { x: 10.0, y }
}

fn up(y: f32) -> InputEvent {
    InputEvent::PointerUp { x: 10.0, y }
}

// ─── Drops ──────────────────────────────────────────────────────────────

#[test]
fn dropping_on_the_lower_part_embeds_as_first_child() {
    init_logger();
    let (mut tree, mut drag) = editable(Tree::with_nodes(TreeOptions::default(), nodes()).unwrap());

    drag.handle(&mut tree, &down(85.0));
    assert_eq!(drag.handle(&mut tree, &to(33.0)), DragOutcome::Started(id("C")));
    // The list already shows the drop.
    assert_eq!(tree.children_of(id("A")), vec![id("C"), id("A1")]);
    assert_eq!(tree.row(id("C")).unwrap().y, 40.0);

    let outcome = drag.handle(&mut tree, &up(33.0));
    assert_eq!(
        outcome,
        DragOutcome::Dropped {
            node: id("C"),
            moved: true,
            rolled_back: false
        }
    );
    assert_eq!(
        tree.take_events(),
        vec![
            TreeEvent::DndStart(id("C")),
            TreeEvent::Move {
                node: id("C"),
                new_parent: Some(id("A")),
                previous_parent: Some(id("R")),
                new_index: 0,
                previous_index: 2,
            },
            TreeEvent::DndStop(id("C")),
        ]
    );
    assert_eq!(drag.phase(), DragPhase::Idle);
    tree.store().validate().unwrap();
}

#[test]
fn dropping_on_the_upper_part_inserts_before() {
    let (mut tree, mut drag) = editable(Tree::with_nodes(TreeOptions::default(), nodes()).unwrap());
    drag.handle(&mut tree, &down(85.0));
    drag.handle(&mut tree, &to(68.0));
    drag.handle(&mut tree, &up(68.0));
    assert_eq!(tree.children_of(id("R")), vec![id("A"), id("C"), id("B")]);
}

#[test]
fn top_edge_below_an_open_subtree_appends_to_it() {
    let (mut tree, mut drag) = editable(Tree::with_nodes(TreeOptions::default(), nodes()).unwrap());
    drag.handle(&mut tree, &down(85.0));
    // B's top edge, just under A1: the end of A's child list.
    drag.handle(&mut tree, &to(62.0));
    assert_eq!(tree.children_of(id("A")), vec![id("A1"), id("C")]);
    assert_eq!(tree.row(id("C")).unwrap().y, 60.0);
    assert_eq!(tree.row(id("C")).unwrap().depth, 2);

    drag.handle(&mut tree, &up(62.0));
    assert_eq!(
        tree.take_events(),
        vec![
            TreeEvent::DndStart(id("C")),
            TreeEvent::Move {
                node: id("C"),
                new_parent: Some(id("A")),
                previous_parent: Some(id("R")),
                new_index: 1,
                previous_index: 2,
            },
            TreeEvent::DndStop(id("C")),
        ]
    );
    tree.store().validate().unwrap();
}

#[test]
fn dropping_back_where_it_started_emits_no_move() {
    let (mut tree, mut drag) = editable(Tree::with_nodes(TreeOptions::default(), nodes()).unwrap());
    drag.handle(&mut tree, &down(65.0));
    drag.handle(&mut tree, &to(33.0));
    assert_eq!(tree.parent_of(id("B")), Some(id("A")));
    // C now sits at 80..100; the lower half of its upper part puts B back
    // before it.
    drag.handle(&mut tree, &to(88.0));
    let outcome = drag.handle(&mut tree, &up(88.0));
    assert_eq!(tree.position_of(id("B")), Some((Some(id("R")), 1)));
    assert!(matches!(outcome, DragOutcome::Dropped { moved: false, .. }));
    let events = tree.take_events();
    assert!(events.iter().all(|e| !matches!(e, TreeEvent::Move { .. })));
    assert_eq!(events.last(), Some(&TreeEvent::DndStop(id("B"))));
}

// ─── Legality ───────────────────────────────────────────────────────────

#[test]
fn illegal_final_frame_rolls_back_the_preview() {
    let tree = Tree::with_nodes(TreeOptions::default(), nodes())
        .unwrap()
        .with_policy(NoDropInto(&["B", "R"]));
    let (mut tree, mut drag) = editable(tree);

    drag.handle(&mut tree, &down(85.0));
    drag.handle(&mut tree, &to(33.0));
    assert_eq!(tree.parent_of(id("C")), Some(id("A")));
    assert!(!drag.is_illegal());

    // C now sits at 40..60 and B at 80..100; B's lower part is off limits,
    // and so is the fallback under R.
    assert_eq!(
        drag.handle(&mut tree, &to(95.0)),
        DragOutcome::Moved { legal: false }
    );
    assert!(drag.is_illegal());

    let outcome = drag.handle(&mut tree, &up(95.0));
    assert_eq!(
        outcome,
        DragOutcome::Dropped {
            node: id("C"),
            moved: false,
            rolled_back: true
        }
    );
    assert_eq!(tree.position_of(id("C")), Some((Some(id("R")), 2)));
    assert_eq!(
        tree.take_events(),
        vec![TreeEvent::DndStart(id("C")), TreeEvent::DndStop(id("C"))]
    );
    tree.store().validate().unwrap();
}

#[test]
fn rejected_embed_retries_after_the_candidate_parent() {
    let tree = Tree::with_nodes(TreeOptions::default(), nodes())
        .unwrap()
        .with_policy(NoDropInto(&["A"]));
    let (mut tree, mut drag) = editable(tree);

    drag.handle(&mut tree, &down(85.0));
    drag.handle(&mut tree, &to(33.0));
    assert_eq!(tree.children_of(id("R")), vec![id("A"), id("C"), id("B")]);
    assert!(!drag.is_illegal());

    drag.handle(&mut tree, &up(33.0));
    let moved = tree.take_events().into_iter().find_map(|e| match e {
        TreeEvent::Move {
            new_index,
            previous_index,
            ..
        } => Some((new_index, previous_index)),
        _ => None,
    });
    assert_eq!(moved, Some((1, 2)));
}

#[test]
fn pinned_rows_only_click() {
    let tree = Tree::with_nodes(TreeOptions::default(), nodes())
        .unwrap()
        .with_policy(Pinned(&["B"]));
    let (mut tree, mut drag) = editable(tree);

    assert_eq!(drag.handle(&mut tree, &down(65.0)), DragOutcome::Pressed(id("B")));
    assert_eq!(drag.phase(), DragPhase::Idle);
    assert_eq!(drag.handle(&mut tree, &to(10.0)), DragOutcome::Ignored);
    assert_eq!(drag.handle(&mut tree, &up(10.0)), DragOutcome::Click(id("B")));
    assert_eq!(tree.selected(), Some(id("B")));
    assert_eq!(tree.take_events(), vec![TreeEvent::Select(id("B"))]);
}

#[test]
fn a_click_during_search_leaves_search_mode() {
    let (mut tree, mut drag) = editable(Tree::with_nodes(TreeOptions::default(), nodes()).unwrap());
    tree.search(Some("A1"));
    assert_eq!(tree.visible_ids(), vec![id("A1")]);
    drag.handle(&mut tree, &down(5.0));
    assert_eq!(drag.handle(&mut tree, &up(5.0)), DragOutcome::Click(id("A1")));
    assert!(!tree.is_searching());
    assert_eq!(tree.selected(), Some(id("A1")));
}

// ─── Auto-scroll ────────────────────────────────────────────────────────

#[test]
fn holding_near_the_bottom_edge_scrolls() {
    init_logger();
    let mut all = vec![node("R", None)];
    all.extend((0..50).map(|i| node(&format!("n{i}"), Some("R"))));
    let (mut tree, mut drag) = editable(Tree::with_nodes(TreeOptions::default(), all).unwrap());
    tree.set_viewport(0.0, 200.0);

    drag.handle(&mut tree, &down(65.0));
    assert_eq!(drag.handle(&mut tree, &to(190.0)), DragOutcome::Started(id("n2")));
    assert!(drag.is_autoscrolling());

    drag.advance(&mut tree, 16);
    assert_eq!(tree.viewport().scroll_top, 10.0);
    drag.advance(&mut tree, 32);
    assert_eq!(tree.viewport().scroll_top, 20.0);
    // Each tick re-resolved the drop under the shifted pointer.
    let index = tree.position_of(id("n2")).unwrap().1;
    assert!(index > 7, "n2 at {index}");

    drag.handle(&mut tree, &to(100.0));
    assert!(!drag.is_autoscrolling());
    assert_eq!(drag.pending_timers(), 0);
    drag.advance(&mut tree, 1_000);
    assert_eq!(tree.viewport().scroll_top, 20.0);

    let outcome = drag.handle(&mut tree, &up(100.0));
    assert!(matches!(outcome, DragOutcome::Dropped { moved: true, .. }));
}

// ─── Keyboard ───────────────────────────────────────────────────────────

#[test]
fn keys_navigate_when_idle_and_cancel_when_dragging() {
    let (mut tree, mut drag) = editable(Tree::with_nodes(TreeOptions::default(), nodes()).unwrap());
    assert_eq!(
        drag.handle(&mut tree, &InputEvent::key("ArrowDown")),
        DragOutcome::Action(TreeAction::SelectNext)
    );
    assert_eq!(tree.selected(), Some(id("R")));
    drag.handle(&mut tree, &InputEvent::key("ArrowDown"));
    assert_eq!(tree.selected(), Some(id("A")));
    drag.handle(&mut tree, &InputEvent::key("ArrowLeft"));
    assert!(tree.is_collapsed(id("A")));
    drag.handle(&mut tree, &InputEvent::key("ArrowRight"));
    assert!(!tree.is_collapsed(id("A")));

    tree.search(Some("B"));
    assert_eq!(
        drag.handle(&mut tree, &InputEvent::key("Escape")),
        DragOutcome::Action(TreeAction::ClearSearch)
    );
    assert!(!tree.is_searching());

    tree.select(id("B"), SelectOptions::silent());
    drag.handle(&mut tree, &down(65.0));
    drag.handle(&mut tree, &to(25.0));
    assert_eq!(tree.position_of(id("B")), Some((Some(id("R")), 0)));
    assert_eq!(
        drag.handle(&mut tree, &InputEvent::key("Escape")),
        DragOutcome::Cancelled(id("B"))
    );
    assert_eq!(tree.position_of(id("B")), Some((Some(id("R")), 1)));
    // Escape while traveling never reaches the search.
    assert_eq!(tree.selected(), Some(id("B")));
}
