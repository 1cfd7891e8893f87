//! Drag-and-drop controller.
//!
//! A state machine over pointer input that turns a drag into live,
//! reversible structural moves on a [`Tree`]:
//!
//! ```text
//! Idle ──down on movable row──▶ Pending ──delay or move──▶ Traveling
//!   ▲                             │                           │
//!   └──────────── up (click) ─────┘◀──── up (drop) / Escape ──┘
//! ```
//!
//! While traveling, every frame resolves the row under the pointer into a
//! drop slot. When the target row or its slot changes the node is relocated
//! through [`Tree::preview_move`], so the list always shows where the drop
//! would land. The slot held at pickup is kept as a snapshot: an illegal
//! final frame or Escape puts the node back there.
//!
//! The controller owns its timers (drag-start delay, auto-scroll ticks).
//! Starting or ending a drag, and [`DragController::teardown`], clear them.

use crate::input::{InputEvent, Modifiers};
use crate::shortcuts::{self, ShortcutMap, TreeAction};
use treeview_core::scheduler::{TaskId, Timers};
use treeview_core::{DragOptions, NodeId, Row, Slot, Tree, TreeEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DragTask {
    Start,
    AutoScroll,
}

/// Public view of the controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragPhase {
    Idle,
    Pending,
    Traveling,
}

/// The floating proxy row that follows the pointer. Content coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Traveler {
    pub id: NodeId,
    pub label: Option<String>,
    pub x: f32,
    pub y: f32,
}

/// A resolved drop slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropPlan {
    pub parent: Option<NodeId>,
    /// Index among `parent`'s children once the dragged node is taken out.
    pub index: usize,
    /// The drop makes the node a first child rather than a sibling.
    pub embed: bool,
}

/// What a handled event did.
#[derive(Debug, Clone, PartialEq)]
pub enum DragOutcome {
    Ignored,
    /// A row was pressed; it becomes a click or a drag later.
    Pressed(NodeId),
    /// Press and release without a drag.
    Click(NodeId),
    Started(NodeId),
    /// A traveling frame was resolved.
    Moved { legal: bool },
    Dropped { node: NodeId, moved: bool, rolled_back: bool },
    Cancelled(NodeId),
    /// A keyboard shortcut was applied to the tree.
    Action(TreeAction),
}

#[derive(Debug)]
enum State {
    Idle,
    /// Pressed on a row that cannot be dragged; only a click can follow.
    Pressed { node: NodeId },
    Pending {
        node: NodeId,
        pointer: (f32, f32),
        timer: TaskId,
    },
    Traveling(Travel),
}

#[derive(Debug)]
struct Travel {
    node: NodeId,
    /// Slot at pickup; the rollback target.
    origin: Slot,
    traveler: Traveler,
    /// Pointer offset from the top of the row at pickup.
    grab_offset: f32,
    pointer: (f32, f32),
    /// Target row and plan of the last resolved frame.
    last: Option<(NodeId, DropPlan)>,
    illegal: bool,
    autoscroll: Option<(TaskId, f32)>,
}

pub struct DragController {
    options: DragOptions,
    timers: Timers<DragTask>,
    state: State,
    torn_down: bool,
}

impl DragController {
    pub fn new(options: DragOptions) -> Self {
        Self {
            options,
            timers: Timers::new(),
            state: State::Idle,
            torn_down: false,
        }
    }

    /// A controller using the drag block of `tree`'s options.
    pub fn for_tree(tree: &Tree) -> Self {
        Self::new(tree.options().drag.clone())
    }

    pub fn phase(&self) -> DragPhase {
        match self.state {
            State::Idle | State::Pressed { .. } => DragPhase::Idle,
            State::Pending { .. } => DragPhase::Pending,
            State::Traveling(_) => DragPhase::Traveling,
        }
    }

    /// The node being dragged or about to be.
    pub fn node(&self) -> Option<NodeId> {
        match &self.state {
            State::Idle => None,
            State::Pressed { node } | State::Pending { node, .. } => Some(*node),
            State::Traveling(t) => Some(t.node),
        }
    }

    pub fn traveler(&self) -> Option<&Traveler> {
        match &self.state {
            State::Traveling(t) => Some(&t.traveler),
            _ => None,
        }
    }

    /// Whether the current frame's drop would be rejected.
    pub fn is_illegal(&self) -> bool {
        matches!(&self.state, State::Traveling(t) if t.illegal)
    }

    pub fn is_autoscrolling(&self) -> bool {
        matches!(&self.state, State::Traveling(t) if t.autoscroll.is_some())
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn handle(&mut self, tree: &mut Tree, event: &InputEvent) -> DragOutcome {
        if self.torn_down {
            return DragOutcome::Ignored;
        }
        match event {
            InputEvent::PointerDown { x, y } => self.pointer_down(tree, (*x, *y)),
            InputEvent::PointerMove { x, y } => self.pointer_move(tree, (*x, *y)),
            InputEvent::PointerUp { .. } => self.pointer_up(tree),
            InputEvent::Key { key, modifiers } => self.key(tree, key, modifiers),
        }
    }

    // ─── Pointer ─────────────────────────────────────────────────────────

    fn pointer_down(&mut self, tree: &mut Tree, pointer: (f32, f32)) -> DragOutcome {
        if !matches!(self.state, State::Idle) {
            return DragOutcome::Ignored;
        }
        let content_y = tree.viewport().scroll_top + pointer.1;
        let Some(node) = tree.row_at(content_y).map(|r| r.id) else {
            return DragOutcome::Ignored;
        };
        self.timers.clear();

        if tree.is_editable() && draggable(tree, node) {
            let timer = self.timers.schedule(self.options.delay_ms, DragTask::Start);
            log::debug!("drag: pending on {node}");
            self.state = State::Pending { node, pointer, timer };
        } else {
            self.state = State::Pressed { node };
        }
        DragOutcome::Pressed(node)
    }

    fn pointer_move(&mut self, tree: &mut Tree, pointer: (f32, f32)) -> DragOutcome {
        match &mut self.state {
            State::Pending {
                node,
                pointer: pressed,
                ..
            } => {
                let (node, pressed) = (*node, *pressed);
                self.start(tree, node, pressed);
                if let State::Traveling(travel) = &mut self.state {
                    travel.pointer = pointer;
                }
                self.frame(tree);
                self.update_autoscroll(tree);
                DragOutcome::Started(node)
            }
            State::Traveling(travel) => {
                travel.pointer = pointer;
                let legal = self.frame(tree);
                self.update_autoscroll(tree);
                DragOutcome::Moved { legal }
            }
            State::Idle | State::Pressed { .. } => DragOutcome::Ignored,
        }
    }

    fn pointer_up(&mut self, tree: &mut Tree) -> DragOutcome {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Pressed { node } | State::Pending { node, .. } => {
                self.timers.clear();
                tree.click(node);
                DragOutcome::Click(node)
            }
            State::Traveling(travel) => self.finish(tree, travel),
            State::Idle => DragOutcome::Ignored,
        }
    }

    fn key(&mut self, tree: &mut Tree, key: &str, modifiers: &Modifiers) -> DragOutcome {
        match ShortcutMap::resolve(key, modifiers) {
            Some(TreeAction::CancelDrag) => match std::mem::replace(&mut self.state, State::Idle) {
                State::Traveling(travel) => self.cancel(tree, travel),
                State::Pending { node, .. } | State::Pressed { node } => {
                    log::debug!("drag: press on {node} abandoned");
                    self.timers.clear();
                    DragOutcome::Cancelled(node)
                }
                State::Idle => {
                    shortcuts::apply(tree, TreeAction::ClearSearch);
                    DragOutcome::Action(TreeAction::ClearSearch)
                }
            },
            Some(action) if matches!(self.state, State::Idle) => {
                shortcuts::apply(tree, action);
                DragOutcome::Action(action)
            }
            _ => DragOutcome::Ignored,
        }
    }

    // ─── Timers ──────────────────────────────────────────────────────────

    /// Advance the controller's clock: fire the drag-start delay and
    /// auto-scroll ticks that came due.
    pub fn advance(&mut self, tree: &mut Tree, now_ms: u64) {
        if self.torn_down {
            return;
        }
        for (id, task) in self.timers.advance(now_ms) {
            match task {
                DragTask::Start => {
                    if let State::Pending { node, pointer, timer } = self.state
                        && timer == id
                    {
                        self.start(tree, node, pointer);
                        self.frame(tree);
                    }
                }
                DragTask::AutoScroll => self.autoscroll_tick(tree, id),
            }
        }
    }

    /// Abandon any drag in progress (restoring the pickup slot) and cancel
    /// every timer. The controller ignores all later input.
    pub fn teardown(&mut self, tree: &mut Tree) {
        if let State::Traveling(travel) = std::mem::replace(&mut self.state, State::Idle) {
            self.cancel(tree, travel);
        }
        self.timers.clear();
        self.torn_down = true;
    }

    // ─── Travel ──────────────────────────────────────────────────────────

    fn start(&mut self, tree: &mut Tree, node: NodeId, pointer: (f32, f32)) {
        self.timers.clear();
        let Some(origin) = tree.position_of(node) else {
            self.state = State::Idle;
            return;
        };
        let scroll_top = tree.viewport().scroll_top;
        let (row_x, row_y, label) = tree
            .row(node)
            .map_or((0.0, scroll_top + pointer.1, None), |r| (r.x, r.y, r.label.clone()));
        let grab_offset = scroll_top + pointer.1 - row_y;
        log::debug!("drag: traveling with {node} from {origin:?}");
        tree.emit(TreeEvent::DndStart(node));
        self.state = State::Traveling(Travel {
            node,
            origin,
            traveler: Traveler {
                id: node,
                label,
                x: row_x,
                y: row_y,
            },
            grab_offset,
            pointer,
            last: None,
            illegal: false,
            autoscroll: None,
        });
    }

    /// Resolve the current pointer into a drop slot and preview it if the
    /// target row or its plan changed. Returns whether the frame is legal.
    fn frame(&mut self, tree: &mut Tree) -> bool {
        let State::Traveling(travel) = &mut self.state else {
            return false;
        };
        let viewport = tree.viewport();
        let py = travel.pointer.1.clamp(0.0, viewport.height);
        let content_y = viewport.scroll_top + py;
        travel.traveler.y = content_y - travel.grab_offset;

        let Some(target) = row_under(tree, content_y).cloned() else {
            return !travel.illegal;
        };
        let node = travel.node;
        if target.id == node || tree.store().is_ancestor_of(node, target.id) {
            return !travel.illegal;
        }
        let offset = content_y - target.y;
        let Some(plan) = plan_drop(
            tree,
            node,
            &target,
            offset,
            travel.pointer.0,
            self.options.embed_threshold,
        ) else {
            return !travel.illegal;
        };
        if travel.last == Some((target.id, plan)) {
            return !travel.illegal;
        }
        travel.last = Some((target.id, plan));

        let resolved = if is_legal(tree, node, plan.parent) {
            Some(plan)
        } else if plan.embed {
            sibling_after(tree, node, plan.parent).filter(|p| is_legal(tree, node, p.parent))
        } else {
            None
        };
        match resolved {
            Some(plan) => match tree.preview_move(node, plan.parent, Some(plan.index)) {
                Ok(_) => {
                    log::trace!("drag: preview {node} -> {:?}[{}]", plan.parent, plan.index);
                    travel.illegal = false;
                }
                Err(e) => {
                    log::debug!("drag: preview rejected: {e}");
                    travel.illegal = true;
                }
            },
            None => {
                log::trace!("drag: {node} over {} is illegal", target.id);
                travel.illegal = true;
            }
        }
        !travel.illegal
    }

    fn update_autoscroll(&mut self, tree: &Tree) {
        let direction = self.scroll_direction(tree);
        let State::Traveling(travel) = &mut self.state else {
            return;
        };
        match (direction, travel.autoscroll) {
            (Some(dir), None) => {
                let id = self
                    .timers
                    .schedule(self.options.autoscroll_interval_ms, DragTask::AutoScroll);
                travel.autoscroll = Some((id, dir));
            }
            (Some(dir), Some((id, _))) => travel.autoscroll = Some((id, dir)),
            (None, Some((id, _))) => {
                self.timers.cancel(id);
                travel.autoscroll = None;
            }
            (None, None) => {}
        }
    }

    /// `-1.0` near the top edge, `1.0` near the bottom edge.
    fn scroll_direction(&self, tree: &Tree) -> Option<f32> {
        let State::Traveling(travel) = &self.state else {
            return None;
        };
        let height = tree.viewport().height;
        let y = travel.pointer.1;
        let band = self.options.autoscroll_band;
        if y < band {
            Some(-1.0)
        } else if y > height - band {
            Some(1.0)
        } else {
            None
        }
    }

    fn autoscroll_tick(&mut self, tree: &mut Tree, fired: TaskId) {
        let State::Traveling(travel) = &mut self.state else {
            return;
        };
        let Some((id, dir)) = travel.autoscroll else {
            return;
        };
        if id != fired {
            return;
        }
        travel.autoscroll = None;
        let before = tree.viewport().scroll_top;
        let after = tree.scroll_to(before + dir * self.options.autoscroll_step);
        if after == before {
            log::trace!("drag: auto-scroll reached the edge");
            return;
        }
        self.frame(tree);
        self.update_autoscroll(tree);
    }

    // ─── Finish ──────────────────────────────────────────────────────────

    fn finish(&mut self, tree: &mut Tree, travel: Travel) -> DragOutcome {
        self.timers.clear();
        let node = travel.node;
        let rolled_back = travel.illegal;
        if rolled_back {
            log::debug!("drag: illegal drop of {node}, restoring {:?}", travel.origin);
            restore(tree, node, travel.origin);
        }
        let final_slot = tree.position_of(node).unwrap_or(travel.origin);
        let moved = final_slot != travel.origin;
        if moved {
            tree.emit(TreeEvent::Move {
                node,
                new_parent: final_slot.0,
                previous_parent: travel.origin.0,
                new_index: final_slot.1,
                previous_index: travel.origin.1,
            });
        }
        tree.emit(TreeEvent::DndStop(node));
        log::debug!("drag: dropped {node} at {final_slot:?}");
        DragOutcome::Dropped {
            node,
            moved,
            rolled_back,
        }
    }

    fn cancel(&mut self, tree: &mut Tree, travel: Travel) -> DragOutcome {
        self.timers.clear();
        restore(tree, travel.node, travel.origin);
        tree.emit(TreeEvent::DndCancel(travel.node));
        log::debug!("drag: cancelled {}", travel.node);
        DragOutcome::Cancelled(travel.node)
    }
}

fn restore(tree: &mut Tree, node: NodeId, origin: Slot) {
    if tree.position_of(node) == Some(origin) {
        return;
    }
    if let Err(e) = tree.preview_move(node, origin.0, Some(origin.1)) {
        log::warn!("drag: could not restore {node}: {e}");
    }
}

/// Rows that may be picked up: movable per policy, and never the root of a
/// single-root tree.
fn draggable(tree: &Tree, node: NodeId) -> bool {
    if !tree.options().forest && tree.store().is_root(node) {
        return false;
    }
    tree.get(node).is_some_and(|raw| tree.policy().movable(raw))
}

/// The row under `y`, clamped to the first and last rendered rows.
fn row_under(tree: &Tree, y: f32) -> Option<&Row> {
    if let Some(row) = tree.row_at(y) {
        return Some(row);
    }
    let first = tree.rows().next()?;
    if y < first.y {
        Some(first)
    } else {
        tree.rows().last()
    }
}

/// Classify a pointer `offset` pixels below the top of `target`, with the
/// pointer at horizontal position `x`.
///
/// - lower part (`offset >= threshold`): first child of `target`;
/// - top half of the upper part, below a deeper preceding row: after that
///   row's subtree, at the depth column under `x` (never shallower than one
///   level below `target`);
/// - upper part of a first child: first child of its parent (an embed);
/// - upper part otherwise: sibling directly before `target`.
pub fn plan_drop(
    tree: &Tree,
    node: NodeId,
    target: &Row,
    offset: f32,
    x: f32,
    threshold: f32,
) -> Option<DropPlan> {
    let (parent, index) = tree.position_of(target.id)?;
    if offset >= threshold {
        return Some(DropPlan {
            parent: Some(target.id),
            index: 0,
            embed: true,
        });
    }
    if offset < threshold / 2.0
        && let Some(preceding) = tree.row_before(target.id)
        && preceding.depth > target.depth
    {
        let indent = tree.metrics().indent;
        let column = if indent > 0.0 {
            (x / indent).floor().max(0.0) as usize
        } else {
            0
        };
        let level = column.clamp(target.depth + 1, preceding.depth);
        let anchor = trailing_anchor(tree, node, preceding, level)?;
        return sibling_after(tree, node, Some(anchor));
    }
    let plan = if index == 0
        && let Some(parent) = parent
    {
        DropPlan {
            parent: Some(parent),
            index: 0,
            embed: true,
        }
    } else {
        DropPlan {
            parent,
            index: index_after_detach(tree, node, parent, index),
            embed: false,
        }
    };
    Some(plan)
}

/// The ancestor-or-self of `preceding` at depth `level`. A preceding row
/// inside the dragged subtree stands for the dragged node itself.
fn trailing_anchor(tree: &Tree, node: NodeId, preceding: &Row, level: usize) -> Option<NodeId> {
    let (mut id, mut depth) =
        if preceding.id == node || tree.store().is_ancestor_of(node, preceding.id) {
            (node, tree.row(node)?.depth)
        } else {
            (preceding.id, preceding.depth)
        };
    while depth > level {
        id = tree.parent_of(id)?;
        depth -= 1;
    }
    Some(id)
}

/// Fallback for a rejected embed: directly after the candidate parent among
/// its own siblings.
fn sibling_after(tree: &Tree, node: NodeId, candidate: Option<NodeId>) -> Option<DropPlan> {
    let (parent, index) = tree.position_of(candidate?)?;
    Some(DropPlan {
        parent,
        index: index_after_detach(tree, node, parent, index + 1),
        embed: false,
    })
}

/// Translate a pre-detach sibling index into one valid after `node` is taken
/// out of the list.
fn index_after_detach(tree: &Tree, node: NodeId, parent: Option<NodeId>, index: usize) -> usize {
    match tree.position_of(node) {
        Some((p, i)) if p == parent && i < index => index - 1,
        _ => index,
    }
}

/// Structural and policy legality of dropping `node` under `parent`.
pub fn is_legal(tree: &Tree, node: NodeId, parent: Option<NodeId>) -> bool {
    match parent {
        Some(p) if p == node || tree.store().is_ancestor_of(node, p) => return false,
        Some(p) if !tree.contains(p) => return false,
        None if !tree.options().forest => return false,
        _ => {}
    }
    let Some(raw) = tree.get(node) else {
        return false;
    };
    tree.policy().droppable(raw, parent.and_then(|p| tree.get(p)))
}
