//! The tree engine.
//!
//! `Tree` owns the node store, the rendered row set and all per-instance
//! state (selection, search mode, viewport, timers, queued events). Every
//! operation follows one pattern: validate, change the store, run one
//! reconciliation cycle ([`Tree::rebind`]), return.
//!
//! Rebind lays out the visible rows, windows them to the viewport when the
//! row count exceeds `performance_threshold` ("tuned" mode), diffs them
//! against the rows rendered last time and hands the three buckets to the
//! [`RowPresenter`]. A transition is animated only when the row delta is
//! within `max_animatable`, the tree is not tuned, and at most one earlier
//! animated rebind is still settling.

mod mutate;
mod transient;

pub use mutate::SelectOptions;

use crate::config::{AllowAll, DragPolicy, TreeOptions};
use crate::error::Result;
use crate::event::TreeEvent;
use crate::id::NodeId;
use crate::layout::{Metrics, Placement, layout};
use crate::model::RawNode;
use crate::reconcile::{
    NullPresenter, Patch, Row, RowPresenter, RowSet, Strategy, Transition, Viewport, build_patch,
    window,
};
use crate::scheduler::Timers;
use crate::search::SearchState;
use crate::store::{NodeStore, Slot};
use crate::stream::StreamEvent;
use petgraph::graph::NodeIndex;
use smallvec::SmallVec;

/// Timer payloads owned by a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TreeTask {
    /// An animated rebind finished its transition.
    Settle,
}

pub struct Tree {
    options: TreeOptions,
    metrics: Metrics,
    store: NodeStore,
    policy: Box<dyn DragPolicy>,
    presenter: Box<dyn RowPresenter>,

    selected: Option<NodeId>,
    search: Option<SearchState>,
    editable: bool,

    /// Rows handed to the presenter by the last rebind.
    rendered: RowSet,
    /// Row count before windowing.
    visible_total: usize,
    content_height: f32,
    tuned: bool,
    viewport: Viewport,

    /// Animated rebinds whose transition has not settled yet.
    in_flight: usize,
    timers: Timers<TreeTask>,
    torn_down: bool,

    /// Source row of an edit stream that has not completed yet.
    pending_edit: Option<NodeId>,
    events: Vec<TreeEvent>,
    last_patch: Option<Patch>,
}

impl std::fmt::Debug for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tree")
            .field("nodes", &self.store.len())
            .field("rows", &self.rendered.len())
            .field("selected", &self.selected)
            .field("tuned", &self.tuned)
            .field("searching", &self.search.is_some())
            .finish_non_exhaustive()
    }
}

impl Tree {
    /// Create an empty tree. The options are validated and owned by this
    /// instance.
    pub fn new(options: TreeOptions) -> Result<Self> {
        options.validate()?;
        let metrics = Metrics::from_options(&options);
        let store = NodeStore::new(options.forest, options.accessors.clone());
        let viewport = Viewport {
            scroll_top: 0.0,
            height: options.viewport_height,
        };
        Ok(Self {
            options,
            metrics,
            store,
            policy: Box::new(AllowAll),
            presenter: Box::new(NullPresenter),
            selected: None,
            search: None,
            editable: false,
            rendered: RowSet::default(),
            visible_total: 0,
            content_height: 0.0,
            tuned: false,
            viewport,
            in_flight: 0,
            timers: Timers::new(),
            torn_down: false,
            pending_edit: None,
            events: Vec::new(),
            last_patch: None,
        })
    }

    /// Bulk-load a node set and reconcile once.
    pub fn with_nodes(options: TreeOptions, nodes: impl IntoIterator<Item = RawNode>) -> Result<Self> {
        let mut tree = Self::new(options)?;
        for raw in nodes {
            tree.store.insert(raw)?;
        }
        tree.rebind(Strategy::Fly, true);
        Ok(tree)
    }

    /// Build a tree by ingesting `source` until its end signal.
    pub fn from_source(
        options: TreeOptions,
        source: impl IntoIterator<Item = StreamEvent<RawNode>>,
    ) -> Result<Self> {
        let mut tree = Self::new(options)?;
        for event in source {
            if tree.ingest(event) {
                break;
            }
        }
        Ok(tree)
    }

    #[must_use]
    pub fn with_policy(mut self, policy: impl DragPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    #[must_use]
    pub fn with_presenter(mut self, presenter: impl RowPresenter + 'static) -> Self {
        self.presenter = Box::new(presenter);
        self
    }

    // ─── Ingestion ───────────────────────────────────────────────────────

    /// Handle one node-stream event. Returns `true` once the stream ended.
    pub fn ingest(&mut self, event: StreamEvent<RawNode>) -> bool {
        match event {
            StreamEvent::Data(raw) => {
                match self.store.insert(raw) {
                    Ok(id) => {
                        self.emit(TreeEvent::Node(id));
                        if self.options.initial_selection() == Some(id) {
                            self.select(id, SelectOptions::default());
                        } else {
                            self.rebind(Strategy::Fly, true);
                        }
                    }
                    Err(e) => {
                        log::warn!("ingest: rejected node: {e}");
                        self.emit(TreeEvent::Error(e.to_string()));
                    }
                }
                false
            }
            StreamEvent::End => {
                log::debug!("ingest: stream complete, {} node(s)", self.store.len());
                self.emit(TreeEvent::Rendered);
                true
            }
            StreamEvent::Error(message) => {
                log::warn!("ingest: source error: {message}");
                self.emit(TreeEvent::Error(message));
                false
            }
        }
    }

    // ─── Reconciliation ──────────────────────────────────────────────────

    /// Recompute the visible rows, diff them against the rendered set and
    /// notify the presenter. `animate = false` forces immediate replacement.
    pub fn rebind(&mut self, strategy: Strategy, animate: bool) -> &Patch {
        let placements = self.place();
        let searching = self.search.is_some();
        let mut rows = Vec::with_capacity(placements.len());
        for p in &placements {
            if !searching {
                let record = &mut self.store.graph[p.node];
                record.x = p.x;
                record.y = p.y;
                record.depth = p.depth;
            }
            rows.push(self.make_row(p, searching));
        }

        self.visible_total = rows.len();
        self.content_height = if searching {
            rows.len() as f32 * self.metrics.row_height
        } else {
            self.metrics.total_height(rows.len())
        };
        let was_tuned = self.tuned;
        self.tuned = self.visible_total > self.options.performance_threshold;
        if self.tuned != was_tuned {
            log::debug!(
                "rebind: {} tuned mode at {} rows",
                if self.tuned { "entering" } else { "leaving" },
                self.visible_total
            );
        }
        let rows = if self.tuned {
            window(rows, &self.viewport, self.metrics.row_height)
        } else {
            rows
        };
        let next: RowSet = rows.into_iter().map(|r| (r.id, r)).collect();

        let mut patch = build_patch(&self.rendered, &next, strategy, Transition::Immediate);
        let animated = animate
            && patch.delta() <= self.options.max_animatable
            && !was_tuned
            && !self.tuned
            && self.in_flight <= 1;
        if animated {
            patch.transition = Transition::Animated {
                duration_ms: self.options.duration_ms,
            };
        }
        log::debug!(
            "rebind: {:?} +{} ~{} -{} ({:?})",
            strategy,
            patch.entered.len(),
            patch.updated.len(),
            patch.exited.len(),
            patch.transition
        );

        self.presenter.exit(&patch.exited, patch.transition);
        self.presenter.update(&patch.updated, patch.transition);
        self.presenter.enter(&patch.entered, patch.transition);

        if animated && !self.torn_down {
            self.in_flight += 1;
            self.timers.schedule(self.options.duration_ms, TreeTask::Settle);
        }
        self.rendered = next;
        self.last_patch.insert(patch)
    }

    /// Ordered placements for the current mode.
    fn place(&self) -> Vec<Placement<NodeIndex>> {
        match &self.search {
            Some(search) => {
                let acc = self.store.accessors();
                self.store
                    .preorder()
                    .into_iter()
                    .filter(|&idx| {
                        let id = self.store.graph[idx].id;
                        self.store.raw(id).is_some_and(|raw| {
                            raw.visible(acc) && raw.label(acc).is_some_and(|l| search.matches(l))
                        })
                    })
                    .enumerate()
                    .map(|(index, node)| Placement {
                        node,
                        depth: 0,
                        index,
                        x: 0.0,
                        y: index as f32 * self.metrics.row_height,
                    })
                    .collect()
            }
            None => {
                let roots: SmallVec<[NodeIndex; 4]> = self
                    .store
                    .roots()
                    .iter()
                    .filter(|&&r| self.store.graph[r].visible)
                    .copied()
                    .collect();
                layout(&roots, |n| self.visible_children(n), &self.metrics)
            }
        }
    }

    /// Children accessor: nothing for a collapsed node, hidden children
    /// filtered out.
    fn visible_children(&self, idx: NodeIndex) -> Option<SmallVec<[NodeIndex; 4]>> {
        let record = &self.store.graph[idx];
        if record.collapsed {
            return None;
        }
        Some(
            record
                .children
                .iter()
                .filter(|&&c| self.store.graph[c].visible)
                .copied()
                .collect(),
        )
    }

    fn make_row(&self, p: &Placement<NodeIndex>, searching: bool) -> Row {
        let record = &self.store.graph[p.node];
        let acc = self.store.accessors();
        let raw = self.store.raw(record.id);
        Row {
            id: record.id,
            parent: self.store.parent(p.node).map(|q| self.store.graph[q].id),
            index: p.index,
            depth: p.depth,
            x: p.x,
            y: p.y,
            height: if searching {
                self.metrics.row_height
            } else {
                self.metrics.height_at(p.index)
            },
            collapsed: record.collapsed,
            has_children: record.has_children(),
            selected: self.selected == Some(record.id),
            label: raw.and_then(|raw| raw.label(acc)).map(str::to_string),
            icon: raw.and_then(|raw| raw.icon(acc)).map(str::to_string),
            color: raw.and_then(|raw| raw.color(acc)).map(str::to_string),
        }
    }

    // ─── Viewport ────────────────────────────────────────────────────────

    /// Report the scroll position and viewport height. In tuned mode the
    /// window follows immediately.
    pub fn set_viewport(&mut self, scroll_top: f32, height: f32) {
        self.viewport = Viewport {
            scroll_top: scroll_top.max(0.0),
            height: height.max(0.0),
        };
        if self.tuned {
            self.rebind(Strategy::Replace, false);
        }
    }

    /// Scroll to `y`, clamped to the content. Returns the new scroll top.
    pub fn scroll_to(&mut self, y: f32) -> f32 {
        let max = (self.content_height - self.viewport.height).max(0.0);
        let top = y.clamp(0.0, max);
        self.set_viewport(top, self.viewport.height);
        top
    }

    /// Scroll the least distance that brings `id`'s row into the viewport.
    /// Returns `false` if the node is not laid out.
    pub fn scroll_into_view(&mut self, id: NodeId) -> bool {
        let Some(p) = self
            .place()
            .into_iter()
            .find(|p| self.store.graph[p.node].id == id)
        else {
            return false;
        };
        let row_height = self.metrics.height_at(p.index);
        let top = self.viewport.scroll_top;
        let bottom = top + self.viewport.height;
        if p.y < top {
            self.scroll_to(p.y);
        } else if p.y + row_height > bottom {
            self.scroll_to(p.y + row_height - self.viewport.height);
        }
        true
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Explicit container height while tuned; `None` means natural sizing.
    pub fn container_height(&self) -> Option<f32> {
        self.tuned.then_some(self.content_height)
    }

    /// Height of all visible rows, windowed or not.
    pub fn content_height(&self) -> f32 {
        self.content_height
    }

    pub fn is_tuned(&self) -> bool {
        self.tuned
    }

    // ─── Timers & lifecycle ──────────────────────────────────────────────

    /// Advance the tree's clock, settling finished transitions.
    pub fn advance(&mut self, now_ms: u64) {
        if self.torn_down {
            return;
        }
        for (_, task) in self.timers.advance(now_ms) {
            match task {
                TreeTask::Settle => self.in_flight = self.in_flight.saturating_sub(1),
            }
        }
    }

    /// Animated rebinds still in transition.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Cancel every outstanding timer. Later `advance` calls do nothing.
    pub fn teardown(&mut self) {
        log::debug!("tree: teardown with {} pending timer(s)", self.timers.len());
        self.timers.clear();
        self.in_flight = 0;
        self.torn_down = true;
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    // ─── Events ──────────────────────────────────────────────────────────

    pub fn emit(&mut self, event: TreeEvent) {
        log::debug!("event: {} {:?}", event.name(), event);
        self.events.push(event);
    }

    /// Drain queued events.
    pub fn take_events(&mut self) -> Vec<TreeEvent> {
        std::mem::take(&mut self.events)
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    pub fn options(&self) -> &TreeOptions {
        &self.options
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    pub fn policy(&self) -> &dyn DragPolicy {
        self.policy.as_ref()
    }

    pub fn get(&self, id: NodeId) -> Option<&RawNode> {
        self.store.raw(id)
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    pub fn selected_node(&self) -> Option<&RawNode> {
        self.selected.and_then(|id| self.store.raw(id))
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.store.contains(id)
    }

    /// Rendered rows in display order.
    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rendered.values()
    }

    pub fn row(&self, id: NodeId) -> Option<&Row> {
        self.rendered.get(&id)
    }

    /// The rendered row covering content offset `y`.
    pub fn row_at(&self, y: f32) -> Option<&Row> {
        self.rendered
            .values()
            .find(|r| y >= r.y && y < r.y + r.height)
    }

    /// The rendered row directly above `id`.
    pub fn row_before(&self, id: NodeId) -> Option<&Row> {
        let pos = self.rendered.get_index_of(&id)?;
        pos.checked_sub(1)
            .and_then(|p| self.rendered.get_index(p))
            .map(|(_, r)| r)
    }

    /// The rendered row directly below `id`.
    pub fn row_after(&self, id: NodeId) -> Option<&Row> {
        let pos = self.rendered.get_index_of(&id)?;
        self.rendered.get_index(pos + 1).map(|(_, r)| r)
    }

    /// Rendered row ids in display order.
    pub fn visible_ids(&self) -> Vec<NodeId> {
        self.rendered.keys().copied().collect()
    }

    /// Visible rows before windowing.
    pub fn visible_count(&self) -> usize {
        self.visible_total
    }

    pub fn position_of(&self, id: NodeId) -> Option<Slot> {
        self.store.slot(id)
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.store.parent_id(id)
    }

    pub fn children_of(&self, id: NodeId) -> Vec<NodeId> {
        self.store.child_ids(id)
    }

    pub fn is_collapsed(&self, id: NodeId) -> bool {
        self.store.record(id).is_some_and(|r| r.collapsed)
    }

    pub fn is_searching(&self) -> bool {
        self.search.is_some()
    }

    pub fn last_patch(&self) -> Option<&Patch> {
        self.last_patch.as_ref()
    }

    /// Turn edit mode (drag-and-drop) on or off.
    pub fn editable(&mut self, on: bool) {
        self.editable = on;
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    /// The root that never collapses: the single root outside forest mode.
    fn is_fixed_root(&self, id: NodeId) -> bool {
        !self.options.forest && self.store.is_root(id)
    }

    // ─── Provisional structure (drag previews) ───────────────────────────

    /// Relocate `id` without events and redraw immediately. Used for live
    /// drag previews and their rollback.
    pub fn preview_move(&mut self, id: NodeId, parent: Option<NodeId>, index: Option<usize>) -> Result<usize> {
        let pos = self.store.relocate(id, parent, index)?;
        self.rebind(Strategy::Replace, false);
        Ok(pos)
    }
}
