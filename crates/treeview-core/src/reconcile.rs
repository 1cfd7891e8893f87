//! Row reconciliation.
//!
//! Each rebind produces a fresh [`RowSet`] keyed by node id. Diffing it
//! against the previously rendered set classifies rows into entered, updated
//! and exited buckets by identity, never by position. The resulting
//! [`Patch`] also carries, per row, where an entering row starts and where an
//! exiting row goes, which depends on the [`Strategy`]:
//!
//! - **Fly**: rows come out of / retreat into their parent. Used when the
//!   hierarchy is revealed or hidden (expand, collapse, select).
//! - **Slide**: rows come from / go toward one source row. Used when rows are
//!   inserted into or removed from the list (add, move, copy, edit, remove).
//! - **Replace**: no motion at all (search results, drag previews).

use crate::id::NodeId;
use indexmap::IndexMap;

/// One rendered row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub index: usize,
    pub depth: usize,
    pub x: f32,
    pub y: f32,
    pub height: f32,
    pub collapsed: bool,
    pub has_children: bool,
    pub selected: bool,
    pub label: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
}

pub type RowSet = IndexMap<NodeId, Row>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Fly,
    Slide { source: NodeId },
    Replace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Animated { duration_ms: u64 },
    Immediate,
}

impl Transition {
    pub fn is_animated(&self) -> bool {
        matches!(self, Self::Animated { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnterRow {
    pub row: Row,
    /// Where the row starts before moving to `row.y`.
    pub from_y: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExitRow {
    pub row: Row,
    /// Where the row travels before it is removed.
    pub to_y: f32,
}

/// The outcome of one rebind.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    pub strategy: Strategy,
    pub transition: Transition,
    pub entered: Vec<EnterRow>,
    pub updated: Vec<Row>,
    pub exited: Vec<ExitRow>,
}

impl Patch {
    /// Rows that appear or disappear.
    pub fn delta(&self) -> usize {
        self.entered.len() + self.exited.len()
    }

    pub fn entered_ids(&self) -> Vec<NodeId> {
        self.entered.iter().map(|e| e.row.id).collect()
    }

    pub fn updated_ids(&self) -> Vec<NodeId> {
        self.updated.iter().map(|r| r.id).collect()
    }

    pub fn exited_ids(&self) -> Vec<NodeId> {
        self.exited.iter().map(|e| e.row.id).collect()
    }
}

/// The external presentation layer. Receives each bucket once per rebind.
pub trait RowPresenter {
    fn enter(&mut self, rows: &[EnterRow], transition: Transition);
    fn update(&mut self, rows: &[Row], transition: Transition);
    fn exit(&mut self, rows: &[ExitRow], transition: Transition);
}

/// Presenter that draws nothing; the default for headless trees.
#[derive(Debug, Default)]
pub struct NullPresenter;

impl RowPresenter for NullPresenter {
    fn enter(&mut self, _rows: &[EnterRow], _transition: Transition) {}
    fn update(&mut self, _rows: &[Row], _transition: Transition) {}
    fn exit(&mut self, _rows: &[ExitRow], _transition: Transition) {}
}

// ─── Viewport windowing ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub scroll_top: f32,
    pub height: f32,
}

impl Viewport {
    /// Rows materialized above and below the viewport.
    pub const OVERSCAN_ROWS: f32 = 2.0;

    /// The `[top, bottom]` content range that gets materialized.
    pub fn window(&self, row_height: f32) -> (f32, f32) {
        let pad = Self::OVERSCAN_ROWS * row_height;
        (self.scroll_top - pad, self.scroll_top + self.height + pad)
    }

    pub fn contains(&self, y: f32, row_height: f32) -> bool {
        let (top, bottom) = self.window(row_height);
        y >= top && y <= bottom
    }
}

/// Keep only rows whose `y` falls in the viewport window.
pub fn window(rows: Vec<Row>, viewport: &Viewport, row_height: f32) -> Vec<Row> {
    rows.into_iter()
        .filter(|r| viewport.contains(r.y, row_height))
        .collect()
}

// ─── Diff ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diff {
    pub entered: Vec<NodeId>,
    pub updated: Vec<NodeId>,
    pub exited: Vec<NodeId>,
}

/// Keyed identity diff. Entered and updated follow `next` order; exited
/// follows `prev` order.
pub fn diff(prev: &RowSet, next: &RowSet) -> Diff {
    let mut out = Diff::default();
    for id in next.keys() {
        if prev.contains_key(id) {
            out.updated.push(*id);
        } else {
            out.entered.push(*id);
        }
    }
    out.exited = prev
        .keys()
        .filter(|id| !next.contains_key(*id))
        .copied()
        .collect();
    out
}

/// Diff two row sets and attach motion origins for `strategy`.
pub fn build_patch(
    prev: &RowSet,
    next: &RowSet,
    strategy: Strategy,
    transition: Transition,
) -> Patch {
    let d = diff(prev, next);

    let entered = d
        .entered
        .iter()
        .map(|id| {
            let row = next[id].clone();
            let from_y = match strategy {
                Strategy::Fly => row
                    .parent
                    .and_then(|p| prev.get(&p).or_else(|| next.get(&p)))
                    .map_or(row.y, |p| p.y),
                Strategy::Slide { source } => prev
                    .get(&source)
                    .or_else(|| next.get(&source))
                    .map_or(row.y, |s| s.y),
                Strategy::Replace => row.y,
            };
            EnterRow { row, from_y }
        })
        .collect();

    let updated = d.updated.iter().map(|id| next[id].clone()).collect();

    let exited = d
        .exited
        .iter()
        .map(|id| {
            let row = prev[id].clone();
            let to_y = match strategy {
                Strategy::Fly => surviving_ancestor_y(prev, next, &row).unwrap_or(row.y),
                Strategy::Slide { source } => next
                    .get(&source)
                    .or_else(|| prev.get(&source))
                    .map_or(row.y, |s| s.y),
                Strategy::Replace => row.y,
            };
            ExitRow { row, to_y }
        })
        .collect();

    Patch {
        strategy,
        transition,
        entered,
        updated,
        exited,
    }
}

/// New position of the nearest ancestor of `row` that is still rendered.
fn surviving_ancestor_y(prev: &RowSet, next: &RowSet, row: &Row) -> Option<f32> {
    let mut cur = row.parent;
    while let Some(id) = cur {
        if let Some(found) = next.get(&id) {
            return Some(found.y);
        }
        cur = prev.get(&id).and_then(|r| r.parent);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, parent: Option<&str>, index: usize) -> Row {
        Row {
            id: NodeId::intern(id),
            parent: parent.map(NodeId::intern),
            index,
            depth: usize::from(parent.is_some()),
            x: 0.0,
            y: index as f32 * 10.0,
            height: 10.0,
            collapsed: false,
            has_children: false,
            selected: false,
            label: None,
            icon: None,
            color: None,
        }
    }

    fn set(rows: Vec<Row>) -> RowSet {
        rows.into_iter().map(|r| (r.id, r)).collect()
    }

    #[test]
    fn diff_is_keyed_by_id() {
        let prev = set(vec![row("R", None, 0), row("A", Some("R"), 1), row("B", Some("R"), 2)]);
        let next = set(vec![row("R", None, 0), row("B", Some("R"), 1), row("C", Some("R"), 2)]);
        let d = diff(&prev, &next);
        assert_eq!(d.entered, vec![NodeId::intern("C")]);
        assert_eq!(d.updated, vec![NodeId::intern("R"), NodeId::intern("B")]);
        assert_eq!(d.exited, vec![NodeId::intern("A")]);
    }

    #[test]
    fn fly_moves_rows_through_their_parent() {
        let prev = set(vec![row("R", None, 0), row("A", Some("R"), 1), row("A1", Some("A"), 2)]);
        let next = set(vec![row("R", None, 0), row("A", Some("R"), 1)]);
        let patch = build_patch(&prev, &next, Strategy::Fly, Transition::Immediate);
        assert_eq!(patch.exited.len(), 1);
        assert_eq!(patch.exited[0].to_y, 10.0);

        let back = build_patch(&next, &prev, Strategy::Fly, Transition::Immediate);
        assert_eq!(back.entered[0].from_y, 10.0);
    }

    #[test]
    fn fly_falls_back_to_the_nearest_rendered_ancestor() {
        let prev = set(vec![
            row("R", None, 0),
            row("A", Some("R"), 1),
            row("A1", Some("A"), 2),
        ]);
        let next = set(vec![row("R", None, 0)]);
        let patch = build_patch(&prev, &next, Strategy::Fly, Transition::Immediate);
        assert!(patch.exited.iter().all(|e| e.to_y == 0.0));
    }

    #[test]
    fn slide_uses_the_source_row() {
        let prev = set(vec![row("R", None, 0), row("A", Some("R"), 1), row("B", Some("R"), 2)]);
        let next = set(vec![row("R", None, 0), row("B", Some("R"), 1)]);
        let source = NodeId::intern("A");
        let patch = build_patch(&prev, &next, Strategy::Slide { source }, Transition::Immediate);
        // Source is gone from `next`, so the exit heads for its prior spot.
        assert_eq!(patch.exited[0].to_y, 10.0);
        assert_eq!(patch.delta(), 1);
    }

    #[test]
    fn window_keeps_two_rows_of_overscan() {
        let rows: Vec<Row> = (0..100).map(|i| row(&format!("n{i}"), None, i)).collect();
        let viewport = Viewport {
            scroll_top: 200.0,
            height: 100.0,
        };
        let kept = window(rows, &viewport, 10.0);
        assert_eq!(kept.first().unwrap().y, 180.0);
        assert_eq!(kept.last().unwrap().y, 320.0);
        assert_eq!(kept.len(), 15);
    }
}
