//! Node store: raw node data plus the layout-record arena.
//!
//! Layout records live in a petgraph `StableDiGraph`; an edge runs from each
//! parent to each child, and the parent's `children` list fixes sibling
//! order. Structural edits are edge and index rewrites, never nested owned
//! structures, so the parent link is a lookup rather than an owner.
//!
//! Invariants (checked by [`NodeStore::validate`]):
//! - every raw node id has exactly one layout record and vice versa;
//! - a record's parent edge exists iff the parent's `children` contains the
//!   record exactly once;
//! - records without a parent are exactly the roots, in root order;
//! - no cycles.

use crate::config::Accessors;
use crate::error::{Result, TreeError};
use crate::id::NodeId;
use crate::model::{LayoutRecord, RawNode};
use petgraph::Direction;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};

/// Where a node sits: its parent (`None` = top level) and sibling index.
pub type Slot = (Option<NodeId>, usize);

#[derive(Debug, Clone)]
pub struct NodeStore {
    /// Layout-record arena; edges go parent → child.
    pub graph: StableDiGraph<LayoutRecord, ()>,
    /// Top-level records in display order.
    roots: Vec<NodeIndex>,
    raw: HashMap<NodeId, RawNode>,
    id_index: HashMap<NodeId, NodeIndex>,
    forest: bool,
    accessors: Accessors,
}

impl NodeStore {
    pub fn new(forest: bool, accessors: Accessors) -> Self {
        Self {
            graph: StableDiGraph::new(),
            roots: Vec::new(),
            raw: HashMap::new(),
            id_index: HashMap::new(),
            forest,
            accessors,
        }
    }

    pub fn accessors(&self) -> &Accessors {
        &self.accessors
    }

    pub fn is_forest(&self) -> bool {
        self.forest
    }

    pub fn len(&self) -> usize {
        self.id_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_index.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.id_index.contains_key(&id)
    }

    pub fn index_of(&self, id: NodeId) -> Option<NodeIndex> {
        self.id_index.get(&id).copied()
    }

    pub fn roots(&self) -> &[NodeIndex] {
        &self.roots
    }

    pub fn root_ids(&self) -> Vec<NodeId> {
        self.roots.iter().map(|&r| self.graph[r].id).collect()
    }

    /// The single root in single-root mode, or the first forest root.
    pub fn first_root(&self) -> Option<NodeId> {
        self.roots.first().map(|&r| self.graph[r].id)
    }

    pub fn is_root(&self, id: NodeId) -> bool {
        self.index_of(id).is_some_and(|idx| self.roots.contains(&idx))
    }

    pub fn raw(&self, id: NodeId) -> Option<&RawNode> {
        self.raw.get(&id)
    }

    pub fn record(&self, id: NodeId) -> Option<&LayoutRecord> {
        self.index_of(id).map(|idx| &self.graph[idx])
    }

    pub fn record_mut(&mut self, id: NodeId) -> Option<&mut LayoutRecord> {
        let idx = self.index_of(id)?;
        self.graph.node_weight_mut(idx)
    }

    /// All records, in arena order.
    pub fn records(&self) -> impl Iterator<Item = &LayoutRecord> {
        self.graph.node_weights()
    }

    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut LayoutRecord> {
        self.graph.node_weights_mut()
    }

    pub fn parent(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .next()
    }

    pub fn parent_id(&self, id: NodeId) -> Option<NodeId> {
        let idx = self.index_of(id)?;
        self.parent(idx).map(|p| self.graph[p].id)
    }

    pub fn children(&self, idx: NodeIndex) -> &[NodeIndex] {
        &self.graph[idx].children
    }

    pub fn child_ids(&self, id: NodeId) -> Vec<NodeId> {
        match self.index_of(id) {
            Some(idx) => self.children(idx).iter().map(|&c| self.graph[c].id).collect(),
            None => Vec::new(),
        }
    }

    /// Current parent and sibling index of `id`.
    pub fn slot(&self, id: NodeId) -> Option<Slot> {
        let idx = self.index_of(id)?;
        match self.parent(idx) {
            Some(p) => {
                let pos = self.graph[p].children.iter().position(|&c| c == idx)?;
                Some((Some(self.graph[p].id), pos))
            }
            None => {
                let pos = self.roots.iter().position(|&r| r == idx)?;
                Some((None, pos))
            }
        }
    }

    /// Ancestors from the parent up to the root.
    pub fn ancestors(&self, idx: NodeIndex) -> SmallVec<[NodeIndex; 8]> {
        let mut out = SmallVec::new();
        let mut cur = self.parent(idx);
        while let Some(p) = cur {
            out.push(p);
            cur = self.parent(p);
        }
        out
    }

    /// Check if `ancestor` is a parent/grandparent/etc. of `descendant`.
    pub fn is_ancestor_of(&self, ancestor: NodeId, descendant: NodeId) -> bool {
        if ancestor == descendant {
            return false;
        }
        let (Some(a), Some(d)) = (self.index_of(ancestor), self.index_of(descendant)) else {
            return false;
        };
        self.ancestors(d).contains(&a)
    }

    /// The subtree rooted at `idx` in pre-order, ignoring collapse state.
    pub fn subtree(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut out = Vec::new();
        let mut stack = vec![idx];
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.graph[n].children.iter().rev().copied());
        }
        out
    }

    /// Every node in document order, ignoring collapse state.
    pub fn preorder(&self) -> Vec<NodeIndex> {
        let mut out = Vec::with_capacity(self.len());
        for &root in &self.roots {
            out.extend(self.subtree(root));
        }
        out
    }

    // ─── Insertion ───────────────────────────────────────────────────────

    /// Insert a node under the parent named by its own `parentId` field.
    ///
    /// A missing or unknown parent makes the node a root: an extra root in
    /// forest mode, `RootExists` in single-root mode once a root is set.
    pub fn insert(&mut self, raw: RawNode) -> Result<NodeId> {
        let parent = raw
            .parent_id(&self.accessors)
            .filter(|p| self.contains(*p));
        self.insert_at(raw, parent, None)
    }

    /// Insert a node under `parent` at `index` (append when `None`).
    pub fn insert_at(
        &mut self,
        raw: RawNode,
        parent: Option<NodeId>,
        index: Option<usize>,
    ) -> Result<NodeId> {
        let id = raw.require_id(&self.accessors)?;
        if self.contains(id) {
            return Err(TreeError::DuplicateId(id));
        }
        let parent_idx = match parent {
            Some(p) => Some(self.index_of(p).ok_or(TreeError::UnknownNode(p))?),
            None => None,
        };
        if parent_idx.is_none() && !self.forest && !self.roots.is_empty() {
            return Err(TreeError::RootExists);
        }

        let mut record = LayoutRecord::new(id);
        record.visible = raw.visible(&self.accessors);
        let idx = self.graph.add_node(record);
        self.id_index.insert(id, idx);
        self.raw.insert(id, raw);
        self.attach(idx, parent_idx, index);
        log::trace!("store: inserted {id} under {parent:?}");
        Ok(id)
    }

    // ─── Structural edits ────────────────────────────────────────────────

    /// Unlink `idx` from its parent (or the root list). Returns the slot it
    /// occupied as `(parent, index)`.
    pub fn detach(&mut self, idx: NodeIndex) -> Option<(Option<NodeIndex>, usize)> {
        match self.parent(idx) {
            Some(p) => {
                let pos = self.graph[p].children.iter().position(|&c| c == idx)?;
                self.graph[p].children.remove(pos);
                if let Some(edge) = self.graph.find_edge(p, idx) {
                    self.graph.remove_edge(edge);
                }
                Some((Some(p), pos))
            }
            None => {
                let pos = self.roots.iter().position(|&r| r == idx)?;
                self.roots.remove(pos);
                Some((None, pos))
            }
        }
    }

    /// Link a detached `idx` under `parent` at `index`, clamped to the
    /// sibling count. Returns the index actually used.
    pub fn attach(&mut self, idx: NodeIndex, parent: Option<NodeIndex>, index: Option<usize>) -> usize {
        match parent {
            Some(p) => {
                let len = self.graph[p].children.len();
                let pos = index.map_or(len, |i| i.min(len));
                self.graph[p].children.insert(pos, idx);
                self.graph.add_edge(p, idx, ());
                pos
            }
            None => {
                let len = self.roots.len();
                let pos = index.map_or(len, |i| i.min(len));
                self.roots.insert(pos, idx);
                pos
            }
        }
    }

    /// Detach `id` and reattach it at `(parent, index)`. The index is read
    /// against the sibling list after detaching. Rejected moves leave the
    /// graph untouched.
    pub fn relocate(&mut self, id: NodeId, parent: Option<NodeId>, index: Option<usize>) -> Result<usize> {
        let idx = self.index_of(id).ok_or(TreeError::UnknownNode(id))?;
        let parent_idx = match parent {
            Some(p) => {
                let pidx = self.index_of(p).ok_or(TreeError::UnknownNode(p))?;
                if p == id || self.is_ancestor_of(id, p) {
                    return Err(TreeError::WouldCycle { node: id, parent: p });
                }
                Some(pidx)
            }
            None => None,
        };
        if parent_idx.is_none() && !self.forest && !self.roots.contains(&idx) {
            return Err(TreeError::RootExists);
        }
        self.detach(idx);
        let pos = self.attach(idx, parent_idx, index);
        Ok(pos)
    }

    /// Detach `id` and delete its whole subtree from both maps. Returns the
    /// removed ids in pre-order, or `None` if `id` is unknown.
    pub fn remove(&mut self, id: NodeId) -> Option<Vec<NodeId>> {
        let idx = self.index_of(id)?;
        self.detach(idx);
        let doomed = self.subtree(idx);
        let mut removed = Vec::with_capacity(doomed.len());
        for n in doomed {
            if let Some(record) = self.graph.remove_node(n) {
                self.id_index.remove(&record.id);
                self.raw.remove(&record.id);
                removed.push(record.id);
            }
        }
        log::trace!("store: removed {} node(s) under {id}", removed.len());
        Some(removed)
    }

    /// Shallow-merge `patch` into the raw node. A `visible` field toggles
    /// the layout record's visibility. Returns `false` for unknown ids.
    pub fn merge(&mut self, id: NodeId, patch: &RawNode) -> bool {
        let Some(raw) = self.raw.get_mut(&id) else {
            return false;
        };
        if let Some(visible) = raw.merge(patch, &self.accessors)
            && let Some(record) = self.record_mut(id)
        {
            record.visible = visible;
        }
        true
    }

    /// Rewrite `old` to `new` in both maps, in the raw `id` field and in any
    /// child `parentId` field that still names `old`.
    pub fn rename(&mut self, old: NodeId, new: NodeId) -> Result<()> {
        let idx = self.index_of(old).ok_or(TreeError::UnknownNode(old))?;
        if self.contains(new) {
            return Err(TreeError::DuplicateId(new));
        }
        self.id_index.remove(&old);
        self.id_index.insert(new, idx);
        self.graph[idx].id = new;
        if let Some(mut raw) = self.raw.remove(&old) {
            raw.set(&self.accessors.id, new.to_value());
            self.raw.insert(new, raw);
        }
        let key = self.accessors.parent_id.clone();
        for &child in &self.graph[idx].children {
            let child_id = self.graph[child].id;
            if let Some(raw) = self.raw.get_mut(&child_id)
                && raw.parent_id(&self.accessors) == Some(old)
            {
                raw.set(&key, new.to_value());
            }
        }
        Ok(())
    }

    // ─── Integrity ───────────────────────────────────────────────────────

    /// Verify the forest invariants listed in the module docs.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(TreeError::Integrity(msg));

        if self.raw.len() != self.id_index.len() || self.graph.node_count() != self.id_index.len() {
            return fail(format!(
                "map sizes differ: raw={} index={} records={}",
                self.raw.len(),
                self.id_index.len(),
                self.graph.node_count()
            ));
        }
        for (&id, &idx) in &self.id_index {
            if !self.raw.contains_key(&id) {
                return fail(format!("{id} has a record but no raw node"));
            }
            match self.graph.node_weight(idx) {
                Some(record) if record.id == id => {}
                _ => return fail(format!("{id} indexes the wrong record")),
            }
        }

        let mut seen = HashSet::new();
        for idx in self.graph.node_indices() {
            let record = &self.graph[idx];
            let parents: Vec<_> = self
                .graph
                .neighbors_directed(idx, Direction::Incoming)
                .collect();
            match parents.as_slice() {
                [] => {
                    if self.roots.iter().filter(|&&r| r == idx).count() != 1 {
                        return fail(format!("{} has no parent but is not a root", record.id));
                    }
                }
                [p] => {
                    let count = self.graph[*p].children.iter().filter(|&&c| c == idx).count();
                    if count != 1 {
                        return fail(format!(
                            "{} appears {count} times under {}",
                            record.id, self.graph[*p].id
                        ));
                    }
                    if self.roots.contains(&idx) {
                        return fail(format!("{} has a parent but is listed as a root", record.id));
                    }
                }
                _ => return fail(format!("{} has several parents", record.id)),
            }
            for &child in &record.children {
                if self.graph.find_edge(idx, child).is_none() {
                    return fail(format!("{} lists a child without an edge", record.id));
                }
            }
        }

        // Reachability from the roots also rules out cycles.
        for idx in self.preorder() {
            if !seen.insert(idx) {
                return fail(format!("{} reached twice", self.graph[idx].id));
            }
        }
        if seen.len() != self.graph.node_count() {
            return fail("records unreachable from the roots".into());
        }
        if !self.forest && self.roots.len() > 1 {
            return fail("several roots in single-root mode".into());
        }
        Ok(())
    }
}
