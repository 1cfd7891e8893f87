//! Public mutation operations.
//!
//! Each operation validates, changes the store and runs one rebind. Expected
//! races (a duplicate add, an id that was already removed) return
//! `Ok(false)` / `false` and leave the tree untouched.

use super::Tree;
use crate::error::{Result, TreeError};
use crate::event::TreeEvent;
use crate::id::NodeId;
use crate::model::RawNode;
use crate::reconcile::Strategy;
use crate::search::SearchState;
use crate::stream::StreamEvent;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectOptions {
    /// Run even if the node is already selected.
    pub force: bool,
    /// Skip the `select` event.
    pub silent: bool,
}

impl SelectOptions {
    pub fn forced() -> Self {
        Self {
            force: true,
            silent: false,
        }
    }

    pub fn silent() -> Self {
        Self {
            force: false,
            silent: true,
        }
    }
}

impl Tree {
    // ─── Selection & collapse ────────────────────────────────────────────

    /// Select `id`, revealing it. Returns `false` if nothing changed.
    pub fn select(&mut self, id: NodeId, opts: SelectOptions) -> bool {
        let Some(idx) = self.store.index_of(id) else {
            log::debug!("select: unknown node {id}");
            return false;
        };
        let was_selected = self.selected == Some(id);
        if was_selected && !opts.force {
            return false;
        }

        for ancestor in self.store.ancestors(idx) {
            self.store.graph[ancestor].collapsed = false;
        }
        let record = &self.store.graph[idx];
        let expanded_and_unselected = !record.collapsed && !was_selected;
        if self.options.toggle_on_select && !self.is_fixed_root(id) && !expanded_and_unselected {
            let record = &mut self.store.graph[idx];
            record.collapsed = !record.collapsed;
        }

        let parent_rendered = self
            .store
            .parent(idx)
            .is_none_or(|p| self.rendered.contains_key(&self.store.graph[p].id));
        self.selected = Some(id);
        self.rebind(Strategy::Fly, parent_rendered);
        if !opts.silent {
            self.emit(TreeEvent::Select(id));
        }
        true
    }

    /// Leave search mode if it is active, then select `id` with `force`.
    /// Leaving search collapses every collapsible node first.
    pub fn click(&mut self, id: NodeId) -> bool {
        if !self.store.contains(id) {
            return false;
        }
        if self.search.take().is_some() {
            log::debug!("click: leaving search mode");
            let fixed = (!self.options.forest).then(|| self.store.first_root()).flatten();
            for record in self.store.records_mut() {
                if Some(record.id) != fixed {
                    record.collapsed = true;
                }
            }
        }
        self.select(id, SelectOptions::forced())
    }

    /// Flip the collapse flag of `id`. The single root never collapses.
    pub fn toggle(&mut self, id: NodeId) -> bool {
        if self.is_fixed_root(id) {
            return false;
        }
        let Some(record) = self.store.record_mut(id) else {
            log::debug!("toggle: unknown node {id}");
            return false;
        };
        record.collapsed = !record.collapsed;
        log::trace!("toggle: {id} collapsed={}", record.collapsed);
        self.rebind(Strategy::Fly, true);
        true
    }

    pub fn expand_all(&mut self) {
        self.set_all_collapsed(false);
    }

    pub fn collapse_all(&mut self) {
        self.set_all_collapsed(true);
    }

    fn set_all_collapsed(&mut self, collapsed: bool) {
        let fixed = (!self.options.forest).then(|| self.store.first_root()).flatten();
        for record in self.store.records_mut() {
            if Some(record.id) != fixed {
                record.collapsed = collapsed;
            }
        }
        let animate = self.store.len() < self.options.max_animatable;
        self.rebind(Strategy::Fly, animate);
    }

    // ─── Structure ───────────────────────────────────────────────────────

    /// Insert `raw` under `parent` at `index` (append when `None`).
    ///
    /// A duplicate id or a parent that no longer exists is a silent no-op.
    /// A second root outside forest mode is an error.
    pub fn add(&mut self, raw: RawNode, parent: Option<NodeId>, index: Option<usize>) -> Result<bool> {
        let id = raw.require_id(self.store.accessors())?;
        if self.store.contains(id) {
            log::debug!("add: {id} already exists");
            return Ok(false);
        }
        if let Some(p) = parent
            && !self.store.contains(p)
        {
            log::debug!("add: parent {p} is gone");
            return Ok(false);
        }
        if parent.is_none() && !self.options.forest && !self.store.is_empty() {
            return Err(TreeError::RootExists);
        }

        if let Some(p) = parent
            && self.selected == Some(p)
            && let Some(record) = self.store.record_mut(p)
        {
            record.collapsed = false;
        }
        self.store.insert_at(raw, parent, index)?;
        self.rebind(Strategy::Slide { source: parent.unwrap_or(id) }, true);
        Ok(true)
    }

    /// Move `id` (with its subtree) under `to` at `index`. The index is read
    /// against the sibling list after `id` is taken out of it.
    ///
    /// A `move` event fires only if the slot actually changed.
    pub fn move_node(&mut self, id: NodeId, to: Option<NodeId>, index: Option<usize>) -> Result<bool> {
        let Some(before) = self.store.slot(id) else {
            log::debug!("move: unknown node {id}");
            return Ok(false);
        };
        if let Some(p) = to
            && !self.store.contains(p)
        {
            log::debug!("move: target {p} is gone");
            return Ok(false);
        }
        self.store.relocate(id, to, index)?;
        let after = self.store.slot(id).unwrap_or(before);
        if after != before {
            self.emit(TreeEvent::Move {
                node: id,
                new_parent: after.0,
                previous_parent: before.0,
                new_index: after.1,
                previous_index: before.1,
            });
        }
        self.rebind(Strategy::Slide { source: id }, true);
        Ok(true)
    }

    /// Deep-copy the subtree at `id` under `to`. Returns the copy's root id.
    pub fn copy(&mut self, id: NodeId, to: Option<NodeId>, index: Option<usize>) -> Result<Option<NodeId>> {
        self.copy_with(id, to, index, RawNode::clone)
    }

    /// Deep-copy the subtree at `id`, passing every raw node through
    /// `transform`. A transformed id that is free is kept; otherwise a fresh
    /// id is generated. The copies' `parentId` fields point at their new
    /// parents and collapse flags carry over.
    pub fn copy_with(
        &mut self,
        id: NodeId,
        to: Option<NodeId>,
        index: Option<usize>,
        mut transform: impl FnMut(&RawNode) -> RawNode,
    ) -> Result<Option<NodeId>> {
        let Some(root) = self.store.index_of(id) else {
            log::debug!("copy: unknown node {id}");
            return Ok(None);
        };
        if let Some(p) = to
            && !self.store.contains(p)
        {
            log::debug!("copy: target {p} is gone");
            return Ok(None);
        }
        if to.is_none() && !self.options.forest {
            return Err(TreeError::RootExists);
        }

        let acc = self.store.accessors().clone();
        let mut remap: HashMap<NodeId, NodeId> = HashMap::new();
        let mut staged = Vec::new();
        for idx in self.store.subtree(root) {
            let record = &self.store.graph[idx];
            let old = record.id;
            let parent = self.store.parent(idx).map(|p| self.store.graph[p].id);
            let Some(source) = self.store.raw(old) else {
                continue;
            };
            let mut raw = transform(source);
            let new = match raw.id(&acc) {
                Some(candidate)
                    if candidate != old
                        && !self.store.contains(candidate)
                        && !remap.values().any(|&v| v == candidate) =>
                {
                    candidate
                }
                _ => fresh_id(old, |c| self.store.contains(c) || remap.values().any(|&v| v == c)),
            };
            raw.set(&acc.id, new.to_value());
            remap.insert(old, new);
            staged.push((raw, parent, record.collapsed));
        }

        let mut copy_root = None;
        for (mut raw, old_parent, collapsed) in staged {
            let (parent, at) = match copy_root {
                None => (to, index),
                Some(_) => (old_parent.and_then(|p| remap.get(&p).copied()), None),
            };
            match parent {
                Some(p) => raw.set(&acc.parent_id, p.to_value()),
                None => {
                    raw.remove(&acc.parent_id);
                }
            }
            let new = self.store.insert_at(raw, parent, at)?;
            if let Some(record) = self.store.record_mut(new) {
                record.collapsed = collapsed;
            }
            copy_root.get_or_insert(new);
        }
        log::debug!("copy: {id} -> {copy_root:?} ({} node(s))", remap.len());
        self.rebind(Strategy::Slide { source: id }, true);
        Ok(copy_root)
    }

    /// Delete `id` and its subtree. The exiting rows slide toward the removed
    /// node's own last position.
    pub fn remove_node(&mut self, id: NodeId) -> bool {
        let Some(removed) = self.store.remove(id) else {
            log::debug!("remove: unknown node {id}");
            return false;
        };
        if self.selected.is_some_and(|s| removed.contains(&s)) {
            self.selected = None;
        }
        if self.pending_edit.is_some_and(|s| removed.contains(&s)) {
            self.pending_edit = self.store.first_root();
        }
        self.rebind(Strategy::Slide { source: id }, true);
        true
    }

    // ─── Edits ───────────────────────────────────────────────────────────

    /// Merge one patch (keyed by its id field). Returns `false` if the node
    /// does not exist.
    pub fn edit(&mut self, patch: &RawNode) -> bool {
        self.edit_many(std::slice::from_ref(patch)) == 1
    }

    /// Merge every patch, then reconcile once. Returns how many applied.
    pub fn edit_many<'a>(&mut self, patches: impl IntoIterator<Item = &'a RawNode>) -> usize {
        let mut source = None;
        let mut applied = 0;
        for patch in patches {
            if let Some(id) = self.merge_patch(patch) {
                source.get_or_insert(id);
                applied += 1;
            }
        }
        if let Some(source) = source {
            self.rebind(Strategy::Slide { source }, true);
        }
        applied
    }

    /// Handle one patch-stream event. Patches are merged as they arrive and
    /// reconciled once at `End`. Returns `true` once the stream ended.
    pub fn edit_event(&mut self, event: StreamEvent<RawNode>) -> bool {
        match event {
            StreamEvent::Data(patch) => {
                if let Some(id) = self.merge_patch(&patch) {
                    self.pending_edit.get_or_insert(id);
                }
                false
            }
            StreamEvent::End => {
                if let Some(source) = self.pending_edit.take() {
                    self.rebind(Strategy::Slide { source }, true);
                }
                true
            }
            StreamEvent::Error(message) => {
                log::warn!("edit: patch source error: {message}");
                self.emit(TreeEvent::Error(message));
                false
            }
        }
    }

    fn merge_patch(&mut self, patch: &RawNode) -> Option<NodeId> {
        let Some(id) = patch.id(self.store.accessors()) else {
            log::warn!("edit: patch without an id ignored");
            return None;
        };
        if self.store.merge(id, patch) {
            log::trace!("edit: merged {id}");
            Some(id)
        } else {
            log::debug!("edit: unknown node {id}");
            None
        }
    }

    // ─── Search ──────────────────────────────────────────────────────────

    /// Enter (or refine) search mode with `term`, or leave it with `None`.
    ///
    /// Leaving restores the selection held when the search began; if that
    /// node was removed meanwhile the first root is selected instead.
    pub fn search(&mut self, term: Option<&str>) -> bool {
        match term {
            Some(term) => {
                let previous = match &self.search {
                    Some(state) => state.previous,
                    None => self.selected,
                };
                log::debug!("search: {term:?}");
                self.search = Some(SearchState::new(term, previous));
            }
            None => {
                let Some(state) = self.search.take() else {
                    return false;
                };
                self.selected = match state.previous {
                    Some(p) if self.store.contains(p) => Some(p),
                    Some(_) => self.store.first_root(),
                    None => None,
                };
            }
        }
        self.rebind(Strategy::Replace, false);
        true
    }
}

/// An id derived from `base` that `taken` rejects.
fn fresh_id(base: NodeId, taken: impl Fn(NodeId) -> bool) -> NodeId {
    loop {
        let candidate = NodeId::with_prefix(base.as_str());
        if !taken(candidate) {
            return candidate;
        }
    }
}
