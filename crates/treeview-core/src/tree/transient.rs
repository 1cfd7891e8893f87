//! Transient node lifecycle.
//!
//! At most one provisional node exists at a time, stored under the sentinel
//! id from `TreeOptions::transient_id`. It is either discarded or promoted to
//! a permanent id, which rewrites the sentinel everywhere without moving any
//! row.

use super::Tree;
use crate::error::{Result, TreeError};
use crate::id::NodeId;
use crate::model::RawNode;
use crate::reconcile::{RowSet, Strategy};

impl Tree {
    /// The transient node, if one exists.
    pub fn transient(&self) -> Option<&RawNode> {
        self.store.raw(self.options.transient_id())
    }

    /// Insert `raw` under the sentinel id, replacing any earlier transient.
    ///
    /// The earlier transient is only discarded once the new one is known to
    /// fit; a rejected call leaves it in place.
    pub fn add_transient(
        &mut self,
        mut raw: RawNode,
        parent: Option<NodeId>,
        index: Option<usize>,
    ) -> Result<bool> {
        let sentinel = self.options.transient_id();
        let doomed = self
            .store
            .index_of(sentinel)
            .map(|idx| self.store.subtree(idx).len())
            .unwrap_or(0);
        if let Some(p) = parent
            && (!self.store.contains(p) || p == sentinel || self.store.is_ancestor_of(sentinel, p))
        {
            log::debug!("transient: parent {p} is unavailable");
            return Ok(false);
        }
        if parent.is_none() && !self.options.forest && self.store.len() > doomed {
            return Err(TreeError::RootExists);
        }

        if let Some(removed) = self.store.remove(sentinel) {
            log::debug!("transient: replacing earlier transient ({} node(s))", removed.len());
            if self.selected.is_some_and(|s| removed.contains(&s)) {
                self.selected = None;
            }
            if self.pending_edit.is_some_and(|s| removed.contains(&s)) {
                self.pending_edit = None;
            }
        }
        let key = self.store.accessors().id.clone();
        raw.set(&key, sentinel.to_value());
        self.add(raw, parent, index)
    }

    /// Merge `patch` into the transient node. Its id field is ignored.
    pub fn edit_transient(&mut self, patch: &RawNode) -> Result<()> {
        let sentinel = self.options.transient_id();
        if !self.store.merge(sentinel, patch) {
            return Err(TreeError::NoTransient);
        }
        self.rebind(Strategy::Slide { source: sentinel }, true);
        Ok(())
    }

    pub fn move_transient(&mut self, to: Option<NodeId>, index: Option<usize>) -> Result<bool> {
        let sentinel = self.options.transient_id();
        if !self.store.contains(sentinel) {
            return Err(TreeError::NoTransient);
        }
        self.move_node(sentinel, to, index)
    }

    /// Promote the transient node to `new_id`. Rows keep their place; the
    /// presenter sees an update-only pass.
    pub fn save_transient(&mut self, new_id: NodeId) -> Result<()> {
        let sentinel = self.options.transient_id();
        if !self.store.contains(sentinel) {
            return Err(TreeError::NoTransient);
        }
        self.store.rename(sentinel, new_id)?;
        log::debug!("transient: saved as {new_id}");

        let swap = |id: NodeId| if id == sentinel { new_id } else { id };
        self.selected = self.selected.map(swap);
        self.pending_edit = self.pending_edit.map(swap);
        if let Some(search) = &mut self.search {
            search.previous = search.previous.map(swap);
        }
        let rendered = std::mem::take(&mut self.rendered);
        self.rendered = rendered
            .into_iter()
            .map(|(id, mut row)| {
                row.id = swap(row.id);
                row.parent = row.parent.map(swap);
                (swap(id), row)
            })
            .collect::<RowSet>();

        self.rebind(Strategy::Replace, false);
        Ok(())
    }

    /// Discard the transient node. Returns `false` if there was none.
    pub fn remove_transient(&mut self) -> bool {
        let sentinel = self.options.transient_id();
        self.remove_node(sentinel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TreeOptions;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn tree() -> Tree {
        Tree::with_nodes(
            TreeOptions::default(),
            [
                RawNode::new("R").with("label", "R"),
                RawNode::new("A").with("label", "A").with("parentId", "R"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn lifecycle() {
        let mut tree = tree();
        let sentinel = NodeId::from(-1);
        assert!(tree
            .add_transient(RawNode::default().with("label", "draft"), Some(NodeId::intern("A")), None)
            .unwrap());
        assert_eq!(tree.transient().unwrap().get("id"), Some(&json!(-1)));
        assert_eq!(tree.parent_of(sentinel), Some(NodeId::intern("A")));

        tree.edit_transient(&RawNode::new(5).with("label", "named")).unwrap();
        assert_eq!(tree.row(sentinel).unwrap().label.as_deref(), Some("named"));

        tree.move_transient(Some(NodeId::intern("R")), Some(0)).unwrap();
        assert_eq!(tree.children_of(NodeId::intern("R"))[0], sentinel);

        tree.save_transient(NodeId::from(42)).unwrap();
        assert!(tree.transient().is_none());
        let saved = NodeId::from(42);
        assert_eq!(tree.get(saved).unwrap().get("id"), Some(&json!(42)));
        let patch = tree.last_patch().unwrap();
        assert!(patch.entered.is_empty());
        assert!(patch.exited.is_empty());
        assert!(patch.updated_ids().contains(&saved));
        tree.store().validate().unwrap();
    }

    #[test]
    fn adding_a_second_transient_replaces_the_first() {
        let mut tree = tree();
        let r = NodeId::intern("R");
        tree.add_transient(RawNode::default().with("label", "one"), Some(r), None)
            .unwrap();
        tree.add_transient(RawNode::default().with("label", "two"), Some(r), None)
            .unwrap();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.transient().unwrap().get("label"), Some(&json!("two")));
    }

    #[test]
    fn rejected_transient_keeps_the_earlier_one() {
        let mut tree = tree();
        let a = NodeId::intern("A");
        let sentinel = NodeId::from(-1);
        tree.add_transient(RawNode::default().with("label", "draft"), Some(a), None)
            .unwrap();
        let rows = tree.visible_ids();

        let added = tree
            .add_transient(RawNode::default().with("label", "other"), Some(NodeId::intern("gone")), None)
            .unwrap();
        assert!(!added);
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.transient().unwrap().get("label"), Some(&json!("draft")));
        assert_eq!(tree.parent_of(sentinel), Some(a));
        assert_eq!(tree.visible_ids(), rows);

        assert_eq!(
            tree.add_transient(RawNode::default(), None, None),
            Err(TreeError::RootExists)
        );
        assert!(tree.transient().is_some());
        assert!(!tree
            .add_transient(RawNode::default(), Some(sentinel), None)
            .unwrap());
        assert_eq!(tree.len(), 3);
        tree.store().validate().unwrap();
    }

    #[test]
    fn missing_transient_is_a_programmer_error() {
        let mut tree = tree();
        assert_eq!(tree.save_transient(NodeId::intern("x")), Err(TreeError::NoTransient));
        assert_eq!(
            tree.edit_transient(&RawNode::default().with("label", "x")),
            Err(TreeError::NoTransient)
        );
        assert!(!tree.remove_transient());
    }

    #[test]
    fn remove_transient_uses_the_remove_path() {
        let mut tree = tree();
        tree.add_transient(RawNode::default(), Some(NodeId::intern("A")), None)
            .unwrap();
        assert!(tree.remove_transient());
        assert_eq!(tree.len(), 2);
        tree.store().validate().unwrap();
    }
}
