//! Node data model.
//!
//! Two records exist per node id:
//!
//! - [`RawNode`]: the consumer's display data, a JSON object. The engine
//!   only changes it through explicit edit/merge operations (and the id
//!   rewrite of a saved transient node). `parentId` is read on insertion;
//!   after that the structure is authoritative and moves leave the field
//!   as the consumer wrote it.
//! - [`LayoutRecord`]: engine-owned structure: ordered children,
//!   collapse/visibility flags and the position computed by the last layout.
//!   Records live in the node store's arena; the parent is a graph edge, not
//!   an owning pointer.

use crate::config::Accessors;
use crate::error::{Result, TreeError};
use crate::id::NodeId;
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use smallvec::SmallVec;

// ─── Raw node ────────────────────────────────────────────────────────────

/// Consumer-supplied node data: `id`, optional `parentId`, optional
/// `visible`, plus arbitrary display fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawNode(pub Map<String, Value>);

impl RawNode {
    /// A raw node holding only an id under the default `id` field.
    pub fn new(id: impl Into<Value>) -> Self {
        let mut map = Map::new();
        map.insert("id".into(), id.into());
        Self(map)
    }

    /// Builder-style field setter.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_string(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn id(&self, acc: &Accessors) -> Option<NodeId> {
        self.get(&acc.id).and_then(NodeId::from_value)
    }

    /// The declared parent. A `null` parent counts as absent.
    pub fn parent_id(&self, acc: &Accessors) -> Option<NodeId> {
        self.get(&acc.parent_id).and_then(NodeId::from_value)
    }

    pub fn label<'a>(&'a self, acc: &Accessors) -> Option<&'a str> {
        self.get(&acc.label).and_then(Value::as_str)
    }

    pub fn icon<'a>(&'a self, acc: &Accessors) -> Option<&'a str> {
        self.get(&acc.icon).and_then(Value::as_str)
    }

    pub fn color<'a>(&'a self, acc: &Accessors) -> Option<&'a str> {
        self.get(&acc.color).and_then(Value::as_str)
    }

    /// `visible: false` hides a node; anything else leaves it shown.
    pub fn visible(&self, acc: &Accessors) -> bool {
        !matches!(self.get(&acc.visible), Some(Value::Bool(false)))
    }

    /// The id, or `MissingId` naming the configured field.
    pub fn require_id(&self, acc: &Accessors) -> Result<NodeId> {
        self.id(acc)
            .ok_or_else(|| TreeError::MissingId(acc.id.clone()))
    }

    /// Shallow-merge `patch` into this node. Returns the new `visible` flag
    /// if the patch carried one.
    pub fn merge(&mut self, patch: &RawNode, acc: &Accessors) -> Option<bool> {
        let mut visibility = None;
        for (key, value) in &patch.0 {
            if *key == acc.id {
                continue;
            }
            if *key == acc.visible {
                visibility = Some(!matches!(value, Value::Bool(false)));
            }
            self.0.insert(key.clone(), value.clone());
        }
        visibility
    }
}

impl TryFrom<Value> for RawNode {
    type Error = TreeError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(TreeError::NotAnObject),
        }
    }
}

// ─── Layout record ───────────────────────────────────────────────────────

/// Engine-internal structure for one node.
#[derive(Debug, Clone)]
pub struct LayoutRecord {
    pub id: NodeId,
    /// Ordered children; insertion order is display order.
    pub children: SmallVec<[NodeIndex; 4]>,
    pub collapsed: bool,
    /// `false` excludes the node and its subtree from traversal.
    pub visible: bool,
    /// Indent (depth × indent unit) from the last layout.
    pub x: f32,
    /// Vertical offset from the last layout.
    pub y: f32,
    pub depth: usize,
}

impl LayoutRecord {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            children: SmallVec::new(),
            collapsed: false,
            visible: true,
            x: 0.0,
            y: 0.0,
            depth: 0,
        }
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_fields_through_accessors() {
        let acc = Accessors::default();
        let raw = RawNode::new(3).with("parentId", 1).with("label", "Docs");
        assert_eq!(raw.id(&acc), Some(NodeId::from(3)));
        assert_eq!(raw.parent_id(&acc), Some(NodeId::from(1)));
        assert_eq!(raw.label(&acc), Some("Docs"));
        assert!(raw.visible(&acc));

        let custom = Accessors {
            label: "name".into(),
            ..Accessors::default()
        };
        let raw = RawNode::new("a").with("name", "Alpha");
        assert_eq!(raw.label(&custom), Some("Alpha"));
    }

    #[test]
    fn null_parent_is_a_root() {
        let acc = Accessors::default();
        let raw = RawNode::try_from(json!({ "id": 1, "parentId": null })).unwrap();
        assert_eq!(raw.parent_id(&acc), None);
    }

    #[test]
    fn merge_is_shallow_and_keeps_id() {
        let acc = Accessors::default();
        let mut raw = RawNode::new(1).with("label", "a").with("color", "red");
        let patch = RawNode::try_from(json!({ "id": 99, "label": "b", "visible": false })).unwrap();
        let vis = raw.merge(&patch, &acc);
        assert_eq!(vis, Some(false));
        assert_eq!(raw.id(&acc), Some(NodeId::from(1)));
        assert_eq!(raw.label(&acc), Some("b"));
        assert_eq!(raw.get("color"), Some(&json!("red")));
        assert!(!raw.visible(&acc));
    }

    #[test]
    fn non_objects_are_rejected() {
        assert_eq!(RawNode::try_from(json!([1, 2])), Err(TreeError::NotAnObject));
    }
}
