//! Tree configuration.
//!
//! `TreeOptions` is plain data: it can be built in code or deserialized from
//! JSON, and every `Tree` takes its own copy at construction. Behaviour hooks
//! (`DragPolicy`, `RowPresenter`) are injected separately as trait objects.

use crate::error::{Result, TreeError};
use crate::id::NodeId;
use crate::model::RawNode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field names used to read raw node records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Accessors {
    pub id: String,
    pub parent_id: String,
    pub label: String,
    pub icon: String,
    pub color: String,
    pub visible: String,
}

impl Default for Accessors {
    fn default() -> Self {
        Self {
            id: "id".into(),
            parent_id: "parentId".into(),
            label: "label".into(),
            icon: "icon".into(),
            color: "color".into(),
            visible: "visible".into(),
        }
    }
}

/// Drag-and-drop tuning, consumed by the drag controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DragOptions {
    /// Hold time before a pressed row starts traveling without motion.
    pub delay_ms: u64,
    /// Distance from a row's top edge at which a drop turns into an embed.
    pub embed_threshold: f32,
    /// Height of the band at the viewport edges that triggers auto-scroll.
    pub autoscroll_band: f32,
    /// Pixels scrolled per auto-scroll tick.
    pub autoscroll_step: f32,
    pub autoscroll_interval_ms: u64,
}

impl Default for DragOptions {
    fn default() -> Self {
        Self {
            delay_ms: 350,
            embed_threshold: 12.0,
            autoscroll_band: 24.0,
            autoscroll_step: 10.0,
            autoscroll_interval_ms: 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TreeOptions {
    /// Indent per depth level.
    pub depth: f32,
    /// Row height.
    pub height: f32,
    /// Distinct height of the first (root) row, if any.
    pub root_height: Option<f32>,
    /// Row delta above which transitions are replaced immediately.
    pub max_animatable: usize,
    /// Row count above which rendering is windowed to the viewport.
    pub performance_threshold: usize,
    pub forest: bool,
    pub toggle_on_select: bool,
    /// Sentinel id for the transient node.
    pub transient_id: Value,
    pub accessors: Accessors,
    /// Id to select as soon as it arrives on the input stream.
    pub initial_selection: Option<Value>,
    pub duration_ms: u64,
    pub viewport_height: f32,
    pub drag: DragOptions,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            depth: 20.0,
            height: 20.0,
            root_height: None,
            max_animatable: 100,
            performance_threshold: 1000,
            forest: false,
            toggle_on_select: true,
            transient_id: Value::from(-1),
            accessors: Accessors::default(),
            initial_selection: None,
            duration_ms: 300,
            viewport_height: 600.0,
            drag: DragOptions::default(),
        }
    }
}

impl TreeOptions {
    /// Parse options from a JSON document. Missing fields take defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        let options: Self =
            serde_json::from_str(text).map_err(|e| TreeError::ConfigParse(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.height.is_finite() && self.height > 0.0) {
            return Err(invalid("height", format!("must be positive, got {}", self.height)));
        }
        if !(self.depth.is_finite() && self.depth >= 0.0) {
            return Err(invalid("depth", format!("must be non-negative, got {}", self.depth)));
        }
        if let Some(h) = self.root_height
            && !(h.is_finite() && h > 0.0)
        {
            return Err(invalid("rootHeight", format!("must be positive, got {h}")));
        }
        if !(self.viewport_height.is_finite() && self.viewport_height >= 0.0) {
            return Err(invalid("viewportHeight", "must be non-negative".into()));
        }
        if NodeId::from_value(&self.transient_id).is_none() {
            return Err(invalid("transientId", "must be a number or a string".into()));
        }
        if let Some(sel) = &self.initial_selection
            && NodeId::from_value(sel).is_none()
        {
            return Err(invalid("initialSelection", "must be a number or a string".into()));
        }
        let a = &self.accessors;
        for (name, field) in [
            ("accessors.id", &a.id),
            ("accessors.parentId", &a.parent_id),
            ("accessors.label", &a.label),
            ("accessors.visible", &a.visible),
        ] {
            if field.is_empty() {
                return Err(invalid(name, "must not be empty".into()));
            }
        }
        if self.drag.autoscroll_interval_ms == 0 {
            return Err(invalid("drag.autoscrollIntervalMs", "must be at least 1".into()));
        }
        Ok(())
    }

    pub fn transient_id(&self) -> NodeId {
        NodeId::from_value(&self.transient_id).unwrap_or_else(|| NodeId::from(-1))
    }

    pub fn initial_selection(&self) -> Option<NodeId> {
        self.initial_selection.as_ref().and_then(NodeId::from_value)
    }

    /// Extra offset applied to every row after the first.
    pub fn root_offset(&self) -> f32 {
        self.root_height.map_or(0.0, |h| h - self.height)
    }
}

fn invalid(option: &'static str, reason: String) -> TreeError {
    TreeError::Config { option, reason }
}

/// Legality hooks consulted by the drag controller.
pub trait DragPolicy {
    /// Whether `node` may be picked up at all.
    fn movable(&self, _node: &RawNode) -> bool {
        true
    }

    /// Whether `node` may be dropped under `parent` (`None` = top level).
    fn droppable(&self, _node: &RawNode, _parent: Option<&RawNode>) -> bool {
        true
    }
}

/// Every node movable, every drop legal.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl DragPolicy for AllowAll {}
