//! Events emitted by a tree.
//!
//! Events are queued during operations and drained by the host with
//! [`Tree::take_events`](crate::Tree::take_events).

use crate::id::NodeId;

#[derive(Debug, Clone, PartialEq)]
pub enum TreeEvent {
    /// A node arrived on the input stream.
    Node(NodeId),
    /// The input stream ended and everything ingested has been drawn.
    Rendered,
    Select(NodeId),
    Move {
        node: NodeId,
        new_parent: Option<NodeId>,
        previous_parent: Option<NodeId>,
        new_index: usize,
        previous_index: usize,
    },
    DndStart(NodeId),
    DndStop(NodeId),
    DndCancel(NodeId),
    /// A source stream reported a failure, or an ingested record was rejected.
    Error(String),
}

impl TreeEvent {
    /// Short event name, matching the listener names hosts subscribe to.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Node(_) => "node",
            Self::Rendered => "rendered",
            Self::Select(_) => "select",
            Self::Move { .. } => "move",
            Self::DndStart(_) => "dndstart",
            Self::DndStop(_) => "dndstop",
            Self::DndCancel(_) => "dndcancel",
            Self::Error(_) => "error",
        }
    }
}
