//! Error taxonomy for the tree engine.
//!
//! Configuration problems and programmer errors surface as `TreeError`.
//! Expected races (adding an id that already exists, touching a node that was
//! just removed) are silent no-ops reported as `Ok(false)` by the operation,
//! and source-stream failures are queued as `TreeEvent::Error` instead.

use crate::id::NodeId;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TreeError {
    #[error("invalid option `{option}`: {reason}")]
    Config { option: &'static str, reason: String },
    #[error("failed to parse tree options: {0}")]
    ConfigParse(String),
    #[error("raw node is not a JSON object")]
    NotAnObject,
    #[error("raw node has no usable `{0}` field")]
    MissingId(String),
    #[error("node {0} already exists")]
    DuplicateId(NodeId),
    #[error("a root node already exists; enable forest mode for multiple roots")]
    RootExists,
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    #[error("cannot attach {node} under its own descendant {parent}")]
    WouldCycle { node: NodeId, parent: NodeId },
    #[error("no transient node present")]
    NoTransient,
    #[error("structural invariant violated: {0}")]
    Integrity(String),
}

pub type Result<T> = std::result::Result<T, TreeError>;
