pub mod config;
pub mod error;
pub mod event;
pub mod id;
pub mod layout;
pub mod model;
pub mod reconcile;
pub mod scheduler;
pub mod search;
pub mod store;
pub mod stream;
pub mod tree;

pub use config::{Accessors, AllowAll, DragOptions, DragPolicy, TreeOptions};
pub use error::{Result, TreeError};
pub use event::TreeEvent;
pub use id::NodeId;
pub use layout::{Metrics, Placement, layout};
pub use model::{LayoutRecord, RawNode};
pub use reconcile::{
    EnterRow, ExitRow, NullPresenter, Patch, Row, RowPresenter, RowSet, Strategy, Transition,
    Viewport,
};
pub use scheduler::{TaskId, Timers};
pub use store::{NodeStore, Slot};
pub use stream::StreamEvent;
pub use tree::{SelectOptions, Tree};

// Re-export petgraph types so downstream crates don't need a direct dependency
pub use petgraph::graph::NodeIndex;
