//! Input stream protocol.
//!
//! Node insertions and edit patches arrive as ordered [`StreamEvent`]s ending
//! with an explicit `End`. Each event is fully handled (inserted or merged,
//! and reconciled) before the next one is read. Source failures are
//! forwarded as `TreeEvent::Error`; they never abort the tree.

use crate::event::TreeEvent;
use crate::model::RawNode;
use crate::tree::Tree;
use tokio::sync::mpsc::UnboundedReceiver;

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent<T> {
    Data(T),
    End,
    Error(String),
}

/// Feed a node-insertion channel into `tree` until it ends.
///
/// A channel that closes without `End` is reported as an error and treated
/// as ended.
pub async fn drive(tree: &mut Tree, rx: &mut UnboundedReceiver<StreamEvent<RawNode>>) {
    loop {
        match rx.recv().await {
            Some(event) => {
                if tree.ingest(event) {
                    break;
                }
            }
            None => {
                log::warn!("stream: node source closed without an end signal");
                tree.emit(TreeEvent::Error("node stream closed without end signal".into()));
                break;
            }
        }
    }
}

/// Feed a patch channel into `tree`. The edits are reconciled once, when the
/// stream completes.
pub async fn drive_edits(tree: &mut Tree, rx: &mut UnboundedReceiver<StreamEvent<RawNode>>) {
    loop {
        match rx.recv().await {
            Some(event) => {
                if tree.edit_event(event) {
                    break;
                }
            }
            None => {
                log::warn!("stream: patch source closed without an end signal");
                tree.emit(TreeEvent::Error("patch stream closed without end signal".into()));
                tree.edit_event(StreamEvent::End);
                break;
            }
        }
    }
}
