//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `TreeAction`s and applies them
//! through the tree's mutation API.
//!
//! | Key | Action |
//! |-----|--------|
//! | ↓ / ↑ | select next / previous row |
//! | → / ← | expand / collapse the selected node |
//! | Enter, Space | toggle the selected node |
//! | Escape | cancel a drag, else leave search |
//! | ⌘⇧F, Ctrl+Shift+F | leave search |

use crate::input::Modifiers;
use treeview_core::{NodeId, SelectOptions, Tree};

/// Actions that keyboard shortcuts can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeAction {
    SelectNext,
    SelectPrevious,
    Expand,
    Collapse,
    Toggle,
    CancelDrag,
    ClearSearch,
}

/// Resolves key events into tree actions.
pub struct ShortcutMap;

impl ShortcutMap {
    /// Resolve a key event to an action. Returns `None` if the combo has no
    /// binding.
    pub fn resolve(key: &str, modifiers: &Modifiers) -> Option<TreeAction> {
        if modifiers.command() {
            return match key {
                "f" | "F" if modifiers.shift => Some(TreeAction::ClearSearch),
                _ => None,
            };
        }

        match key {
            "ArrowDown" => Some(TreeAction::SelectNext),
            "ArrowUp" => Some(TreeAction::SelectPrevious),
            "ArrowRight" => Some(TreeAction::Expand),
            "ArrowLeft" => Some(TreeAction::Collapse),
            "Enter" | " " => Some(TreeAction::Toggle),
            "Escape" => Some(TreeAction::CancelDrag),
            _ => None,
        }
    }
}

/// Apply `action` to `tree`. Returns whether the tree changed.
///
/// `CancelDrag` belongs to the drag controller and is ignored here.
pub fn apply(tree: &mut Tree, action: TreeAction) -> bool {
    match action {
        TreeAction::SelectNext => {
            let next = match tree.selected() {
                Some(id) => tree.row_after(id).map(|r| r.id),
                None => tree.rows().next().map(|r| r.id),
            };
            select(tree, next)
        }
        TreeAction::SelectPrevious => {
            let previous = match tree.selected() {
                Some(id) => tree.row_before(id).map(|r| r.id),
                None => tree.rows().last().map(|r| r.id),
            };
            select(tree, previous)
        }
        TreeAction::Expand => match tree.selected() {
            Some(id) if tree.is_collapsed(id) => tree.toggle(id),
            _ => false,
        },
        TreeAction::Collapse => match tree.selected() {
            Some(id) if !tree.is_collapsed(id) && !tree.children_of(id).is_empty() => {
                tree.toggle(id)
            }
            _ => false,
        },
        TreeAction::Toggle => tree.selected().is_some_and(|id| tree.toggle(id)),
        TreeAction::ClearSearch => tree.search(None),
        TreeAction::CancelDrag => false,
    }
}

fn select(tree: &mut Tree, target: Option<NodeId>) -> bool {
    target.is_some_and(|id| tree.select(id, SelectOptions::default()))
}
