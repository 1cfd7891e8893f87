//! Input abstraction layer.
//!
//! Normalizes mouse, touch and keyboard events into a unified `InputEvent`
//! consumed by the drag controller. Pointer coordinates are relative to the
//! top-left corner of the tree's viewport, not the scrolled content.

/// Keyboard modifier state at the time of an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        ctrl: false,
        shift: false,
        alt: false,
        meta: false,
    };

    /// ⌘ on macOS, Ctrl elsewhere.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// A normalized input event.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Pointer pressed (mouse down, touch start).
    PointerDown { x: f32, y: f32 },

    /// Pointer moved (mouse move, touch move).
    PointerMove { x: f32, y: f32 },

    /// Pointer released.
    PointerUp { x: f32, y: f32 },

    /// Key pressed; `key` is the `KeyboardEvent.key` value.
    Key { key: String, modifiers: Modifiers },
}

impl InputEvent {
    pub fn key(key: &str) -> Self {
        Self::Key {
            key: key.to_string(),
            modifiers: Modifiers::NONE,
        }
    }

    /// Extract position if this is a pointer event.
    pub fn position(&self) -> Option<(f32, f32)> {
        match self {
            Self::PointerDown { x, y } | Self::PointerMove { x, y } | Self::PointerUp { x, y } => {
                Some((*x, *y))
            }
            Self::Key { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_events_carry_positions() {
        assert_eq!(
            InputEvent::PointerMove { x: 3.0, y: 4.0 }.position(),
            Some((3.0, 4.0))
        );
        assert_eq!(InputEvent::key("Escape").position(), None);
    }

    #[test]
    fn command_is_ctrl_or_meta() {
        assert!(!Modifiers::NONE.command());
        let m = Modifiers {
            meta: true,
            ..Modifiers::NONE
        };
        assert!(m.command());
    }
}
