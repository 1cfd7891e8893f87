pub mod drag;
pub mod input;
pub mod shortcuts;

pub use drag::{DragController, DragOutcome, DragPhase, DropPlan, Traveler};
pub use input::{InputEvent, Modifiers};
pub use shortcuts::{ShortcutMap, TreeAction};
