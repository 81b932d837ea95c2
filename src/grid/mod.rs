//! Shelf grid: placeholder slots, selection and auto-advance

pub mod advance;
pub mod select;
pub mod space;

pub use advance::{auto_advance, Advance, AutoAdvanceConfig, InputMode};
pub use select::{range_select, DragState, Gesture, Selection, DRAG_HOLD_THRESHOLD};
pub use space::{ShelfView, TrayCell, TraySpace, TraySpaceCache};
