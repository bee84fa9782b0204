#![forbid(unsafe_code)]

//! Core: geometry, element handles, and canonical raw input.
//!
//! # Role in dragforge
//! `dragforge-core` is the vocabulary shared by every other crate. It owns no
//! behavior beyond pure geometry and a retained element tree.
//!
//! # Primary responsibilities
//! - **Geometry**: [`Point`] and [`Rect`] in absolute host coordinates.
//! - **Ids**: [`DraggableId`] and [`DropTargetId`], chosen by the host.
//! - **Elements**: opaque [`ElementId`] handles and the [`VisualTree`] seam.
//! - **Input**: [`RawInput`] events that sensors consume.
//!
//! # How it fits in the system
//! `dragforge-collision` runs strategies over `Rect`s and walks the
//! `VisualTree` for container depth. `dragforge-sensors` turns `RawInput`
//! into gestures. `dragforge-engine` ties both together.

pub mod element;
pub mod geometry;
pub mod ids;
pub mod input;

pub use element::{ElementId, ElementTree, MAX_ANCESTOR_WALK, VisualTree, ancestors_of};
pub use geometry::{Point, Rect};
pub use ids::{DraggableId, DropTargetId};
pub use input::{
    KeyCode, KeyEvent, KeyEventKind, Modifiers, PointerButton, RawInput, RawInputKind, TouchPoint,
};
