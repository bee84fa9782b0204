#![forbid(unsafe_code)]

//! Drag engine for dragforge.
//!
//! # Role in dragforge
//! `dragforge-engine` is the single authority over "is a drag in progress".
//! It turns sensor gestures into the public drag event stream, asking the
//! collision detector which drop target the drag is over.
//!
//! # Primary responsibilities
//! - **Registries**: draggables and drop targets keyed by host ids.
//! - **State machine**: [`DragEngine`] runs start, move, end and cancel.
//! - **Event bus**: typed listeners per [`DragEventKind`], panics contained.
//! - **Coalescing**: `dragmove` is delivered at most once per [`DragEngine::tick`].
//! - **Constraints**: [`DragConstraint`]s shape every moved position.
//! - **Configuration**: [`EngineConfig`], loadable from TOML/JSON with the
//!   `config-file` feature.
//!
//! # How it fits in the system
//! The host owns a [`DragEngine`], forwards raw input to
//! [`DragEngine::handle_input`], calls [`DragEngine::tick`] once per frame
//! and renders from the events it subscribed to.

pub mod bus;
pub mod coalesce;
pub mod config;
pub mod constraints;
pub mod engine;
pub mod event;
pub mod registry;
pub mod session;

pub use bus::{EventBus, ListenerHandle};
pub use coalesce::FrameCoalescer;
pub use config::{
    CollisionConfig, CollisionStrategyName, ConfigError, EngineConfig, KeyboardConfig,
    ManagerConfig, PointerConfig, TouchConfig,
};
pub use constraints::{Axis, AxisLock, ClampToBounds, ConstraintContext, DragConstraint, SnapToGrid};
pub use engine::{DragEngine, DragEngineBuilder};
pub use event::{DragEvent, DragEventKind, Payload};
pub use registry::{DraggableNode, DropTarget, Registry};
pub use session::DragState;
