#![forbid(unsafe_code)]

//! dragforge public facade crate.
//!
//! Re-exports the types most hosts need from the internal crates and offers
//! a prelude for day-to-day use.
//!
//! ```rust,ignore
//! use dragforge::prelude::*;
//!
//! let mut tree = ElementTree::default();
//! let root = tree.create(None, Some(Rect::new(0.0, 0.0, 800.0, 600.0)));
//! let card = tree.create(Some(root), Some(Rect::new(10.0, 10.0, 80.0, 40.0)));
//! let lane = tree.create(Some(root), Some(Rect::new(300.0, 0.0, 200.0, 600.0)));
//!
//! let mut engine = DragEngine::new(tree, root)?;
//! engine.register_draggable(DraggableNode::new("card", card));
//! engine.register_drop_target(DropTarget::new("lane", lane));
//! engine.on(DragEventKind::Drop, |e| println!("{} -> {:?}", e.node, e.target));
//!
//! engine.handle_input(&RawInput::pointer_down(card, Point::new(50.0, 30.0)));
//! engine.handle_input(&RawInput::pointer_move(Point::new(350.0, 30.0)));
//! engine.tick();
//! engine.handle_input(&RawInput::pointer_up(Point::new(350.0, 30.0)));
//! ```

// --- Core re-exports -------------------------------------------------------

pub use dragforge_core::{
    DraggableId, DropTargetId, ElementId, ElementTree, KeyCode, KeyEvent, KeyEventKind, Modifiers,
    Point, PointerButton, RawInput, RawInputKind, Rect, TouchPoint, VisualTree,
};

// --- Collision re-exports --------------------------------------------------

pub use dragforge_collision::{
    CollisionCandidate, CollisionContext, CollisionDetector, CollisionDetectorOptions,
    CollisionResult, CollisionStrategy, FnStrategy, QuadTree, QuadTreeConfig, StrategyKind,
    insertion_index, is_horizontal_layout,
};

// --- Sensor re-exports -----------------------------------------------------

pub use dragforge_sensors::{
    ActivationConstraint, KeyboardSensor, PointerSensor, Sensor, SensorEvent, SensorEventKind,
    SensorManager, SensorManagerOptions, TouchSensor,
};

// --- Engine re-exports -----------------------------------------------------

pub use dragforge_engine::{
    AxisLock, ClampToBounds, ConfigError, DragConstraint, DragEngine, DragEngineBuilder, DragEvent,
    DragEventKind, DragState, DraggableNode, DropTarget, EngineConfig, ListenerHandle, SnapToGrid,
};

/// Prelude for hosts.
pub mod prelude {
    pub use crate::{
        AxisLock, ClampToBounds, DragEngine, DragEvent, DragEventKind, DraggableNode, DropTarget,
        ElementId, ElementTree, EngineConfig, KeyCode, Point, RawInput, Rect, SnapToGrid,
        VisualTree,
    };

    pub use crate::{collision, core, engine, sensors};
}

pub use dragforge_collision as collision;
pub use dragforge_core as core;
pub use dragforge_engine as engine;
pub use dragforge_sensors as sensors;
