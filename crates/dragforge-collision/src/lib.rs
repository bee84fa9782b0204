#![forbid(unsafe_code)]

//! Collision detection for dragforge.
//!
//! # Role in dragforge
//! Given the dragged rectangle, the pointer position and the registered drop
//! targets, decide which targets the drag is over and rank them.
//!
//! # Primary responsibilities
//! - **Algorithms**: pure geometry (overlap ratio, distances, snapping).
//! - **QuadTree**: spatial index that keeps rect intersection sub-linear.
//! - **Strategies**: [`CollisionStrategy`] and seven built-in variants.
//! - **Detector**: strategy composition, throttling and the result cache.
//! - **Insertion**: where a placeholder belongs inside the best target.

pub mod algorithms;
pub mod detector;
pub mod insertion;
pub mod quadtree;
pub mod strategies;
pub mod strategy;

pub use detector::{CollisionDetector, CollisionDetectorOptions, StrategyKind};
pub use insertion::{insertion_index, is_horizontal_layout};
pub use quadtree::{QuadNodeInfo, QuadTree, QuadTreeConfig, QuadTreeStats};
pub use strategies::{
    ClosestCenter, ClosestCorners, Composite, DEFAULT_DISTANCE_CUTOFF, DEFAULT_INDEX_THRESHOLD,
    GridSnap, GridSnapOptions, NestedContainer, NestedContainerOptions, POINTER_PRIORITY,
    PointerWithin, RectIntersection,
};
pub use strategy::{
    CollisionCandidate, CollisionContext, CollisionResult, CollisionStrategy, FnStrategy,
    compare_results, rank,
};
