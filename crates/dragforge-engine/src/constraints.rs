#![forbid(unsafe_code)]

//! Position constraints applied to every move of a draggable.
//!
//! Constraints run in registration order, each receiving the output of the
//! previous one. The delta reported with a move is computed from the final
//! constrained position.

use std::fmt;

use dragforge_collision::algorithms::{clamp_position, snap_to_grid};
use dragforge_core::{Point, Rect};

use crate::registry::DraggableNode;

/// What a constraint can see besides the position.
#[derive(Clone, Copy)]
pub struct ConstraintContext<'a> {
    /// The node being dragged.
    pub node: &'a DraggableNode,
    /// Position at drag start.
    pub initial: Point,
}

impl fmt::Debug for ConstraintContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstraintContext")
            .field("node", &self.node.id)
            .field("initial", &self.initial)
            .finish()
    }
}

/// Maps a raw drag position to an allowed one.
pub trait DragConstraint {
    fn apply(&self, position: Point, context: &ConstraintContext<'_>) -> Point;
}

impl<F> DragConstraint for F
where
    F: Fn(Point, &ConstraintContext<'_>) -> Point,
{
    fn apply(&self, position: Point, context: &ConstraintContext<'_>) -> Point {
        self(position, context)
    }
}

/// Axis a drag is locked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// Keeps movement on one axis through the start position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisLock {
    pub axis: Axis,
}

impl AxisLock {
    #[must_use]
    pub const fn horizontal() -> Self {
        Self {
            axis: Axis::Horizontal,
        }
    }

    #[must_use]
    pub const fn vertical() -> Self {
        Self {
            axis: Axis::Vertical,
        }
    }
}

impl DragConstraint for AxisLock {
    fn apply(&self, position: Point, context: &ConstraintContext<'_>) -> Point {
        match self.axis {
            Axis::Horizontal => Point::new(position.x, context.initial.y),
            Axis::Vertical => Point::new(context.initial.x, position.y),
        }
    }
}

/// Clamps the position into a rectangle, edges included.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClampToBounds {
    pub bounds: Rect,
}

impl ClampToBounds {
    #[must_use]
    pub const fn new(bounds: Rect) -> Self {
        Self { bounds }
    }
}

impl DragConstraint for ClampToBounds {
    fn apply(&self, position: Point, _context: &ConstraintContext<'_>) -> Point {
        clamp_position(position, &self.bounds)
    }
}

/// Snaps the position to grid intersections.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapToGrid {
    pub size: f64,
    pub offset: Point,
}

impl SnapToGrid {
    #[must_use]
    pub const fn new(size: f64) -> Self {
        Self {
            size,
            offset: Point::ZERO,
        }
    }

    #[must_use]
    pub const fn with_offset(mut self, offset: Point) -> Self {
        self.offset = offset;
        self
    }
}

impl DragConstraint for SnapToGrid {
    fn apply(&self, position: Point, _context: &ConstraintContext<'_>) -> Point {
        snap_to_grid(position, self.size, self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dragforge_core::ElementId;

    fn node() -> DraggableNode {
        DraggableNode::new("n", ElementId(1))
    }

    #[test]
    fn axis_lock_keeps_start_coordinate() {
        let node = node();
        let ctx = ConstraintContext {
            node: &node,
            initial: Point::new(10.0, 20.0),
        };
        let p = Point::new(50.0, 80.0);
        assert_eq!(AxisLock::horizontal().apply(p, &ctx), Point::new(50.0, 20.0));
        assert_eq!(AxisLock::vertical().apply(p, &ctx), Point::new(10.0, 80.0));
    }

    #[test]
    fn clamp_and_snap() {
        let node = node();
        let ctx = ConstraintContext {
            node: &node,
            initial: Point::ZERO,
        };
        let clamp = ClampToBounds::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(clamp.apply(Point::new(150.0, -5.0), &ctx), Point::new(100.0, 0.0));
        let snap = SnapToGrid::new(10.0).with_offset(Point::new(5.0, 5.0));
        assert_eq!(snap.apply(Point::new(12.0, 19.0), &ctx), Point::new(15.0, 15.0));
    }

    #[test]
    fn closures_are_constraints() {
        let node = node();
        let ctx = ConstraintContext {
            node: &node,
            initial: Point::ZERO,
        };
        let double = |p: Point, _: &ConstraintContext<'_>| Point::new(p.x * 2.0, p.y);
        assert_eq!(double.apply(Point::new(3.0, 4.0), &ctx), Point::new(6.0, 4.0));
    }
}
