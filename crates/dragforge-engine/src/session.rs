#![forbid(unsafe_code)]

//! The in-progress drag and its public snapshot.

use std::rc::Rc;

use dragforge_core::{DraggableId, DropTargetId, ElementId, Point, Rect};
use web_time::Instant;

/// State of one drag, owned by the engine while it runs.
///
/// The engine holds `Option<DragSession>`; "dragging" and "has an active
/// node" are the same fact.
#[derive(Debug, Clone)]
pub(crate) struct DragSession {
    pub node: DraggableId,
    pub element: ElementId,
    pub initial: Point,
    pub position: Point,
    pub delta: Point,
    pub target: Option<DropTargetId>,
    pub started_at: Instant,
    pub sensor: Option<Rc<str>>,
    /// Element bounds at start, or the fallback box around the start point.
    pub origin_rect: Rect,
    /// `origin_rect` translated by `delta`.
    pub drag_rect: Rect,
}

impl DragSession {
    pub fn new(
        node: DraggableId,
        element: ElementId,
        position: Point,
        started_at: Instant,
        sensor: Option<Rc<str>>,
        origin_rect: Rect,
    ) -> Self {
        Self {
            node,
            element,
            initial: position,
            position,
            delta: Point::ZERO,
            target: None,
            started_at,
            sensor,
            origin_rect,
            drag_rect: origin_rect,
        }
    }

    /// Move to an already constrained position.
    pub fn move_to(&mut self, position: Point) {
        self.position = position;
        self.delta = position - self.initial;
        self.drag_rect = self.origin_rect.translate(self.delta);
    }

    pub fn snapshot(&self) -> DragState {
        DragState {
            is_dragging: true,
            node: Some(self.node.clone()),
            element: Some(self.element),
            position: self.position,
            initial_position: self.initial,
            delta: self.delta,
            target: self.target.clone(),
            start_time: Some(self.started_at),
        }
    }
}

/// Read-only view of the engine's drag state.
#[derive(Debug, Clone, PartialEq)]
pub struct DragState {
    pub is_dragging: bool,
    pub node: Option<DraggableId>,
    /// Host element of the dragged node, for previews.
    pub element: Option<ElementId>,
    pub position: Point,
    pub initial_position: Point,
    pub delta: Point,
    pub target: Option<DropTargetId>,
    pub start_time: Option<Instant>,
}

impl Default for DragState {
    fn default() -> Self {
        Self {
            is_dragging: false,
            node: None,
            element: None,
            position: Point::ZERO,
            initial_position: Point::ZERO,
            delta: Point::ZERO,
            target: None,
            start_time: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_tracks_delta_and_rect() {
        let origin = Rect::new(10.0, 10.0, 20.0, 20.0);
        let mut session = DragSession::new(
            DraggableId::from("n"),
            ElementId(1),
            Point::new(15.0, 15.0),
            Instant::now(),
            None,
            origin,
        );
        session.move_to(Point::new(25.0, 5.0));
        assert_eq!(session.delta, Point::new(10.0, -10.0));
        assert_eq!(session.drag_rect, Rect::new(20.0, 0.0, 20.0, 20.0));

        let state = session.snapshot();
        assert!(state.is_dragging);
        assert_eq!(state.element, Some(ElementId(1)));
        assert_eq!(state.initial_position, Point::new(15.0, 15.0));
    }

    #[test]
    fn idle_snapshot() {
        let state = DragState::default();
        assert!(!state.is_dragging);
        assert!(state.node.is_none() && state.element.is_none() && state.start_time.is_none());
    }
}
