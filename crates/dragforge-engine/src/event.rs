#![forbid(unsafe_code)]

//! Public drag events.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use dragforge_core::{DraggableId, DropTargetId, Point};
use web_time::Instant;

/// Opaque host payload attached to draggables and drop targets.
pub type Payload = Rc<dyn Any>;

/// Kind of a [`DragEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DragEventKind {
    DragStart,
    DragMove,
    DragEnter,
    DragLeave,
    Drop,
    DragEnd,
    DragCancel,
}

impl DragEventKind {
    /// Every kind, in lifecycle order.
    pub const ALL: [Self; 7] = [
        Self::DragStart,
        Self::DragMove,
        Self::DragEnter,
        Self::DragLeave,
        Self::Drop,
        Self::DragEnd,
        Self::DragCancel,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DragStart => "dragstart",
            Self::DragMove => "dragmove",
            Self::DragEnter => "dragenter",
            Self::DragLeave => "dragleave",
            Self::Drop => "drop",
            Self::DragEnd => "dragend",
            Self::DragCancel => "dragcancel",
        }
    }

    /// `DragEnd` or `DragCancel`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::DragEnd | Self::DragCancel)
    }
}

impl fmt::Display for DragEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One event of the drag stream.
#[derive(Clone)]
pub struct DragEvent {
    pub kind: DragEventKind,
    /// Dragged node.
    pub node: DraggableId,
    pub node_data: Option<Payload>,
    /// Constrained position.
    pub position: Point,
    /// `position` minus the start position.
    pub delta: Point,
    /// Drop target involved, if any.
    pub target: Option<DropTargetId>,
    pub target_data: Option<Payload>,
    pub timestamp: Instant,
    /// Name of the sensor driving the drag. `None` for programmatic drags.
    pub sensor: Option<Rc<str>>,
}

impl DragEvent {
    /// Downcast the node payload.
    #[must_use]
    pub fn node_data<T: 'static>(&self) -> Option<&T> {
        self.node_data.as_deref()?.downcast_ref()
    }

    /// Downcast the target payload.
    #[must_use]
    pub fn target_data<T: 'static>(&self) -> Option<&T> {
        self.target_data.as_deref()?.downcast_ref()
    }
}

impl fmt::Debug for DragEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DragEvent")
            .field("kind", &self.kind)
            .field("node", &self.node)
            .field("position", &self.position)
            .field("delta", &self.delta)
            .field("target", &self.target)
            .field("sensor", &self.sensor)
            .finish_non_exhaustive()
    }
}
