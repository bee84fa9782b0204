#![forbid(unsafe_code)]

//! Canonical raw input types.
//!
//! Hosts translate their native pointer, touch, keyboard and focus events
//! into [`RawInput`] values and feed them to a sensor manager or an engine.
//!
//! # Design Notes
//!
//! - Positions are absolute, in the same space as element bounds.
//! - `target` is the element the host hit-tested the event to, if any.
//! - `KeyEventKind` defaults to `Press`; sensors ignore releases.
//! - Timestamps use `web_time::Instant` so the crate also runs on wasm.

use bitflags::bitflags;
use web_time::Instant;

use crate::element::ElementId;
use crate::geometry::Point;

/// One raw input event from the host.
#[derive(Debug, Clone, PartialEq)]
pub struct RawInput {
    /// What happened.
    pub kind: RawInputKind,
    /// Element the event was dispatched to.
    pub target: Option<ElementId>,
    /// When it happened.
    pub timestamp: Instant,
}

impl RawInput {
    /// Create an input stamped with the current time and no target.
    #[must_use]
    pub fn new(kind: RawInputKind) -> Self {
        Self {
            kind,
            target: None,
            timestamp: Instant::now(),
        }
    }

    /// Set the dispatch target.
    #[must_use]
    pub fn with_target(mut self, target: ElementId) -> Self {
        self.target = Some(target);
        self
    }

    /// Override the timestamp.
    #[must_use]
    pub fn at(mut self, timestamp: Instant) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Convenience: primary-button press at `position` on `target`.
    #[must_use]
    pub fn pointer_down(target: ElementId, position: Point) -> Self {
        Self::new(RawInputKind::PointerDown {
            position,
            button: PointerButton::Primary,
            pointer_id: 1,
        })
        .with_target(target)
    }

    /// Convenience: pointer move to `position`.
    #[must_use]
    pub fn pointer_move(position: Point) -> Self {
        Self::new(RawInputKind::PointerMove {
            position,
            pointer_id: 1,
        })
    }

    /// Convenience: primary-button release at `position`.
    #[must_use]
    pub fn pointer_up(position: Point) -> Self {
        Self::new(RawInputKind::PointerUp {
            position,
            button: PointerButton::Primary,
            pointer_id: 1,
        })
    }

    /// Convenience: key press without modifiers.
    #[must_use]
    pub fn key(code: KeyCode) -> Self {
        Self::new(RawInputKind::Key(KeyEvent::new(code)))
    }

    /// Position carried by the event, if it has one.
    ///
    /// Touch events report their first touch point.
    #[must_use]
    pub fn position(&self) -> Option<Point> {
        match &self.kind {
            RawInputKind::PointerDown { position, .. }
            | RawInputKind::PointerMove { position, .. }
            | RawInputKind::PointerUp { position, .. } => Some(*position),
            RawInputKind::TouchStart { touches } | RawInputKind::TouchMove { touches } => {
                touches.first().map(|touch| touch.position)
            }
            RawInputKind::TouchEnd { changed, .. } => changed.first().map(|touch| touch.position),
            _ => None,
        }
    }
}

/// Raw input payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum RawInputKind {
    /// A pointer button was pressed.
    PointerDown {
        position: Point,
        button: PointerButton,
        pointer_id: u32,
    },
    /// The pointer moved.
    PointerMove { position: Point, pointer_id: u32 },
    /// A pointer button was released.
    PointerUp {
        position: Point,
        button: PointerButton,
        pointer_id: u32,
    },
    /// The pointer left the tracked surface.
    PointerLeave,
    /// One or more touches began. `touches` lists every active touch.
    TouchStart { touches: Vec<TouchPoint> },
    /// Active touches moved.
    TouchMove { touches: Vec<TouchPoint> },
    /// Touches ended. `active_count` is the number still on the surface.
    TouchEnd {
        changed: Vec<TouchPoint>,
        active_count: usize,
    },
    /// The platform cancelled all touches.
    TouchCancel,
    /// A keyboard event.
    Key(KeyEvent),
    /// The host window or surface lost focus.
    Blur,
}

impl RawInputKind {
    /// Short stable name, used in logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PointerDown { .. } => "pointerdown",
            Self::PointerMove { .. } => "pointermove",
            Self::PointerUp { .. } => "pointerup",
            Self::PointerLeave => "pointerleave",
            Self::TouchStart { .. } => "touchstart",
            Self::TouchMove { .. } => "touchmove",
            Self::TouchEnd { .. } => "touchend",
            Self::TouchCancel => "touchcancel",
            Self::Key(_) => "key",
            Self::Blur => "blur",
        }
    }
}

/// Pointer buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PointerButton {
    /// Left mouse button, pen contact or primary touch.
    #[default]
    Primary,
    /// Middle mouse button.
    Auxiliary,
    /// Right mouse button.
    Secondary,
    /// Any other button, by host index.
    Other(u8),
}

/// A single touch contact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    /// Platform touch identifier, stable for the life of the contact.
    pub id: u64,
    /// Absolute position.
    pub position: Point,
}

impl TouchPoint {
    /// Create a touch point.
    #[must_use]
    pub const fn new(id: u64, position: Point) -> Self {
        Self { id, position }
    }
}

/// A keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// The key code.
    pub code: KeyCode,
    /// Modifier keys held during the event.
    pub modifiers: Modifiers,
    /// Press, repeat or release.
    pub kind: KeyEventKind,
}

impl KeyEvent {
    /// Create a key press with no modifiers.
    #[must_use]
    pub const fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::NONE,
            kind: KeyEventKind::Press,
        }
    }

    /// Set modifiers.
    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Set the event kind.
    #[must_use]
    pub const fn with_kind(mut self, kind: KeyEventKind) -> Self {
        self.kind = kind;
        self
    }

    /// Check if Shift is held.
    #[must_use]
    pub const fn shift(&self) -> bool {
        self.modifiers.contains(Modifiers::SHIFT)
    }
}

/// Keys the built-in sensors care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Enter,
    Space,
    Escape,
    Tab,
    Up,
    Down,
    Left,
    Right,
    /// A printable character.
    Char(char),
    /// Anything else.
    Other,
}

/// The type of key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyEventKind {
    #[default]
    Press,
    Repeat,
    Release,
}

bitflags! {
    /// Modifier keys held during an event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        /// No modifiers.
        const NONE  = 0b0000;
        /// Shift key.
        const SHIFT = 0b0001;
        /// Alt/Option key.
        const ALT   = 0b0010;
        /// Control key.
        const CTRL  = 0b0100;
        /// Meta/Command key.
        const META  = 0b1000;
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::NONE
    }
}
