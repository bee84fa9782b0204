#![forbid(unsafe_code)]

//! Press/move/release tracking shared by the built-in sensors.
//!
//! # State Machine
//!
//! ```text
//! Idle --press--> Pending --constraint met--> Active
//!   ^               |                           |
//!   +---release/reset (silent)    release/cancel/reset
//! ```
//!
//! # Invariants
//!
//! 1. Activation reports the press position, not the position of the move
//!    that satisfied the constraint.
//! 2. Moves inside the tolerance radius never activate.
//! 3. Every terminal call (`release`, `reset`) returns the phase that was
//!    left and leaves the tracker `Idle`.

use dragforge_core::{ElementId, Point};
use web_time::Instant;

use crate::constraint::ActivationConstraint;

/// Where a gesture is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GesturePhase {
    #[default]
    Idle,
    /// Pressed, waiting for the activation constraint.
    Pending,
    /// Dragging.
    Active,
}

/// Outcome of feeding a move to the tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureStep {
    /// No gesture in progress.
    Ignored,
    /// Still pending.
    Pending,
    /// Just became active. Carries the press position.
    Activated { start: Point },
    /// Active and moved.
    Moved,
}

/// Tracks one press from pending to active.
#[derive(Debug, Clone)]
pub struct GestureTracker {
    constraint: ActivationConstraint,
    phase: GesturePhase,
    start: Point,
    last: Point,
    started_at: Option<Instant>,
    target: Option<ElementId>,
}

impl GestureTracker {
    #[must_use]
    pub fn new(constraint: ActivationConstraint) -> Self {
        Self {
            constraint,
            phase: GesturePhase::Idle,
            start: Point::ZERO,
            last: Point::ZERO,
            started_at: None,
            target: None,
        }
    }

    #[must_use]
    pub const fn phase(&self) -> GesturePhase {
        self.phase
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.phase == GesturePhase::Active
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.phase == GesturePhase::Idle
    }

    /// Press position.
    #[must_use]
    pub const fn start(&self) -> Point {
        self.start
    }

    /// Last position seen.
    #[must_use]
    pub const fn last(&self) -> Point {
        self.last
    }

    /// Element the press landed on.
    #[must_use]
    pub const fn target(&self) -> Option<ElementId> {
        self.target
    }

    #[must_use]
    pub const fn constraint(&self) -> &ActivationConstraint {
        &self.constraint
    }

    /// Record a press and enter `Pending`.
    pub fn press(&mut self, position: Point, target: Option<ElementId>, now: Instant) {
        self.phase = GesturePhase::Pending;
        self.start = position;
        self.last = position;
        self.started_at = Some(now);
        self.target = target;
    }

    /// Enter `Active` directly, bypassing the constraint.
    pub fn activate(&mut self, position: Point, target: Option<ElementId>, now: Instant) {
        self.press(position, target, now);
        self.phase = GesturePhase::Active;
    }

    /// Feed a move.
    pub fn update(&mut self, position: Point, now: Instant) -> GestureStep {
        match self.phase {
            GesturePhase::Idle => GestureStep::Ignored,
            GesturePhase::Pending => {
                if self.constraint.within_tolerance(self.start, position) {
                    return GestureStep::Pending;
                }
                let elapsed = self
                    .started_at
                    .and_then(|at| now.checked_duration_since(at))
                    .unwrap_or_default();
                if !self.constraint.is_satisfied(self.start, position, elapsed) {
                    return GestureStep::Pending;
                }
                self.phase = GesturePhase::Active;
                self.last = position;
                GestureStep::Activated { start: self.start }
            }
            GesturePhase::Active => {
                self.last = position;
                GestureStep::Moved
            }
        }
    }

    /// Move an active gesture by `delta` without constraint checks.
    pub fn nudge(&mut self, delta: Point) -> Option<Point> {
        if self.phase != GesturePhase::Active {
            return None;
        }
        self.last += delta;
        Some(self.last)
    }

    /// End the gesture normally. Returns the phase that was left.
    pub fn release(&mut self) -> GesturePhase {
        self.reset()
    }

    /// Abandon the gesture. Returns the phase that was left.
    pub fn reset(&mut self) -> GesturePhase {
        let previous = self.phase;
        self.phase = GesturePhase::Idle;
        self.started_at = None;
        self.target = None;
        previous
    }
}
