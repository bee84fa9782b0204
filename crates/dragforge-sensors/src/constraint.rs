#![forbid(unsafe_code)]

//! Activation constraints: when a pending press becomes a drag.
//!
//! A press becomes active on the first move that both leaves the tolerance
//! radius and satisfies every configured threshold. Unset thresholds are
//! ignored, and so are thresholds equal to zero.

use std::fmt;
use std::time::Duration;

use dragforge_core::Point;

/// Thresholds a pending gesture must meet before it activates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ActivationConstraint {
    /// Minimum travel from the press position.
    pub distance: Option<f64>,
    /// Minimum time since the press.
    pub delay: Option<Duration>,
    /// Radius inside which movement is treated as jitter.
    pub tolerance: Option<f64>,
}

impl ActivationConstraint {
    /// No thresholds: the first move activates.
    pub const NONE: Self = Self {
        distance: None,
        delay: None,
        tolerance: None,
    };

    /// Activate after travelling `distance`.
    #[must_use]
    pub const fn distance(distance: f64) -> Self {
        Self {
            distance: Some(distance),
            delay: None,
            tolerance: None,
        }
    }

    /// Activate after holding for `delay`.
    #[must_use]
    pub const fn delay(delay: Duration) -> Self {
        Self {
            distance: None,
            delay: Some(delay),
            tolerance: None,
        }
    }

    /// Set the jitter radius.
    #[must_use]
    pub const fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    /// Set the minimum delay.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Check that distances are finite and non-negative.
    pub fn validate(&self) -> Result<(), ConstraintError> {
        for (field, value) in [("distance", self.distance), ("tolerance", self.tolerance)] {
            let Some(value) = value else { continue };
            if !value.is_finite() {
                return Err(ConstraintError::NonFinite { field });
            }
            if value < 0.0 {
                return Err(ConstraintError::Negative { field, value });
            }
        }
        Ok(())
    }

    /// Whether `current` is still inside the jitter radius around `start`.
    ///
    /// Without a positive tolerance nothing counts as jitter.
    #[must_use]
    pub fn within_tolerance(&self, start: Point, current: Point) -> bool {
        match self.tolerance {
            Some(tolerance) if tolerance > 0.0 => start.distance(current) <= tolerance,
            _ => false,
        }
    }

    /// Whether the thresholds are met after moving from `start` to `current`
    /// over `elapsed`.
    #[must_use]
    pub fn is_satisfied(&self, start: Point, current: Point, elapsed: Duration) -> bool {
        if let Some(delay) = self.delay
            && !delay.is_zero()
            && elapsed < delay
        {
            return false;
        }
        if let Some(distance) = self.distance
            && distance > 0.0
            && start.distance(current) < distance
        {
            return false;
        }
        true
    }
}

/// An activation constraint that cannot be applied.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintError {
    /// A distance field is NaN or infinite.
    NonFinite { field: &'static str },
    /// A distance field is negative.
    Negative { field: &'static str, value: f64 },
}

impl fmt::Display for ConstraintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonFinite { field } => {
                write!(f, "activation constraint {field} must be finite")
            }
            Self::Negative { field, value } => {
                write!(f, "activation constraint {field} must be non-negative, got {value}")
            }
        }
    }
}

impl std::error::Error for ConstraintError {}
