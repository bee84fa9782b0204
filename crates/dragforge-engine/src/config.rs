#![forbid(unsafe_code)]

//! Engine configuration as plain data.
//!
//! [`EngineConfig`] gathers every tunable of the sensors, the sensor
//! manager and the collision detector. Durations are stored as integer
//! milliseconds so the same struct can be loaded from TOML or JSON with the
//! `config-file` feature.
//!
//! # Loading
//!
//! ```toml
//! [pointer]
//! distance = 8.0
//!
//! [collision]
//! strategy = "closest_center"
//! throttle_ms = 0
//! ```
//!
//! ```rust,ignore
//! let config = EngineConfig::from_toml_file("dragforge.toml")?;
//! ```
//!
//! # Defaults
//!
//! `EngineConfig::default()` matches the component defaults: pointer
//! activation after 5 units with a 2 unit jitter radius, touch after
//! 200 ms, 16 ms detection throttle, 200 unit distance cutoff.

#[cfg(feature = "config-file")]
use std::path::Path;
use std::time::Duration;

#[cfg(feature = "config-file")]
use serde::{Deserialize, Serialize};

use dragforge_collision::{
    CollisionDetectorOptions, GridSnapOptions, NestedContainerOptions, QuadTreeConfig,
    StrategyKind,
};
use dragforge_sensors::{
    ActivationConstraint, KeyboardSensorOptions, PointerSensorOptions, SensorManagerOptions,
    TouchSensorOptions,
};

// ---------------------------------------------------------------------------
// Top-level EngineConfig
// ---------------------------------------------------------------------------

/// Every tunable of a drag engine.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config-file", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-file", serde(default))]
pub struct EngineConfig {
    pub pointer: PointerConfig,
    pub touch: TouchConfig,
    pub keyboard: KeyboardConfig,
    pub manager: ManagerConfig,
    pub collision: CollisionConfig,
    /// Size of the drag box used when the dragged element has no bounds.
    pub fallback_drag_width: f64,
    pub fallback_drag_height: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pointer: PointerConfig::default(),
            touch: TouchConfig::default(),
            keyboard: KeyboardConfig::default(),
            manager: ManagerConfig::default(),
            collision: CollisionConfig::default(),
            fallback_drag_width: 100.0,
            fallback_drag_height: 100.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Pointer sensor.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config-file", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-file", serde(default))]
pub struct PointerConfig {
    pub enabled: bool,
    pub distance: f64,
    pub tolerance: f64,
}

impl Default for PointerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            distance: 5.0,
            tolerance: 2.0,
        }
    }
}

/// Touch sensor.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config-file", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-file", serde(default))]
pub struct TouchConfig {
    pub enabled: bool,
    pub delay_ms: u64,
    pub tolerance: f64,
}

impl Default for TouchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            delay_ms: 200,
            tolerance: 5.0,
        }
    }
}

/// Keyboard sensor.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config-file", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-file", serde(default))]
pub struct KeyboardConfig {
    pub enabled: bool,
    pub step: f64,
    pub fast_multiplier: f64,
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            step: 10.0,
            fast_multiplier: 5.0,
        }
    }
}

/// Sensor manager.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config-file", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-file", serde(default))]
pub struct ManagerConfig {
    pub auto_activate: bool,
    pub exclusive_mode: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            auto_activate: true,
            exclusive_mode: true,
        }
    }
}

/// Built-in base strategy, by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config-file", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-file", serde(rename_all = "snake_case"))]
pub enum CollisionStrategyName {
    #[default]
    RectIntersection,
    ClosestCenter,
    ClosestCorners,
    PointerWithin,
}

impl From<CollisionStrategyName> for StrategyKind {
    fn from(name: CollisionStrategyName) -> Self {
        match name {
            CollisionStrategyName::RectIntersection => Self::RectIntersection,
            CollisionStrategyName::ClosestCenter => Self::ClosestCenter,
            CollisionStrategyName::ClosestCorners => Self::ClosestCorners,
            CollisionStrategyName::PointerWithin => Self::PointerWithin,
        }
    }
}

/// Collision detector.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config-file", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-file", serde(default))]
pub struct CollisionConfig {
    pub strategy: CollisionStrategyName,
    pub throttle_ms: u64,
    pub index_threshold: usize,
    pub quadtree_max_objects: usize,
    pub quadtree_max_depth: usize,
    pub distance_cutoff: f64,
    /// Layer grid snapping over the base strategy when set.
    pub grid_size: Option<f64>,
    /// Layer nested-container resolution over the base strategy.
    pub nested_containers: bool,
    /// `None` or `0` leaves nesting depth unbounded.
    pub nested_max_depth: Option<usize>,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        let detector = CollisionDetectorOptions::default();
        Self {
            strategy: CollisionStrategyName::default(),
            throttle_ms: detector.throttle.as_millis() as u64,
            index_threshold: detector.index_threshold,
            quadtree_max_objects: detector.quadtree.max_objects,
            quadtree_max_depth: detector.quadtree.max_depth,
            distance_cutoff: detector.distance_cutoff,
            grid_size: None,
            nested_containers: false,
            nested_max_depth: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading, validation, conversion
// ---------------------------------------------------------------------------

impl EngineConfig {
    /// Load from a TOML string.
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config-file")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config-file")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Json)
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "config-file")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// Check every value. An empty list means the config is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut non_negative = |name: &str, value: f64| {
            if !value.is_finite() || value < 0.0 {
                errors.push(format!("{name} must be finite and >= 0, got {value}"));
            }
        };

        non_negative("pointer.distance", self.pointer.distance);
        non_negative("pointer.tolerance", self.pointer.tolerance);
        non_negative("touch.tolerance", self.touch.tolerance);
        non_negative("collision.distance_cutoff", self.collision.distance_cutoff);

        if !self.keyboard.step.is_finite() || self.keyboard.step <= 0.0 {
            errors.push(format!("keyboard.step must be > 0, got {}", self.keyboard.step));
        }
        if !self.keyboard.fast_multiplier.is_finite() || self.keyboard.fast_multiplier < 1.0 {
            errors.push(format!(
                "keyboard.fast_multiplier must be >= 1, got {}",
                self.keyboard.fast_multiplier
            ));
        }
        if self.collision.quadtree_max_objects == 0 {
            errors.push("collision.quadtree_max_objects must be > 0".into());
        }
        if let Some(size) = self.collision.grid_size
            && (!size.is_finite() || size <= 0.0)
        {
            errors.push(format!("collision.grid_size must be > 0, got {size}"));
        }
        for (name, value) in [
            ("fallback_drag_width", self.fallback_drag_width),
            ("fallback_drag_height", self.fallback_drag_height),
        ] {
            if !value.is_finite() || value <= 0.0 {
                errors.push(format!("{name} must be > 0, got {value}"));
            }
        }
        errors
    }

    #[must_use]
    pub fn pointer_options(&self) -> PointerSensorOptions {
        PointerSensorOptions {
            constraint: ActivationConstraint::distance(self.pointer.distance)
                .with_tolerance(self.pointer.tolerance),
            ..PointerSensorOptions::default()
        }
    }

    #[must_use]
    pub fn touch_options(&self) -> TouchSensorOptions {
        TouchSensorOptions {
            constraint: ActivationConstraint::delay(Duration::from_millis(self.touch.delay_ms))
                .with_tolerance(self.touch.tolerance),
        }
    }

    #[must_use]
    pub fn keyboard_options(&self) -> KeyboardSensorOptions {
        KeyboardSensorOptions {
            step: self.keyboard.step,
            fast_multiplier: self.keyboard.fast_multiplier,
        }
    }

    #[must_use]
    pub fn manager_options(&self) -> SensorManagerOptions {
        SensorManagerOptions {
            auto_activate: self.manager.auto_activate,
            exclusive_mode: self.manager.exclusive_mode,
        }
    }

    #[must_use]
    pub fn detector_options(&self) -> CollisionDetectorOptions {
        let collision = &self.collision;
        CollisionDetectorOptions {
            strategy: collision.strategy.into(),
            grid_snap: collision.grid_size.map(GridSnapOptions::grid),
            nested_containers: collision
                .nested_containers
                .then(|| NestedContainerOptions::enabled(collision.nested_max_depth)),
            throttle: Duration::from_millis(collision.throttle_ms),
            index_threshold: collision.index_threshold,
            quadtree: QuadTreeConfig {
                max_objects: collision.quadtree_max_objects,
                max_depth: collision.quadtree_max_depth,
            },
            distance_cutoff: collision.distance_cutoff,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from loading or validating an [`EngineConfig`].
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "config-file")]
    Toml(toml::de::Error),
    /// JSON parse error.
    #[cfg(feature = "config-file")]
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "config-file")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "config-file")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "validation errors: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "config-file")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "config-file")]
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}
