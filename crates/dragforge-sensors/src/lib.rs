#![forbid(unsafe_code)]

//! Input sensors for dragforge.
//!
//! # Role in dragforge
//! Sensors turn raw host input into a normalized gesture: `Start`, `Move`,
//! then `End` or `Cancel`. The [`SensorManager`] owns several sensors and
//! decides which one is allowed to drive the current drag.
//!
//! # Primary responsibilities
//! - **Constraints**: [`ActivationConstraint`] decides when a press becomes
//!   a drag (distance, delay, jitter tolerance).
//! - **Sensors**: [`PointerSensor`], [`TouchSensor`] and [`KeyboardSensor`]
//!   implement the [`Sensor`] capability.
//! - **Listeners**: each sensor exposes its armed channels so hosts and tests
//!   can verify nothing stays armed after a gesture.
//! - **Arbitration**: [`SensorManager`] forwards events from one
//!   authoritative sensor at a time and logs conflicts.

pub mod constraint;
pub mod gesture;
pub mod keyboard;
pub mod listeners;
pub mod manager;
pub mod pointer;
pub mod sensor;
pub mod touch;

pub use constraint::{ActivationConstraint, ConstraintError};
pub use gesture::{GesturePhase, GestureStep, GestureTracker};
pub use keyboard::{KEYBOARD_SENSOR_PRIORITY, KeyboardSensor, KeyboardSensorOptions};
pub use listeners::{ListenerSet, Listeners};
pub use manager::{SensorManager, SensorManagerOptions, SensorRegistration};
pub use pointer::{POINTER_SENSOR_PRIORITY, PointerSensor, PointerSensorOptions};
pub use sensor::{Sensor, SensorCore, SensorEvent, SensorEventHandler, SensorEventKind, SensorTag};
pub use touch::{TOUCH_SENSOR_PRIORITY, TouchSensor, TouchSensorOptions};
