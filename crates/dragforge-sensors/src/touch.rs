#![forbid(unsafe_code)]

//! Single-finger touch input.
//!
//! A lone touch inside the root enters `Pending`. The default constraint is a
//! 200 ms hold with a 5 unit jitter radius, checked on each move against the
//! input timestamps. Moving early keeps the gesture pending rather than
//! aborting it.
//!
//! A second finger landing while a gesture is pending aborts it silently; if
//! the gesture is active it is cancelled. Only the touch that started the
//! gesture is tracked.

use std::time::Duration;

use dragforge_core::{ElementId, RawInput, RawInputKind, TouchPoint, VisualTree};

use crate::constraint::{ActivationConstraint, ConstraintError};
use crate::gesture::{GesturePhase, GestureStep, GestureTracker};
use crate::listeners::{ListenerSet, Listeners};
use crate::sensor::{Sensor, SensorCore, SensorEventHandler, SensorEventKind};

/// Arbitration priority of [`TouchSensor`].
pub const TOUCH_SENSOR_PRIORITY: u32 = 90;

/// Configuration for [`TouchSensor`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchSensorOptions {
    pub constraint: ActivationConstraint,
}

impl Default for TouchSensorOptions {
    fn default() -> Self {
        Self {
            constraint: ActivationConstraint::delay(Duration::from_millis(200)).with_tolerance(5.0),
        }
    }
}

/// Touch sensor.
#[derive(Debug)]
pub struct TouchSensor {
    core: SensorCore,
    gesture: GestureTracker,
    touch_id: Option<u64>,
}

impl Default for TouchSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl TouchSensor {
    pub const NAME: &'static str = "touch";

    #[must_use]
    pub fn new() -> Self {
        Self::build(TouchSensorOptions::default())
    }

    pub fn with_options(options: TouchSensorOptions) -> Result<Self, ConstraintError> {
        options.constraint.validate()?;
        Ok(Self::build(options))
    }

    fn build(options: TouchSensorOptions) -> Self {
        Self {
            core: SensorCore::new(
                Self::NAME,
                TOUCH_SENSOR_PRIORITY,
                ListenerSet::new(
                    Listeners::TOUCH_START,
                    Listeners::TOUCH_MOVE
                        | Listeners::TOUCH_END
                        | Listeners::TOUCH_CANCEL
                        | Listeners::BLUR,
                ),
            ),
            gesture: GestureTracker::new(options.constraint),
            touch_id: None,
        }
    }

    #[must_use]
    pub const fn phase(&self) -> GesturePhase {
        self.gesture.phase()
    }

    /// Identifier of the tracked touch.
    #[must_use]
    pub const fn touch_id(&self) -> Option<u64> {
        self.touch_id
    }

    fn tracked<'a>(&self, touches: &'a [TouchPoint]) -> Option<&'a TouchPoint> {
        let id = self.touch_id?;
        touches.iter().find(|touch| touch.id == id)
    }

    fn on_start(&mut self, input: &RawInput, touches: &[TouchPoint], tree: &dyn VisualTree) {
        if !self.gesture.is_idle() {
            if touches.iter().any(|touch| Some(touch.id) != self.touch_id) {
                tracing::debug!(
                    target: "dragforge.sensors",
                    sensor = Self::NAME,
                    touches = touches.len(),
                    "second touch aborts gesture"
                );
                self.abort(Some(input));
            }
            return;
        }
        let [touch] = touches else {
            return;
        };
        if !self.core.in_root(input.target, tree) {
            return;
        }
        self.gesture.press(touch.position, input.target, input.timestamp);
        self.touch_id = Some(touch.id);
        self.core.begin_session();
    }

    fn on_move(&mut self, input: &RawInput, touches: &[TouchPoint]) {
        let Some(position) = self.tracked(touches).map(|touch| touch.position) else {
            return;
        };
        let target = self.gesture.target();
        match self.gesture.update(position, input.timestamp) {
            GestureStep::Activated { start } => {
                self.core
                    .emit(SensorEventKind::Start, start, target, input.timestamp, Some(input));
                self.core
                    .emit(SensorEventKind::Move, position, target, input.timestamp, Some(input));
            }
            GestureStep::Moved => {
                self.core
                    .emit(SensorEventKind::Move, position, target, input.timestamp, Some(input));
            }
            GestureStep::Pending | GestureStep::Ignored => {}
        }
    }

    fn on_end(&mut self, input: &RawInput, changed: &[TouchPoint]) {
        let Some(position) = self.tracked(changed).map(|touch| touch.position) else {
            return;
        };
        let target = self.gesture.target();
        if self.finish() == GesturePhase::Active {
            self.core
                .emit(SensorEventKind::End, position, target, input.timestamp, Some(input));
        }
    }

    fn abort(&mut self, input: Option<&RawInput>) {
        let target = self.gesture.target();
        let last = self.gesture.last();
        if self.finish() == GesturePhase::Active {
            let timestamp = input.map_or_else(web_time::Instant::now, |raw| raw.timestamp);
            self.core
                .emit(SensorEventKind::Cancel, last, target, timestamp, input);
        }
    }

    fn finish(&mut self) -> GesturePhase {
        self.touch_id = None;
        self.core.end_session();
        self.gesture.reset()
    }
}

impl Sensor for TouchSensor {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn priority(&self) -> u32 {
        self.core.priority()
    }

    fn attach(&mut self, root: ElementId, handler: SensorEventHandler) {
        if self.core.is_attached() {
            self.detach();
        }
        self.core.attach(root, handler);
    }

    fn detach(&mut self) {
        self.abort(None);
        self.core.detach();
    }

    fn enable(&mut self) {
        self.core.set_enabled(true);
    }

    fn disable(&mut self) {
        self.abort(None);
        self.core.set_enabled(false);
    }

    fn is_enabled(&self) -> bool {
        self.core.is_enabled()
    }

    fn is_active(&self) -> bool {
        self.gesture.is_active()
    }

    fn is_attached(&self) -> bool {
        self.core.is_attached()
    }

    fn can_handle(&self, input: &RawInput) -> bool {
        self.core.is_enabled()
            && self
                .core
                .declared()
                .intersects(Listeners::channel(&input.kind))
    }

    fn handle_input(&mut self, input: &RawInput, tree: &dyn VisualTree) {
        if !self.core.accepts(input) {
            return;
        }
        match &input.kind {
            RawInputKind::TouchStart { touches } => self.on_start(input, touches, tree),
            RawInputKind::TouchMove { touches } => self.on_move(input, touches),
            RawInputKind::TouchEnd { changed, .. } => self.on_end(input, changed),
            RawInputKind::TouchCancel | RawInputKind::Blur => self.abort(Some(input)),
            _ => {}
        }
    }

    fn armed_listeners(&self) -> Listeners {
        self.core.armed()
    }
}
