#![forbid(unsafe_code)]

//! Mouse and pen input.
//!
//! A press of the configured button inside the root arms the session
//! listeners and enters `Pending`. The first move that satisfies the
//! activation constraint emits `Start` at the press position followed by
//! `Move` at the current position. Release emits `End` only when active.
//! Leaving the surface, losing focus or pressing Escape cancels.
//!
//! Only the pointer that pressed is tracked; moves and releases from other
//! pointer ids are ignored.

use dragforge_core::{KeyCode, KeyEventKind, Point, PointerButton, RawInput, RawInputKind, VisualTree};

use crate::constraint::{ActivationConstraint, ConstraintError};
use crate::gesture::{GesturePhase, GestureStep, GestureTracker};
use crate::listeners::{ListenerSet, Listeners};
use crate::sensor::{Sensor, SensorCore, SensorEventHandler, SensorEventKind};

/// Arbitration priority of [`PointerSensor`].
pub const POINTER_SENSOR_PRIORITY: u32 = 100;

/// Configuration for [`PointerSensor`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSensorOptions {
    /// Button that starts a gesture.
    pub button: PointerButton,
    pub constraint: ActivationConstraint,
}

impl Default for PointerSensorOptions {
    fn default() -> Self {
        Self {
            button: PointerButton::Primary,
            constraint: ActivationConstraint::distance(5.0).with_tolerance(2.0),
        }
    }
}

/// Pointer sensor.
#[derive(Debug)]
pub struct PointerSensor {
    core: SensorCore,
    options: PointerSensorOptions,
    gesture: GestureTracker,
    pointer_id: Option<u32>,
}

impl Default for PointerSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl PointerSensor {
    pub const NAME: &'static str = "pointer";

    /// Pointer sensor with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::build(PointerSensorOptions::default())
    }

    /// Pointer sensor with custom options.
    pub fn with_options(options: PointerSensorOptions) -> Result<Self, ConstraintError> {
        options.constraint.validate()?;
        Ok(Self::build(options))
    }

    fn build(options: PointerSensorOptions) -> Self {
        Self {
            core: SensorCore::new(
                Self::NAME,
                POINTER_SENSOR_PRIORITY,
                ListenerSet::new(
                    Listeners::POINTER_DOWN,
                    Listeners::POINTER_MOVE
                        | Listeners::POINTER_UP
                        | Listeners::POINTER_LEAVE
                        | Listeners::BLUR
                        | Listeners::KEY,
                ),
            ),
            gesture: GestureTracker::new(options.constraint),
            options,
            pointer_id: None,
        }
    }

    #[must_use]
    pub const fn options(&self) -> &PointerSensorOptions {
        &self.options
    }

    #[must_use]
    pub const fn phase(&self) -> GesturePhase {
        self.gesture.phase()
    }

    fn tracks(&self, pointer_id: u32) -> bool {
        self.pointer_id == Some(pointer_id)
    }

    fn on_down(
        &mut self,
        input: &RawInput,
        position: Point,
        button: PointerButton,
        pointer_id: u32,
        tree: &dyn VisualTree,
    ) {
        if !self.gesture.is_idle()
            || button != self.options.button
            || !self.core.in_root(input.target, tree)
        {
            return;
        }
        self.gesture.press(position, input.target, input.timestamp);
        self.pointer_id = Some(pointer_id);
        self.core.begin_session();
    }

    fn on_move(&mut self, input: &RawInput, position: Point) {
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

    fn on_up(&mut self, input: &RawInput, position: Point) {
        let target = self.gesture.target();
        let previous = self.finish();
        if previous == GesturePhase::Active {
            self.core
                .emit(SensorEventKind::End, position, target, input.timestamp, Some(input));
        }
    }

    /// Abort the gesture. Pending gestures end silently.
    fn abort(&mut self, input: Option<&RawInput>) {
        let target = self.gesture.target();
        let last = self.gesture.last();
        let previous = self.finish();
        if previous == GesturePhase::Active {
            let timestamp = input.map_or_else(web_time::Instant::now, |raw| raw.timestamp);
            self.core
                .emit(SensorEventKind::Cancel, last, target, timestamp, input);
        }
    }

    fn finish(&mut self) -> GesturePhase {
        self.pointer_id = None;
        self.core.end_session();
        self.gesture.reset()
    }
}

impl Sensor for PointerSensor {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn priority(&self) -> u32 {
        self.core.priority()
    }

    fn attach(&mut self, root: dragforge_core::ElementId, handler: SensorEventHandler) {
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
        if !self.core.is_enabled() {
            return false;
        }
        match &input.kind {
            RawInputKind::PointerDown { button, .. } => *button == self.options.button,
            RawInputKind::Key(key) => key.code == KeyCode::Escape,
            kind => self.core.declared().intersects(Listeners::channel(kind)),
        }
    }

    fn handle_input(&mut self, input: &RawInput, tree: &dyn VisualTree) {
        if !self.core.accepts(input) {
            return;
        }
        match &input.kind {
            RawInputKind::PointerDown {
                position,
                button,
                pointer_id,
            } => self.on_down(input, *position, *button, *pointer_id, tree),
            RawInputKind::PointerMove {
                position,
                pointer_id,
            } if self.tracks(*pointer_id) => self.on_move(input, *position),
            RawInputKind::PointerUp {
                position,
                button,
                pointer_id,
            } if self.tracks(*pointer_id) && *button == self.options.button => {
                self.on_up(input, *position);
            }
            RawInputKind::PointerLeave | RawInputKind::Blur => self.abort(Some(input)),
            RawInputKind::Key(key)
                if key.code == KeyCode::Escape && key.kind != KeyEventKind::Release =>
            {
                self.abort(Some(input));
            }
            _ => {}
        }
    }

    fn armed_listeners(&self) -> Listeners {
        self.core.armed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::SensorEvent;
    use dragforge_core::{ElementId, ElementTree, Rect};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Rig {
        tree: ElementTree,
        item: ElementId,
        sensor: PointerSensor,
        events: Rc<RefCell<Vec<SensorEvent>>>,
    }

    fn rig() -> Rig {
        let mut tree = ElementTree::default();
        let root = tree.create(None, Some(Rect::new(0.0, 0.0, 500.0, 500.0)));
        let item = tree.create(Some(root), Some(Rect::new(10.0, 10.0, 50.0, 50.0)));
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        let mut sensor = PointerSensor::new();
        sensor.attach(root, Box::new(move |e| sink.borrow_mut().push(e)));
        Rig {
            tree,
            item,
            sensor,
            events,
        }
    }

    fn kinds(events: &Rc<RefCell<Vec<SensorEvent>>>) -> Vec<SensorEventKind> {
        events.borrow().iter().map(|e| e.kind).collect()
    }

    #[test]
    fn jitter_then_activation() {
        let mut r = rig();
        let press = Point::new(20.0, 20.0);
        r.sensor
            .handle_input(&RawInput::pointer_down(r.item, press), &r.tree);
        r.sensor
            .handle_input(&RawInput::pointer_move(Point::new(21.0, 20.0)), &r.tree);
        assert!(r.events.borrow().is_empty());
        assert_eq!(r.sensor.phase(), GesturePhase::Pending);

        r.sensor
            .handle_input(&RawInput::pointer_move(Point::new(26.0, 20.0)), &r.tree);
        assert_eq!(
            kinds(&r.events),
            vec![SensorEventKind::Start, SensorEventKind::Move]
        );
        assert_eq!(r.events.borrow()[0].position, press);
        assert_eq!(r.events.borrow()[0].target, r.item);
        assert_eq!(r.events.borrow()[1].position, Point::new(26.0, 20.0));

        r.sensor
            .handle_input(&RawInput::pointer_up(Point::new(30.0, 20.0)), &r.tree);
        assert_eq!(kinds(&r.events).last(), Some(&SensorEventKind::End));
        assert_eq!(r.sensor.armed_listeners(), Listeners::POINTER_DOWN);
    }

    #[test]
    fn release_while_pending_is_silent() {
        let mut r = rig();
        r.sensor
            .handle_input(&RawInput::pointer_down(r.item, Point::new(20.0, 20.0)), &r.tree);
        assert!(r.sensor.armed_listeners().contains(Listeners::POINTER_UP));
        r.sensor
            .handle_input(&RawInput::pointer_up(Point::new(20.0, 20.0)), &r.tree);
        assert!(r.events.borrow().is_empty());
        assert_eq!(r.sensor.armed_listeners(), Listeners::POINTER_DOWN);
    }

    #[test]
    fn other_buttons_and_pointers_are_ignored() {
        let mut r = rig();
        let secondary = RawInput::new(RawInputKind::PointerDown {
            position: Point::new(20.0, 20.0),
            button: PointerButton::Secondary,
            pointer_id: 1,
        })
        .with_target(r.item);
        assert!(!r.sensor.can_handle(&secondary));
        r.sensor.handle_input(&secondary, &r.tree);
        assert_eq!(r.sensor.phase(), GesturePhase::Idle);

        r.sensor
            .handle_input(&RawInput::pointer_down(r.item, Point::new(20.0, 20.0)), &r.tree);
        let foreign = RawInput::new(RawInputKind::PointerMove {
            position: Point::new(90.0, 20.0),
            pointer_id: 7,
        });
        r.sensor.handle_input(&foreign, &r.tree);
        assert_eq!(r.sensor.phase(), GesturePhase::Pending);
    }

    #[test]
    fn press_outside_root_is_ignored() {
        let mut r = rig();
        let stranger = r.tree.create(None, Some(Rect::new(600.0, 0.0, 10.0, 10.0)));
        r.sensor
            .handle_input(&RawInput::pointer_down(stranger, Point::new(605.0, 5.0)), &r.tree);
        assert_eq!(r.sensor.phase(), GesturePhase::Idle);
    }

    #[test]
    fn leave_blur_and_escape_cancel_active_gestures() {
        for abort in [
            RawInput::new(RawInputKind::PointerLeave),
            RawInput::new(RawInputKind::Blur),
            RawInput::key(KeyCode::Escape),
        ] {
            let mut r = rig();
            r.sensor
                .handle_input(&RawInput::pointer_down(r.item, Point::new(20.0, 20.0)), &r.tree);
            r.sensor
                .handle_input(&RawInput::pointer_move(Point::new(40.0, 20.0)), &r.tree);
            r.sensor.handle_input(&abort, &r.tree);
            let events = r.events.borrow();
            assert_eq!(events.last().map(|e| e.kind), Some(SensorEventKind::Cancel));
            assert_eq!(events.last().map(|e| e.position), Some(Point::new(40.0, 20.0)));
            assert!(!r.sensor.is_active());
        }
    }

    #[test]
    fn detach_and_disable_cancel() {
        let mut r = rig();
        r.sensor
            .handle_input(&RawInput::pointer_down(r.item, Point::new(20.0, 20.0)), &r.tree);
        r.sensor
            .handle_input(&RawInput::pointer_move(Point::new(40.0, 20.0)), &r.tree);
        r.sensor.disable();
        assert_eq!(kinds(&r.events).last(), Some(&SensorEventKind::Cancel));
        assert!(r.sensor.armed_listeners().is_empty());

        r.sensor
            .handle_input(&RawInput::pointer_down(r.item, Point::new(20.0, 20.0)), &r.tree);
        assert_eq!(r.sensor.phase(), GesturePhase::Idle);

        r.sensor.enable();
        r.sensor
            .handle_input(&RawInput::pointer_down(r.item, Point::new(20.0, 20.0)), &r.tree);
        r.sensor
            .handle_input(&RawInput::pointer_move(Point::new(40.0, 20.0)), &r.tree);
        let before = r.events.borrow().len();
        r.sensor.detach();
        assert_eq!(r.events.borrow().len(), before + 1);
        assert_eq!(kinds(&r.events).last(), Some(&SensorEventKind::Cancel));
        assert!(!r.sensor.is_attached());
        assert!(r.sensor.armed_listeners().is_empty());
    }

    #[test]
    fn invalid_options_are_rejected() {
        let options = PointerSensorOptions {
            constraint: ActivationConstraint::distance(f64::INFINITY),
            ..PointerSensorOptions::default()
        };
        assert!(PointerSensor::with_options(options).is_err());
    }
}
