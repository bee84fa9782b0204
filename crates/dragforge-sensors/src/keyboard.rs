#![forbid(unsafe_code)]

//! Keyboard-driven dragging.
//!
//! Space or Enter on a focused element inside the root picks it up: the
//! gesture is active immediately and `Start` is emitted at the center of the
//! element's bounds. Arrow keys emit `Move` by `step` units (scaled by
//! `fast_multiplier` while Shift is held). Space or Enter again emits `End`;
//! Escape or focus loss emits `Cancel`. Key releases are ignored.

use dragforge_core::{
    ElementId, KeyCode, KeyEvent, KeyEventKind, Point, RawInput, RawInputKind, VisualTree,
};

use crate::constraint::ActivationConstraint;
use crate::gesture::{GesturePhase, GestureTracker};
use crate::listeners::{ListenerSet, Listeners};
use crate::sensor::{Sensor, SensorCore, SensorEventHandler, SensorEventKind};

/// Arbitration priority of [`KeyboardSensor`].
pub const KEYBOARD_SENSOR_PRIORITY: u32 = 50;

/// Configuration for [`KeyboardSensor`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyboardSensorOptions {
    /// Units moved per arrow press.
    pub step: f64,
    /// Step multiplier while Shift is held.
    pub fast_multiplier: f64,
}

impl Default for KeyboardSensorOptions {
    fn default() -> Self {
        Self {
            step: 10.0,
            fast_multiplier: 5.0,
        }
    }
}

/// Keyboard sensor.
#[derive(Debug)]
pub struct KeyboardSensor {
    core: SensorCore,
    options: KeyboardSensorOptions,
    gesture: GestureTracker,
}

impl Default for KeyboardSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyboardSensor {
    pub const NAME: &'static str = "keyboard";

    #[must_use]
    pub fn new() -> Self {
        Self::with_options(KeyboardSensorOptions::default())
    }

    #[must_use]
    pub fn with_options(options: KeyboardSensorOptions) -> Self {
        Self {
            core: SensorCore::new(
                Self::NAME,
                KEYBOARD_SENSOR_PRIORITY,
                ListenerSet::new(Listeners::KEY, Listeners::KEY | Listeners::BLUR),
            ),
            options,
            gesture: GestureTracker::new(ActivationConstraint::NONE),
        }
    }

    #[must_use]
    pub const fn options(&self) -> &KeyboardSensorOptions {
        &self.options
    }

    #[must_use]
    pub const fn phase(&self) -> GesturePhase {
        self.gesture.phase()
    }

    fn step_for(&self, key: &KeyEvent) -> Option<Point> {
        let step = if key.shift() {
            self.options.step * self.options.fast_multiplier
        } else {
            self.options.step
        };
        match key.code {
            KeyCode::Up => Some(Point::new(0.0, -step)),
            KeyCode::Down => Some(Point::new(0.0, step)),
            KeyCode::Left => Some(Point::new(-step, 0.0)),
            KeyCode::Right => Some(Point::new(step, 0.0)),
            _ => None,
        }
    }

    fn on_key(&mut self, input: &RawInput, key: &KeyEvent, tree: &dyn VisualTree) {
        if key.kind == KeyEventKind::Release {
            return;
        }
        let is_toggle = matches!(key.code, KeyCode::Space | KeyCode::Enter);
        if self.gesture.is_idle() {
            if is_toggle && key.kind == KeyEventKind::Press {
                self.pick_up(input, tree);
            }
            return;
        }

        let target = self.gesture.target();
        if is_toggle {
            let position = self.gesture.last();
            self.finish();
            self.core
                .emit(SensorEventKind::End, position, target, input.timestamp, Some(input));
        } else if key.code == KeyCode::Escape {
            self.abort(Some(input));
        } else if let Some(delta) = self.step_for(key)
            && let Some(position) = self.gesture.nudge(delta)
        {
            self.core
                .emit(SensorEventKind::Move, position, target, input.timestamp, Some(input));
        }
    }

    fn pick_up(&mut self, input: &RawInput, tree: &dyn VisualTree) {
        if !self.core.in_root(input.target, tree) {
            return;
        }
        let Some(bounds) = input.target.and_then(|target| tree.bounds(target)) else {
            return;
        };
        let center = bounds.center();
        self.gesture.activate(center, input.target, input.timestamp);
        self.core.begin_session();
        self.core
            .emit(SensorEventKind::Start, center, input.target, input.timestamp, Some(input));
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
        self.core.end_session();
        self.gesture.reset()
    }
}

impl Sensor for KeyboardSensor {
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
            && match &input.kind {
                RawInputKind::Key(key) => key.kind != KeyEventKind::Release,
                RawInputKind::Blur => true,
                _ => false,
            }
    }

    fn handle_input(&mut self, input: &RawInput, tree: &dyn VisualTree) {
        if !self.core.accepts(input) {
            return;
        }
        match &input.kind {
            RawInputKind::Key(key) => self.on_key(input, key, tree),
            RawInputKind::Blur => self.abort(Some(input)),
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
    use dragforge_core::{ElementTree, Modifiers, Rect};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn setup() -> (ElementTree, ElementId, KeyboardSensor, Rc<RefCell<Vec<SensorEvent>>>) {
        let mut tree = ElementTree::default();
        let root = tree.create(None, Some(Rect::new(0.0, 0.0, 500.0, 500.0)));
        let item = tree.create(Some(root), Some(Rect::new(100.0, 100.0, 40.0, 20.0)));
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        let mut sensor = KeyboardSensor::new();
        sensor.attach(root, Box::new(move |e| sink.borrow_mut().push(e)));
        (tree, item, sensor, events)
    }

    fn press(code: KeyCode, target: ElementId) -> RawInput {
        RawInput::key(code).with_target(target)
    }

    #[test]
    fn pick_up_move_and_drop() {
        let (tree, item, mut sensor, events) = setup();
        sensor.handle_input(&press(KeyCode::Space, item), &tree);
        assert!(sensor.is_active());
        assert_eq!(events.borrow().len(), 1);
        assert_eq!(events.borrow()[0].kind, SensorEventKind::Start);
        assert_eq!(events.borrow()[0].position, Point::new(120.0, 110.0));

        sensor.handle_input(&press(KeyCode::Right, item), &tree);
        let shifted = RawInput::new(RawInputKind::Key(
            KeyEvent::new(KeyCode::Down).with_modifiers(Modifiers::SHIFT),
        ));
        sensor.handle_input(&shifted, &tree);
        sensor.handle_input(&press(KeyCode::Enter, item), &tree);

        let events = events.borrow();
        let kinds: Vec<_> = events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SensorEventKind::Start,
                SensorEventKind::Move,
                SensorEventKind::Move,
                SensorEventKind::End
            ]
        );
        assert_eq!(events[1].position, Point::new(130.0, 110.0));
        assert_eq!(events[2].position, Point::new(130.0, 160.0));
        assert_eq!(events[3].position, Point::new(130.0, 160.0));
        assert_eq!(sensor.armed_listeners(), Listeners::KEY);
    }

    #[test]
    fn escape_and_blur_cancel() {
        for abort in [RawInput::key(KeyCode::Escape), RawInput::new(RawInputKind::Blur)] {
            let (tree, item, mut sensor, events) = setup();
            sensor.handle_input(&press(KeyCode::Enter, item), &tree);
            sensor.handle_input(&abort, &tree);
            assert_eq!(
                events.borrow().last().map(|e| e.kind),
                Some(SensorEventKind::Cancel)
            );
            assert!(!sensor.is_active());
        }
    }

    #[test]
    fn idle_keys_other_than_pick_up_do_nothing() {
        let (tree, item, mut sensor, events) = setup();
        sensor.handle_input(&press(KeyCode::Right, item), &tree);
        sensor.handle_input(&press(KeyCode::Escape, item), &tree);
        let release = RawInput::new(RawInputKind::Key(
            KeyEvent::new(KeyCode::Space).with_kind(KeyEventKind::Release),
        ))
        .with_target(item);
        sensor.handle_input(&release, &tree);
        assert!(!sensor.can_handle(&release));
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn pick_up_requires_bounds() {
        let (mut tree, _item, mut sensor, events) = setup();
        let root = ElementId(1);
        let unlaid = tree.create(Some(root), None);
        sensor.handle_input(&press(KeyCode::Space, unlaid), &tree);
        assert!(events.borrow().is_empty());
        assert!(!sensor.is_active());
    }
}
