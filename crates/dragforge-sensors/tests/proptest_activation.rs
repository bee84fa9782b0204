//! Property tests for pointer activation.
//!
//! 1. With distance 5 / tolerance 2, any move that stays within 2 units of
//!    the press emits nothing.
//! 2. The first move at 5 units or more emits exactly `Start` at the press
//!    position followed by `Move` at the current position.
//! 3. After any press/move/release script, only root listeners are armed.

use std::cell::RefCell;
use std::rc::Rc;

use dragforge_core::{ElementId, ElementTree, Point, RawInput, Rect};
use dragforge_sensors::{Listeners, PointerSensor, Sensor, SensorEvent, SensorEventKind};
use proptest::prelude::*;

fn rig() -> (ElementTree, ElementId, PointerSensor, Rc<RefCell<Vec<SensorEvent>>>) {
    let mut tree = ElementTree::default();
    let root = tree.create(None, Some(Rect::new(0.0, 0.0, 1000.0, 1000.0)));
    let item = tree.create(Some(root), Some(Rect::new(400.0, 400.0, 100.0, 100.0)));
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    let mut sensor = PointerSensor::new();
    sensor.attach(root, Box::new(move |e| sink.borrow_mut().push(e)));
    (tree, item, sensor, log)
}

fn offset(angle: f64, radius: f64) -> Point {
    Point::new(angle.cos() * radius, angle.sin() * radius)
}

proptest! {
    #[test]
    fn jitter_never_activates(
        press in (100i32..900, 100i32..900),
        jitter in prop::collection::vec((0.0f64..std::f64::consts::TAU, 0.0f64..1.9), 1..20),
    ) {
        let (tree, item, mut sensor, log) = rig();
        let press = Point::new(f64::from(press.0), f64::from(press.1));
        sensor.handle_input(&RawInput::pointer_down(item, press), &tree);
        for (angle, radius) in jitter {
            sensor.handle_input(&RawInput::pointer_move(press + offset(angle, radius)), &tree);
        }
        prop_assert!(log.borrow().is_empty());
        prop_assert!(!sensor.is_active());
    }

    #[test]
    fn first_qualifying_move_emits_start_then_move(
        press in (100i32..900, 100i32..900),
        angle in 0.0f64..std::f64::consts::TAU,
        radius in 5.5f64..80.0,
    ) {
        let (tree, item, mut sensor, log) = rig();
        let press = Point::new(f64::from(press.0), f64::from(press.1));
        let target = press + offset(angle, radius);
        sensor.handle_input(&RawInput::pointer_down(item, press), &tree);
        sensor.handle_input(&RawInput::pointer_move(target), &tree);

        let log = log.borrow();
        prop_assert_eq!(log.len(), 2);
        prop_assert_eq!(log[0].kind, SensorEventKind::Start);
        prop_assert_eq!(log[0].position, press);
        prop_assert_eq!(log[1].kind, SensorEventKind::Move);
        prop_assert_eq!(log[1].position, target);
    }

    #[test]
    fn listeners_return_to_root_after_release(
        steps in prop::collection::vec((-30i32..30, -30i32..30), 0..12),
    ) {
        let (tree, item, mut sensor, _log) = rig();
        let mut position = Point::new(450.0, 450.0);
        sensor.handle_input(&RawInput::pointer_down(item, position), &tree);
        for (dx, dy) in steps {
            position += Point::new(f64::from(dx), f64::from(dy));
            sensor.handle_input(&RawInput::pointer_move(position), &tree);
        }
        sensor.handle_input(&RawInput::pointer_up(position), &tree);
        prop_assert_eq!(sensor.armed_listeners(), Listeners::POINTER_DOWN);
    }
}
