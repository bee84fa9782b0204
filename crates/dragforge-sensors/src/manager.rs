#![forbid(unsafe_code)]

//! Sensor registration, activation and exclusive arbitration.
//!
//! The manager owns every registered sensor and hands each one a private
//! sink. Sensor events land in a queue that the manager drains after every
//! call into a sensor, so arbitration never runs re-entrantly inside a
//! sensor callback.
//!
//! # Exclusive mode
//!
//! The sensor whose `Start` is forwarded becomes *authoritative* until it
//! forwards `End` or `Cancel`. While a sensor is authoritative:
//!
//! - Events from every other sensor are dropped.
//! - Another sensor's `Start` is a conflict. The lower-priority sensor of the
//!   two is deactivated (disabled) and a warning is logged. On equal
//!   priority the current authority keeps the gesture. When the newcomer
//!   wins, the old authority's `Cancel` is forwarded before the new `Start`.
//!
//! In non-exclusive mode every event is forwarded.
//!
//! # Invariants
//!
//! 1. Every forwarded event carries a [`SensorTag`] naming its sensor.
//! 2. At most one sensor is authoritative.
//! 3. `deactivate_all` is idempotent.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use ahash::AHashSet;
use dragforge_core::{ElementId, RawInput, VisualTree};

use crate::sensor::{Sensor, SensorEvent, SensorEventHandler, SensorEventKind, SensorTag};

type Inbox = Rc<RefCell<VecDeque<(u64, SensorEvent)>>>;

/// Manager behavior switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorManagerOptions {
    /// Activate the highest-priority enabled sensor on `attach`.
    pub auto_activate: bool,
    /// One authoritative sensor at a time.
    pub exclusive_mode: bool,
}

impl Default for SensorManagerOptions {
    fn default() -> Self {
        Self {
            auto_activate: true,
            exclusive_mode: true,
        }
    }
}

/// Handle returned by [`SensorManager::register`].
///
/// A duplicate registration returns an inert handle whose release is a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "keep the registration to unregister the sensor later"]
pub struct SensorRegistration {
    key: Option<u64>,
    name: Option<Rc<str>>,
}

impl SensorRegistration {
    pub const INERT: Self = Self {
        key: None,
        name: None,
    };

    /// Whether the registration was refused.
    #[must_use]
    pub const fn is_inert(&self) -> bool {
        self.key.is_none()
    }

    /// Name of the registered sensor.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

struct SensorSlot {
    key: u64,
    name: Rc<str>,
    sensor: Box<dyn Sensor>,
}

/// Owns sensors and forwards the authoritative one's events.
pub struct SensorManager {
    options: SensorManagerOptions,
    slots: Vec<SensorSlot>,
    next_key: u64,
    activated: AHashSet<u64>,
    authority: Option<u64>,
    root: Option<ElementId>,
    handler: Option<SensorEventHandler>,
    inbox: Inbox,
}

impl fmt::Debug for SensorManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.slots.iter().map(|slot| &*slot.name).collect();
        f.debug_struct("SensorManager")
            .field("options", &self.options)
            .field("sensors", &names)
            .field("authoritative", &self.authoritative())
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl Default for SensorManager {
    fn default() -> Self {
        Self::new(SensorManagerOptions::default())
    }
}

fn sink(inbox: &Inbox, key: u64) -> SensorEventHandler {
    let inbox = Rc::clone(inbox);
    Box::new(move |event| inbox.borrow_mut().push_back((key, event)))
}

impl SensorManager {
    #[must_use]
    pub fn new(options: SensorManagerOptions) -> Self {
        Self {
            options,
            slots: Vec::new(),
            next_key: 0,
            activated: AHashSet::new(),
            authority: None,
            root: None,
            handler: None,
            inbox: Rc::new(RefCell::new(VecDeque::new())),
        }
    }

    #[must_use]
    pub const fn options(&self) -> &SensorManagerOptions {
        &self.options
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[must_use]
    pub const fn is_attached(&self) -> bool {
        self.handler.is_some()
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Register a sensor. Attaches it immediately if the manager is attached.
    ///
    /// A name that is already registered is logged and ignored.
    pub fn register(&mut self, sensor: Box<dyn Sensor>) -> SensorRegistration {
        let name: Rc<str> = Rc::from(sensor.name());
        if self.slots.iter().any(|slot| slot.name == name) {
            tracing::warn!(
                target: "dragforge.sensors.manager",
                sensor = %name,
                "sensor already registered"
            );
            return SensorRegistration::INERT;
        }

        let key = self.next_key;
        self.next_key += 1;
        let mut slot = SensorSlot {
            key,
            name: Rc::clone(&name),
            sensor,
        };
        if let Some(root) = self.root
            && self.handler.is_some()
        {
            slot.sensor.attach(root, sink(&self.inbox, key));
        }
        tracing::debug!(
            target: "dragforge.sensors.manager",
            sensor = %name,
            priority = slot.sensor.priority(),
            "sensor registered"
        );
        self.slots.push(slot);
        SensorRegistration {
            key: Some(key),
            name: Some(name),
        }
    }

    /// Unregister through a handle from [`register`](Self::register).
    pub fn release(&mut self, registration: SensorRegistration) -> bool {
        registration
            .key
            .is_some_and(|key| self.unregister_key(key))
    }

    /// Detach, destroy and remove the named sensor.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.key_of(name)
            .is_some_and(|key| self.unregister_key(key))
    }

    fn unregister_key(&mut self, key: u64) -> bool {
        let Some(index) = self.index_of(key) else {
            return false;
        };
        self.activated.remove(&key);
        self.slots[index].sensor.detach();
        self.pump();
        self.slots[index].sensor.destroy();
        let slot = self.slots.remove(index);
        if self.authority == Some(key) {
            self.authority = None;
        }
        tracing::debug!(
            target: "dragforge.sensors.manager",
            sensor = %slot.name,
            "sensor unregistered"
        );
        true
    }

    // -----------------------------------------------------------------------
    // Attachment
    // -----------------------------------------------------------------------

    /// Bind every sensor to `root` and forward to `handler`.
    pub fn attach(&mut self, root: ElementId, handler: SensorEventHandler) {
        if self.is_attached() {
            self.detach();
        }
        self.root = Some(root);
        self.handler = Some(handler);
        for slot in &mut self.slots {
            slot.sensor.attach(root, sink(&self.inbox, slot.key));
        }
        tracing::debug!(
            target: "dragforge.sensors.manager",
            root = root.get(),
            sensors = self.slots.len(),
            "sensor manager attached"
        );

        if self.options.auto_activate
            && let Some(key) = self
                .slots
                .iter()
                .filter(|slot| slot.sensor.is_enabled())
                .max_by(|a, b| {
                    a.sensor
                        .priority()
                        .cmp(&b.sensor.priority())
                        .then(b.key.cmp(&a.key))
                })
                .map(|slot| slot.key)
        {
            self.activate_key(key);
        }
    }

    /// Unbind every sensor. Active gestures are cancelled and the cancel is
    /// forwarded before the handler is dropped. Enablement is kept.
    pub fn detach(&mut self) {
        for slot in &mut self.slots {
            slot.sensor.detach();
        }
        self.pump();
        self.authority = None;
        self.root = None;
        if self.handler.take().is_some() {
            tracing::debug!(target: "dragforge.sensors.manager", "sensor manager detached");
        }
    }

    /// Detach and destroy every sensor, then forget them.
    pub fn destroy(&mut self) {
        self.detach();
        for slot in &mut self.slots {
            slot.sensor.destroy();
        }
        self.slots.clear();
        self.activated.clear();
        self.inbox.borrow_mut().clear();
    }

    // -----------------------------------------------------------------------
    // Activation
    // -----------------------------------------------------------------------

    /// Enable the named sensor and mark it active. In exclusive mode every
    /// other active sensor is deactivated first.
    pub fn activate(&mut self, name: &str) -> bool {
        let Some(key) = self.key_of(name) else {
            return false;
        };
        if self.options.exclusive_mode {
            let others: Vec<u64> = self
                .activated
                .iter()
                .copied()
                .filter(|other| *other != key)
                .collect();
            for other in others {
                self.deactivate_key(other);
            }
        }
        self.activate_key(key)
    }

    /// Disable the named sensor. Returns `false` if it was not active.
    pub fn deactivate(&mut self, name: &str) -> bool {
        self.key_of(name)
            .is_some_and(|key| self.deactivate_key(key))
    }

    /// Deactivate every active sensor.
    pub fn deactivate_all(&mut self) {
        let keys: Vec<u64> = self.activated.iter().copied().collect();
        for key in keys {
            self.deactivate_key(key);
        }
    }

    fn activate_key(&mut self, key: u64) -> bool {
        let Some(index) = self.index_of(key) else {
            return false;
        };
        if !self.activated.insert(key) {
            return true;
        }
        let slot = &mut self.slots[index];
        slot.sensor.enable();
        tracing::debug!(
            target: "dragforge.sensors.manager",
            sensor = %slot.name,
            "sensor activated"
        );
        true
    }

    fn deactivate_key(&mut self, key: u64) -> bool {
        if !self.activated.remove(&key) {
            return false;
        }
        let Some(index) = self.index_of(key) else {
            return false;
        };
        self.slots[index].sensor.disable();
        tracing::debug!(
            target: "dragforge.sensors.manager",
            sensor = %self.slots[index].name,
            "sensor deactivated"
        );
        self.pump();
        true
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Names of active sensors, in registration order.
    #[must_use]
    pub fn active_sensors(&self) -> Vec<&str> {
        self.slots
            .iter()
            .filter(|slot| self.activated.contains(&slot.key))
            .map(|slot| &*slot.name)
            .collect()
    }

    /// Every registered sensor, in registration order.
    #[must_use]
    pub fn sensors(&self) -> Vec<&dyn Sensor> {
        self.slots
            .iter()
            .map(|slot| &*slot.sensor as &dyn Sensor)
            .collect()
    }

    #[must_use]
    pub fn sensor(&self, name: &str) -> Option<&dyn Sensor> {
        self.slots
            .iter()
            .find(|slot| &*slot.name == name)
            .map(|slot| &*slot.sensor as &dyn Sensor)
    }

    /// Enabled sensors that can handle `input`, highest priority first.
    #[must_use]
    pub fn handlers_for(&self, input: &RawInput) -> Vec<&dyn Sensor> {
        let mut handlers: Vec<&dyn Sensor> = self
            .slots
            .iter()
            .filter(|slot| slot.sensor.is_enabled() && slot.sensor.can_handle(input))
            .map(|slot| &*slot.sensor as &dyn Sensor)
            .collect();
        handlers.sort_by(|a, b| b.priority().cmp(&a.priority()));
        handlers
    }

    /// Name of the sensor that owns the current gesture.
    #[must_use]
    pub fn authoritative(&self) -> Option<&str> {
        let key = self.authority?;
        self.index_of(key).map(|index| &*self.slots[index].name)
    }

    fn key_of(&self, name: &str) -> Option<u64> {
        self.slots
            .iter()
            .find(|slot| &*slot.name == name)
            .map(|slot| slot.key)
    }

    fn index_of(&self, key: u64) -> Option<usize> {
        self.slots.iter().position(|slot| slot.key == key)
    }

    // -----------------------------------------------------------------------
    // Input and routing
    // -----------------------------------------------------------------------

    /// Offer `input` to every enabled sensor, highest priority first.
    pub fn handle_input(&mut self, input: &RawInput, tree: &dyn VisualTree) {
        let mut order: Vec<usize> = (0..self.slots.len()).collect();
        order.sort_by(|a, b| {
            self.slots[*b]
                .sensor
                .priority()
                .cmp(&self.slots[*a].sensor.priority())
        });
        for index in order {
            let sensor = &mut self.slots[index].sensor;
            if sensor.is_enabled() {
                sensor.handle_input(input, tree);
            }
            self.pump();
        }
    }

    fn pump(&mut self) {
        loop {
            let next = self.inbox.borrow_mut().pop_front();
            let Some((key, event)) = next else {
                break;
            };
            self.route(key, event);
        }
    }

    fn route(&mut self, key: u64, event: SensorEvent) {
        let Some(index) = self.index_of(key) else {
            return;
        };
        let tag = SensorTag {
            name: Rc::clone(&self.slots[index].name),
            priority: self.slots[index].sensor.priority(),
        };

        if !self.options.exclusive_mode {
            self.forward(event, tag);
            return;
        }

        match self.authority {
            None if event.kind == SensorEventKind::Start => {
                self.authority = Some(key);
                self.forward(event, tag);
            }
            Some(current) if current == key => {
                if event.kind.is_terminal() {
                    self.authority = None;
                }
                self.forward(event, tag);
            }
            Some(current) if event.kind == SensorEventKind::Start => {
                self.resolve_conflict(current, key, event, tag);
            }
            _ => {
                tracing::trace!(
                    target: "dragforge.sensors.manager",
                    sensor = %tag.name,
                    kind = event.kind.as_str(),
                    "event from non-authoritative sensor dropped"
                );
            }
        }
    }

    fn resolve_conflict(&mut self, holder: u64, key: u64, event: SensorEvent, tag: SensorTag) {
        let Some(holder_index) = self.index_of(holder) else {
            self.authority = Some(key);
            self.forward(event, tag);
            return;
        };
        let holder_name = Rc::clone(&self.slots[holder_index].name);
        let holder_priority = self.slots[holder_index].sensor.priority();

        if tag.priority > holder_priority {
            tracing::warn!(
                target: "dragforge.sensors.manager",
                winner = %tag.name,
                loser = %holder_name,
                winner_priority = tag.priority,
                loser_priority = holder_priority,
                "sensor conflict"
            );
            self.demote(holder);
            self.flush_from(holder);
            self.authority = Some(key);
            self.forward(event, tag);
        } else {
            tracing::warn!(
                target: "dragforge.sensors.manager",
                winner = %holder_name,
                loser = %tag.name,
                winner_priority = holder_priority,
                loser_priority = tag.priority,
                "sensor conflict"
            );
            self.demote(key);
        }
    }

    /// Disable a sensor that lost a conflict. Its events stay queued.
    fn demote(&mut self, key: u64) {
        self.activated.remove(&key);
        if let Some(index) = self.index_of(key) {
            self.slots[index].sensor.disable();
        }
    }

    /// Route queued events from `key` ahead of everything else.
    fn flush_from(&mut self, key: u64) {
        let mine: Vec<(u64, SensorEvent)> = {
            let mut inbox = self.inbox.borrow_mut();
            let (mine, rest): (Vec<_>, Vec<_>) =
                inbox.drain(..).partition(|(from, _)| *from == key);
            *inbox = rest.into();
            mine
        };
        for (from, event) in mine {
            self.route(from, event);
        }
    }

    fn forward(&mut self, mut event: SensorEvent, tag: SensorTag) {
        let Some(handler) = self.handler.as_mut() else {
            return;
        };
        event.source = Some(tag);
        handler(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::KeyboardSensor;
    use crate::pointer::PointerSensor;
    use crate::touch::TouchSensor;
    use dragforge_core::{ElementTree, KeyCode, Point, Rect};

    type Log = Rc<RefCell<Vec<SensorEvent>>>;

    fn attached(manager: &mut SensorManager) -> (ElementTree, ElementId, Log) {
        let mut tree = ElementTree::default();
        let root = tree.create(None, Some(Rect::new(0.0, 0.0, 500.0, 500.0)));
        let item = tree.create(Some(root), Some(Rect::new(10.0, 10.0, 40.0, 40.0)));
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        manager.attach(root, Box::new(move |e| sink.borrow_mut().push(e)));
        (tree, item, log)
    }

    #[test]
    fn duplicate_registration_is_inert() {
        let mut manager = SensorManager::default();
        let first = manager.register(Box::new(PointerSensor::new()));
        let second = manager.register(Box::new(PointerSensor::new()));
        assert!(!first.is_inert());
        assert!(second.is_inert());
        assert_eq!(manager.len(), 1);
        assert!(!manager.release(second));
        assert_eq!(manager.len(), 1);
        assert!(manager.release(first));
        assert!(manager.is_empty());
    }

    #[test]
    fn attach_auto_activates_highest_priority() {
        let mut manager = SensorManager::default();
        let _k = manager.register(Box::new(KeyboardSensor::new()));
        let _p = manager.register(Box::new(PointerSensor::new()));
        let _t = manager.register(Box::new(TouchSensor::new()));
        let _ = attached(&mut manager);
        assert_eq!(manager.active_sensors(), vec!["pointer"]);
        assert!(manager.sensors().iter().all(|s| s.is_attached()));
    }

    #[test]
    fn exclusive_activate_deactivates_others() {
        let mut manager = SensorManager::default();
        let _p = manager.register(Box::new(PointerSensor::new()));
        let _k = manager.register(Box::new(KeyboardSensor::new()));
        let _ = attached(&mut manager);
        assert!(manager.activate("keyboard"));
        assert_eq!(manager.active_sensors(), vec!["keyboard"]);
        assert!(manager.sensor("pointer").is_some_and(|s| !s.is_enabled()));
        assert!(!manager.activate("missing"));

        manager.deactivate_all();
        manager.deactivate_all();
        assert!(manager.active_sensors().is_empty());
        assert!(!manager.deactivate("keyboard"));
    }

    #[test]
    fn forwarded_events_are_tagged() {
        let mut manager = SensorManager::default();
        let _p = manager.register(Box::new(PointerSensor::new()));
        let (tree, item, log) = attached(&mut manager);
        manager.handle_input(&RawInput::pointer_down(item, Point::new(20.0, 20.0)), &tree);
        manager.handle_input(&RawInput::pointer_move(Point::new(30.0, 20.0)), &tree);
        assert_eq!(manager.authoritative(), Some("pointer"));
        manager.handle_input(&RawInput::pointer_up(Point::new(30.0, 20.0)), &tree);
        assert_eq!(manager.authoritative(), None);

        let log = log.borrow();
        assert_eq!(log.len(), 3);
        for event in log.iter() {
            let tag = event.source.as_ref().map(|tag| (&*tag.name, tag.priority));
            assert_eq!(tag, Some(("pointer", 100)));
        }
    }

    #[test]
    fn lower_priority_start_during_gesture_is_demoted() {
        let mut manager = SensorManager::default();
        let _p = manager.register(Box::new(PointerSensor::new()));
        let _k = manager.register(Box::new(KeyboardSensor::new()));
        let (tree, item, log) = attached(&mut manager);

        manager.handle_input(&RawInput::pointer_down(item, Point::new(20.0, 20.0)), &tree);
        manager.handle_input(&RawInput::pointer_move(Point::new(30.0, 20.0)), &tree);
        manager.handle_input(&RawInput::key(KeyCode::Space).with_target(item), &tree);

        assert_eq!(manager.authoritative(), Some("pointer"));
        assert!(manager.sensor("keyboard").is_some_and(|s| !s.is_enabled()));
        assert!(
            log.borrow()
                .iter()
                .all(|e| e.source.as_ref().is_some_and(|tag| &*tag.name == "pointer"))
        );
    }

    #[test]
    fn higher_priority_start_takes_over() {
        let mut manager = SensorManager::default();
        let _p = manager.register(Box::new(PointerSensor::new()));
        let _k = manager.register(Box::new(KeyboardSensor::new()));
        let (tree, item, log) = attached(&mut manager);

        manager.handle_input(&RawInput::key(KeyCode::Space).with_target(item), &tree);
        assert_eq!(manager.authoritative(), Some("keyboard"));
        manager.handle_input(&RawInput::pointer_down(item, Point::new(20.0, 20.0)), &tree);
        manager.handle_input(&RawInput::pointer_move(Point::new(30.0, 20.0)), &tree);

        assert_eq!(manager.authoritative(), Some("pointer"));
        let summary: Vec<(String, SensorEventKind)> = log
            .borrow()
            .iter()
            .map(|e| {
                let name = e.source.as_ref().map(|t| t.name.to_string()).unwrap_or_default();
                (name, e.kind)
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                ("keyboard".to_string(), SensorEventKind::Start),
                ("keyboard".to_string(), SensorEventKind::Cancel),
                ("pointer".to_string(), SensorEventKind::Start),
                ("pointer".to_string(), SensorEventKind::Move),
            ]
        );
    }

    #[test]
    fn non_exclusive_mode_forwards_everything() {
        let mut manager = SensorManager::new(SensorManagerOptions {
            auto_activate: true,
            exclusive_mode: false,
        });
        let _p = manager.register(Box::new(PointerSensor::new()));
        let _k = manager.register(Box::new(KeyboardSensor::new()));
        let (tree, item, log) = attached(&mut manager);
        manager.handle_input(&RawInput::key(KeyCode::Space).with_target(item), &tree);
        manager.handle_input(&RawInput::pointer_down(item, Point::new(20.0, 20.0)), &tree);
        manager.handle_input(&RawInput::pointer_move(Point::new(30.0, 20.0)), &tree);
        assert_eq!(log.borrow().len(), 3);
        assert_eq!(manager.authoritative(), None);
    }

    #[test]
    fn unregistering_active_sensor_forwards_cancel() {
        let mut manager = SensorManager::default();
        let registration = manager.register(Box::new(PointerSensor::new()));
        let (tree, item, log) = attached(&mut manager);
        manager.handle_input(&RawInput::pointer_down(item, Point::new(20.0, 20.0)), &tree);
        manager.handle_input(&RawInput::pointer_move(Point::new(30.0, 20.0)), &tree);
        assert!(manager.release(registration));
        assert_eq!(log.borrow().last().map(|e| e.kind), Some(SensorEventKind::Cancel));
        assert_eq!(manager.authoritative(), None);
    }

    #[test]
    fn handlers_sorted_by_priority() {
        let mut manager = SensorManager::default();
        let _k = manager.register(Box::new(KeyboardSensor::new()));
        let _p = manager.register(Box::new(PointerSensor::new()));
        let _ = attached(&mut manager);
        let blur = RawInput::new(dragforge_core::RawInputKind::Blur);
        let names: Vec<&str> = manager.handlers_for(&blur).iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["pointer", "keyboard"]);
        let key = RawInput::key(KeyCode::Enter);
        let names: Vec<&str> = manager.handlers_for(&key).iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["keyboard"]);
    }

    #[test]
    fn destroy_detaches_everything() {
        let mut manager = SensorManager::default();
        let _p = manager.register(Box::new(PointerSensor::new()));
        let _ = attached(&mut manager);
        manager.destroy();
        assert!(manager.is_empty());
        assert!(!manager.is_attached());
    }
}
