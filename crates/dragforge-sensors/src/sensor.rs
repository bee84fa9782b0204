#![forbid(unsafe_code)]

//! The sensor capability and the state every built-in sensor shares.
//!
//! A sensor turns one raw input source into a four-stage gesture:
//! `Start`, any number of `Move`s, then exactly one of `End` or `Cancel`.
//!
//! # Invariants
//!
//! 1. A sensor emits nothing while detached or disabled.
//! 2. `Start` is emitted at most once per gesture and always first.
//! 3. Detaching or disabling an active sensor emits `Cancel` before the
//!    handler is dropped.
//! 4. After any terminal transition only root listeners remain armed.
//!
//! # Failure Modes
//!
//! - Inputs whose target lies outside the attached root are ignored.
//! - Inputs arriving on an unarmed channel are ignored (traced).

use std::fmt;
use std::rc::Rc;

use dragforge_core::{ElementId, Point, RawInput, VisualTree};
use web_time::Instant;

use crate::listeners::{ListenerSet, Listeners};

/// Gesture stage reported by a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorEventKind {
    Start,
    Move,
    End,
    Cancel,
}

impl SensorEventKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Move => "move",
            Self::End => "end",
            Self::Cancel => "cancel",
        }
    }

    /// `End` or `Cancel`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::End | Self::Cancel)
    }
}

/// Identity of the sensor that produced an event, stamped by the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorTag {
    pub name: Rc<str>,
    pub priority: u32,
}

/// A normalized gesture event.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorEvent {
    pub kind: SensorEventKind,
    /// Absolute position. `Start` carries the press position.
    pub position: Point,
    /// Element the gesture began on, or the root when unknown.
    pub target: ElementId,
    pub timestamp: Instant,
    /// Raw input that caused the event. `None` for synthesized cancels.
    pub raw: Option<RawInput>,
    /// Set by the sensor manager when forwarding.
    pub source: Option<SensorTag>,
}

/// Consumer of sensor events.
pub type SensorEventHandler = Box<dyn FnMut(SensorEvent)>;

/// An input source that produces gestures.
pub trait Sensor {
    /// Unique name, used for registration.
    fn name(&self) -> &str;

    /// Arbitration priority. Higher wins.
    fn priority(&self) -> u32;

    /// Bind to `root` and start reporting to `handler`.
    ///
    /// Re-attaching detaches first.
    fn attach(&mut self, root: ElementId, handler: SensorEventHandler);

    /// Unbind. Cancels an active gesture first.
    fn detach(&mut self);

    fn enable(&mut self);

    /// Stop reacting to input. Cancels an active gesture first.
    fn disable(&mut self);

    fn is_enabled(&self) -> bool;

    /// Whether a gesture is active (past its activation constraint).
    fn is_active(&self) -> bool;

    fn is_attached(&self) -> bool;

    /// Whether this sensor would react to `input` kind at all.
    fn can_handle(&self, input: &RawInput) -> bool;

    /// Feed one raw input.
    fn handle_input(&mut self, input: &RawInput, tree: &dyn VisualTree);

    /// Channels currently armed.
    fn armed_listeners(&self) -> Listeners;

    /// Release everything. The sensor is unusable afterwards.
    fn destroy(&mut self) {
        self.detach();
    }
}

impl<S: Sensor + ?Sized> Sensor for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }
    fn priority(&self) -> u32 {
        (**self).priority()
    }
    fn attach(&mut self, root: ElementId, handler: SensorEventHandler) {
        (**self).attach(root, handler);
    }
    fn detach(&mut self) {
        (**self).detach();
    }
    fn enable(&mut self) {
        (**self).enable();
    }
    fn disable(&mut self) {
        (**self).disable();
    }
    fn is_enabled(&self) -> bool {
        (**self).is_enabled()
    }
    fn is_active(&self) -> bool {
        (**self).is_active()
    }
    fn is_attached(&self) -> bool {
        (**self).is_attached()
    }
    fn can_handle(&self, input: &RawInput) -> bool {
        (**self).can_handle(input)
    }
    fn handle_input(&mut self, input: &RawInput, tree: &dyn VisualTree) {
        (**self).handle_input(input, tree);
    }
    fn armed_listeners(&self) -> Listeners {
        (**self).armed_listeners()
    }
    fn destroy(&mut self) {
        (**self).destroy();
    }
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Attachment, enablement and listener state embedded by each sensor.
pub struct SensorCore {
    name: Rc<str>,
    priority: u32,
    root: Option<ElementId>,
    handler: Option<SensorEventHandler>,
    enabled: bool,
    listeners: ListenerSet,
}

impl fmt::Debug for SensorCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensorCore")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("root", &self.root)
            .field("attached", &self.handler.is_some())
            .field("enabled", &self.enabled)
            .field("armed", &self.listeners.armed())
            .finish()
    }
}

impl SensorCore {
    /// Create an enabled, detached core.
    #[must_use]
    pub fn new(name: impl Into<Rc<str>>, priority: u32, listeners: ListenerSet) -> Self {
        Self {
            name: name.into(),
            priority,
            root: None,
            handler: None,
            enabled: true,
            listeners,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn priority(&self) -> u32 {
        self.priority
    }

    #[must_use]
    pub const fn root(&self) -> Option<ElementId> {
        self.root
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub const fn is_attached(&self) -> bool {
        self.handler.is_some()
    }

    #[must_use]
    pub const fn armed(&self) -> Listeners {
        self.listeners.armed()
    }

    /// Channels this sensor ever listens on.
    #[must_use]
    pub const fn declared(&self) -> Listeners {
        self.listeners.declared()
    }

    pub fn attach(&mut self, root: ElementId, handler: SensorEventHandler) {
        self.root = Some(root);
        self.handler = Some(handler);
        if self.enabled {
            self.listeners.arm_root();
        }
        tracing::debug!(
            target: "dragforge.sensors",
            sensor = %self.name,
            root = root.get(),
            "sensor attached"
        );
    }

    pub fn detach(&mut self) {
        let was_attached = self.handler.take().is_some();
        self.root = None;
        self.listeners.disarm();
        if was_attached {
            tracing::debug!(target: "dragforge.sensors", sensor = %self.name, "sensor detached");
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if enabled && self.is_attached() {
            self.listeners.arm_root();
        } else if !enabled {
            self.listeners.disarm();
        }
    }

    /// Arm session listeners for a gesture in progress.
    pub fn begin_session(&mut self) {
        self.listeners.arm_session();
    }

    /// Drop session listeners, keeping root listeners if still attached.
    pub fn end_session(&mut self) {
        if self.enabled && self.is_attached() {
            self.listeners.arm_root();
        } else {
            self.listeners.disarm();
        }
    }

    /// Whether `input` arrives on an armed channel of an enabled, attached
    /// sensor.
    #[must_use]
    pub fn accepts(&self, input: &RawInput) -> bool {
        let accepted = self.enabled && self.is_attached() && self.listeners.accepts(&input.kind);
        if !accepted {
            tracing::trace!(
                target: "dragforge.sensors",
                sensor = %self.name,
                input = input.kind.as_str(),
                "input ignored: channel not armed"
            );
        }
        accepted
    }

    /// Whether `target` lies inside the attached root.
    #[must_use]
    pub fn in_root(&self, target: Option<ElementId>, tree: &dyn VisualTree) -> bool {
        match (self.root, target) {
            (Some(root), Some(target)) => tree.is_ancestor_or_self(root, target),
            _ => false,
        }
    }

    /// Deliver an event to the handler, if attached.
    pub fn emit(
        &mut self,
        kind: SensorEventKind,
        position: Point,
        target: Option<ElementId>,
        timestamp: Instant,
        raw: Option<&RawInput>,
    ) {
        let Some(target) = target.or(self.root) else {
            return;
        };
        let Some(handler) = self.handler.as_mut() else {
            return;
        };
        if kind == SensorEventKind::Start {
            tracing::debug!(
                target: "dragforge.sensors",
                sensor = %self.name,
                x = position.x,
                y = position.y,
                "gesture activated"
            );
        }
        handler(SensorEvent {
            kind,
            position,
            target,
            timestamp,
            raw: raw.cloned(),
            source: None,
        });
    }
}
