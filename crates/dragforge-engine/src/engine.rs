#![forbid(unsafe_code)]

//! The drag state machine.
//!
//! [`DragEngine`] owns the registries, the sensor manager, the collision
//! detector and the event bus. Hosts feed it raw input and call
//! [`DragEngine::tick`] once per rendered frame.
//!
//! # State machine
//!
//! ```text
//!   Idle ──start──▶ Dragging ──end──▶ Idle      (drop? then dragend)
//!                     │  ▲
//!                     │  └─ move: constrain, detect, leave/enter, dragmove
//!                     └──cancel──▶ Idle        (dragcancel only)
//! ```
//!
//! # Invariants
//!
//! 1. A session is `dragstart (dragleave | dragenter | dragmove)* drop?
//!    (dragend | dragcancel)`. At most one start and one terminal event.
//! 2. `dragleave` for the old target always precedes `dragenter` for the
//!    new one.
//! 3. `dragmove` is coalesced: at most one is delivered per tick, carrying
//!    the latest position. A pending move is flushed before `drop`/`dragend`
//!    and discarded by a cancel.
//! 4. A start while dragging is ignored, never queued.
//!
//! # Failure Modes
//!
//! - **Start on an unregistered or disabled element**: ignored at TRACE.
//! - **Listener panic**: contained by the bus; the state machine continues.
//! - **Engine used after `destroy`**: every operation is a no-op.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use dragforge_collision::{
    CollisionContext, CollisionDetector, CollisionResult, CollisionStrategy,
};
use dragforge_core::{
    DraggableId, DropTargetId, ElementId, ElementTree, Point, RawInput, Rect, VisualTree,
};
use dragforge_sensors::{
    KeyboardSensor, PointerSensor, Sensor, SensorEvent, SensorEventKind, SensorManager,
    SensorRegistration, TouchSensor,
};
use web_time::Instant;

use crate::bus::{EventBus, ListenerHandle};
use crate::coalesce::FrameCoalescer;
use crate::config::{ConfigError, EngineConfig};
use crate::constraints::ConstraintContext;
use crate::event::{DragEvent, DragEventKind};
use crate::registry::{DraggableNode, DropTarget, Registry};
use crate::session::{DragSession, DragState};

type SensorQueue = Rc<RefCell<VecDeque<SensorEvent>>>;

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Configures and builds a [`DragEngine`].
pub struct DragEngineBuilder<T: VisualTree = ElementTree> {
    tree: T,
    root: ElementId,
    config: EngineConfig,
    strategy: Option<Box<dyn CollisionStrategy>>,
    sensors: Vec<Box<dyn Sensor>>,
    default_sensors: bool,
}

impl<T: VisualTree> DragEngineBuilder<T> {
    #[must_use]
    pub fn new(tree: T, root: ElementId) -> Self {
        Self {
            tree,
            root,
            config: EngineConfig::default(),
            strategy: None,
            sensors: Vec::new(),
            default_sensors: true,
        }
    }

    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a custom collision strategy instead of the configured one.
    #[must_use]
    pub fn collision_strategy(mut self, strategy: Box<dyn CollisionStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Register an extra sensor after the built-in ones.
    #[must_use]
    pub fn sensor(mut self, sensor: Box<dyn Sensor>) -> Self {
        self.sensors.push(sensor);
        self
    }

    /// Skip the pointer, touch and keyboard sensors from the config.
    #[must_use]
    pub fn without_default_sensors(mut self) -> Self {
        self.default_sensors = false;
        self
    }

    /// Validate the config, register sensors and attach them to the root.
    pub fn build(self) -> Result<DragEngine<T>, ConfigError> {
        let errors = self.config.validate();
        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }
        let config = self.config;

        let mut sensors = SensorManager::new(config.manager_options());
        if self.default_sensors {
            if config.pointer.enabled {
                let pointer = PointerSensor::with_options(config.pointer_options())
                    .map_err(|e| ConfigError::Validation(vec![format!("pointer: {e}")]))?;
                let _ = sensors.register(Box::new(pointer));
            }
            if config.touch.enabled {
                let touch = TouchSensor::with_options(config.touch_options())
                    .map_err(|e| ConfigError::Validation(vec![format!("touch: {e}")]))?;
                let _ = sensors.register(Box::new(touch));
            }
            if config.keyboard.enabled {
                let keyboard = KeyboardSensor::with_options(config.keyboard_options());
                let _ = sensors.register(Box::new(keyboard));
            }
        }
        for sensor in self.sensors {
            let _ = sensors.register(sensor);
        }

        let detector = match self.strategy {
            Some(strategy) => CollisionDetector::with_strategy(config.detector_options(), strategy),
            None => CollisionDetector::new(config.detector_options()),
        };

        let queue: SensorQueue = Rc::default();
        let sink = Rc::clone(&queue);
        sensors.attach(
            self.root,
            Box::new(move |event| sink.borrow_mut().push_back(event)),
        );

        tracing::debug!(
            target: "dragforge.engine",
            root = self.root.get(),
            sensors = sensors.len(),
            strategy = detector.strategy_name(),
            "drag engine created"
        );

        let mut engine = DragEngine {
            tree: self.tree,
            root: self.root,
            config,
            registry: Registry::new(),
            sensors,
            queue,
            detector,
            bus: EventBus::new(),
            pending_move: FrameCoalescer::new(),
            session: None,
            enabled: true,
            destroyed: false,
        };
        // Attaching can already have produced events.
        engine.drain_sensor_events();
        Ok(engine)
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Drag state machine over a host visual tree.
pub struct DragEngine<T: VisualTree = ElementTree> {
    tree: T,
    root: ElementId,
    config: EngineConfig,
    registry: Registry,
    sensors: SensorManager,
    queue: SensorQueue,
    detector: CollisionDetector,
    bus: EventBus,
    pending_move: FrameCoalescer<DragEvent>,
    session: Option<DragSession>,
    enabled: bool,
    destroyed: bool,
}

impl<T: VisualTree> fmt::Debug for DragEngine<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DragEngine")
            .field("root", &self.root)
            .field("registry", &self.registry)
            .field("sensors", &self.sensors)
            .field("detector", &self.detector)
            .field("bus", &self.bus)
            .field("session", &self.session)
            .field("enabled", &self.enabled)
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}

impl<T: VisualTree> DragEngine<T> {
    /// Start configuring an engine over `tree`, rooted at `root`.
    #[must_use]
    pub fn builder(tree: T, root: ElementId) -> DragEngineBuilder<T> {
        DragEngineBuilder::new(tree, root)
    }

    /// Engine with the default config.
    pub fn new(tree: T, root: ElementId) -> Result<Self, ConfigError> {
        DragEngineBuilder::new(tree, root).build()
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    /// Offer a raw host event to the sensors and run the resulting gesture
    /// events through the state machine.
    pub fn handle_input(&mut self, input: &RawInput) {
        if self.destroyed {
            return;
        }
        self.sensors.handle_input(input, &self.tree);
        self.drain_sensor_events();
    }

    /// Deliver the coalesced `dragmove`, if one is pending. Call once per
    /// rendered frame. Returns `true` if an event was delivered.
    ///
    /// If the last detection was throttled, detection runs again first so
    /// the delivered move names the target under the settled pointer.
    pub fn tick(&mut self) -> bool {
        if self.detector.is_stale()
            && let Some(timestamp) = self.pending_move.pending().map(|event| event.timestamp)
        {
            self.update_target(timestamp, true);
            self.retarget_pending_move();
        }
        match self.pending_move.take() {
            Some(event) => {
                self.bus.emit(&event);
                true
            }
            None => false,
        }
    }

    fn drain_sensor_events(&mut self) {
        loop {
            let next = self.queue.borrow_mut().pop_front();
            let Some(event) = next else {
                break;
            };
            self.on_sensor_event(event);
        }
    }

    fn on_sensor_event(&mut self, event: SensorEvent) {
        let sensor = event.source.as_ref().map(|tag| Rc::clone(&tag.name));
        if event.kind != SensorEventKind::Start
            && let Some(session) = &self.session
            && let (Some(owner), Some(sender)) = (&session.sensor, &sensor)
            && owner != sender
        {
            tracing::trace!(
                target: "dragforge.engine",
                sensor = %sender,
                owner = %owner,
                kind = event.kind.as_str(),
                "sensor event ignored: sensor does not own the drag"
            );
            return;
        }

        match event.kind {
            SensorEventKind::Start => {
                self.begin_from_element(event.target, event.position, event.timestamp, sensor);
            }
            SensorEventKind::Move => self.move_to(event.position, event.timestamp),
            SensorEventKind::End => {
                self.finish(event.timestamp);
            }
            SensorEventKind::Cancel => {
                self.abort(event.timestamp);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    fn begin_from_element(
        &mut self,
        element: ElementId,
        position: Point,
        timestamp: Instant,
        sensor: Option<Rc<str>>,
    ) -> bool {
        let Some(node) = self.registry.draggable_for_element(element, &self.tree) else {
            tracing::trace!(
                target: "dragforge.engine",
                element = element.get(),
                "drag start ignored: no draggable at element"
            );
            return false;
        };
        let id = node.id.clone();
        self.begin(&id, position, timestamp, sensor)
    }

    fn begin(
        &mut self,
        id: &DraggableId,
        position: Point,
        timestamp: Instant,
        sensor: Option<Rc<str>>,
    ) -> bool {
        if self.destroyed || !self.enabled {
            tracing::trace!(target: "dragforge.engine", node = %id, "drag start ignored: engine disabled");
            return false;
        }
        if self.session.is_some() {
            tracing::trace!(target: "dragforge.engine", node = %id, "drag start ignored: drag in progress");
            return false;
        }
        let Some(node) = self.registry.draggable(id) else {
            tracing::trace!(target: "dragforge.engine", node = %id, "drag start ignored: unknown draggable");
            return false;
        };
        if node.disabled {
            tracing::trace!(target: "dragforge.engine", node = %id, "drag start ignored: draggable disabled");
            return false;
        }

        let element = node.element;
        let origin_rect = self.tree.bounds(element).unwrap_or_else(|| {
            Rect::from_center(
                position,
                self.config.fallback_drag_width,
                self.config.fallback_drag_height,
            )
        });
        self.detector.clear_cache();
        self.pending_move.cancel();

        let session = DragSession::new(id.clone(), element, position, timestamp, sensor, origin_rect);
        tracing::debug!(
            target: "dragforge.engine",
            node = %id,
            sensor = session.sensor.as_deref().unwrap_or("api"),
            x = position.x,
            y = position.y,
            "drag started"
        );
        let event = self.build_event(&session, DragEventKind::DragStart, None, timestamp);
        self.session = Some(session);
        self.bus.emit(&event);
        true
    }

    fn move_to(&mut self, raw: Point, timestamp: Instant) {
        let Some(session) = &self.session else {
            tracing::trace!(target: "dragforge.engine", "move ignored: no drag in progress");
            return;
        };
        let position = match self.registry.draggable(&session.node) {
            Some(node) => {
                let context = ConstraintContext {
                    node,
                    initial: session.initial,
                };
                node.constraints
                    .iter()
                    .fold(raw, |position, constraint| constraint.apply(position, &context))
            }
            None => raw,
        };

        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.move_to(position);
        self.update_target(timestamp, false);

        if let Some(session) = &self.session {
            let event = self.build_event(
                session,
                DragEventKind::DragMove,
                session.target.clone(),
                timestamp,
            );
            if self.pending_move.schedule(event) {
                tracing::trace!(target: "dragforge.engine", "pending dragmove superseded");
            }
        }
    }

    /// Detect the best target under the current drag rect and emit
    /// `dragleave`/`dragenter` if it changed. `force` bypasses the throttle.
    fn update_target(&mut self, timestamp: Instant, force: bool) {
        let Some(session) = &self.session else {
            return;
        };
        let position = session.position;
        let drag_rect = session.drag_rect;
        let previous = session.target.clone();

        let candidates = self.registry.candidates(&self.tree);
        let context = CollisionContext {
            position,
            drag_rect,
            viewport: self.tree.viewport(),
            tree: &self.tree,
        };
        let results = if force {
            self.detector.detect_now(&context, &candidates, timestamp)
        } else {
            self.detector.detect(&context, &candidates, timestamp)
        };
        let best = results.first().map(|result| result.target.clone());

        if best != previous {
            if let Some(old) = previous {
                self.set_target(None);
                self.emit_with_target(DragEventKind::DragLeave, Some(old), timestamp);
            }
            if let Some(new) = best {
                self.set_target(Some(new.clone()));
                self.emit_with_target(DragEventKind::DragEnter, Some(new), timestamp);
            }
        }
    }

    /// Point the pending `dragmove` at the session's current target.
    fn retarget_pending_move(&mut self) {
        let Some(mut event) = self.pending_move.take() else {
            return;
        };
        if let Some(session) = &self.session {
            event.target_data = session
                .target
                .as_ref()
                .and_then(|id| self.registry.target(id))
                .and_then(|target| target.data.clone());
            event.target = session.target.clone();
        }
        self.pending_move.schedule(event);
    }

    fn finish(&mut self, timestamp: Instant) -> bool {
        if self.session.is_none() {
            tracing::trace!(target: "dragforge.engine", "end ignored: no drag in progress");
            return false;
        }
        self.update_target(timestamp, true);
        self.retarget_pending_move();
        self.tick();
        let Some(session) = self.session.take() else {
            return false;
        };
        self.detector.clear_cache();

        if let Some(target) = &session.target {
            let dropped = self.build_event(&session, DragEventKind::Drop, Some(target.clone()), timestamp);
            self.bus.emit(&dropped);
        }
        tracing::debug!(
            target: "dragforge.engine",
            node = %session.node,
            dropped_on = session.target.as_ref().map_or("none", DropTargetId::as_str),
            "drag ended"
        );
        let end = self.build_event(&session, DragEventKind::DragEnd, session.target.clone(), timestamp);
        self.bus.emit(&end);
        true
    }

    fn abort(&mut self, timestamp: Instant) -> bool {
        let Some(session) = self.session.take() else {
            tracing::trace!(target: "dragforge.engine", "cancel ignored: no drag in progress");
            return false;
        };
        if self.pending_move.cancel() {
            tracing::trace!(target: "dragforge.engine", "pending dragmove discarded");
        }
        self.detector.clear_cache();
        tracing::debug!(target: "dragforge.engine", node = %session.node, "drag cancelled");
        let event = self.build_event(&session, DragEventKind::DragCancel, session.target.clone(), timestamp);
        self.bus.emit(&event);
        true
    }

    fn set_target(&mut self, target: Option<DropTargetId>) {
        if let Some(session) = self.session.as_mut() {
            session.target = target;
        }
    }

    fn emit_with_target(&self, kind: DragEventKind, target: Option<DropTargetId>, timestamp: Instant) {
        if let Some(session) = &self.session {
            let event = self.build_event(session, kind, target, timestamp);
            self.bus.emit(&event);
        }
    }

    fn build_event(
        &self,
        session: &DragSession,
        kind: DragEventKind,
        target: Option<DropTargetId>,
        timestamp: Instant,
    ) -> DragEvent {
        let node_data = self
            .registry
            .draggable(&session.node)
            .and_then(|node| node.data.clone());
        let target_data = target
            .as_ref()
            .and_then(|id| self.registry.target(id))
            .and_then(|target| target.data.clone());
        DragEvent {
            kind,
            node: session.node.clone(),
            node_data,
            position: session.position,
            delta: session.delta,
            target,
            target_data,
            timestamp,
            sensor: session.sensor.clone(),
        }
    }

    // -----------------------------------------------------------------------
    // Programmatic control
    // -----------------------------------------------------------------------

    /// Start dragging `id` without a sensor. Same rules as a sensor start.
    pub fn start_drag(&mut self, id: impl Into<DraggableId>, position: Point, timestamp: Instant) -> bool {
        let id = id.into();
        self.begin(&id, position, timestamp, None)
    }

    /// Move the current drag as if a sensor had reported `position`.
    pub fn move_drag(&mut self, position: Point, timestamp: Instant) {
        if !self.destroyed {
            self.move_to(position, timestamp);
        }
    }

    /// End the current drag, dropping on the hovered target if any.
    pub fn end_drag(&mut self, timestamp: Instant) -> bool {
        !self.destroyed && self.finish(timestamp)
    }

    /// Cancel the current drag. Returns `false` if there was none.
    pub fn cancel_drag(&mut self) -> bool {
        self.abort(Instant::now())
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Register or replace a draggable.
    pub fn register_draggable(&mut self, node: DraggableNode) {
        if self.destroyed {
            return;
        }
        tracing::debug!(
            target: "dragforge.engine",
            node = %node.id,
            element = node.element.get(),
            "draggable registered"
        );
        self.registry.insert_draggable(node);
    }

    /// Remove a draggable. A drag of that node is cancelled first.
    pub fn unregister_draggable(&mut self, id: &DraggableId) -> bool {
        if self.session.as_ref().is_some_and(|session| &session.node == id) {
            self.abort(Instant::now());
        }
        let removed = self.registry.remove_draggable(id).is_some();
        if removed {
            tracing::debug!(target: "dragforge.engine", node = %id, "draggable unregistered");
        }
        removed
    }

    /// Register or replace a drop target.
    pub fn register_drop_target(&mut self, target: DropTarget) {
        if self.destroyed {
            return;
        }
        tracing::debug!(
            target: "dragforge.engine",
            drop_target = %target.id,
            element = target.element.get(),
            "drop target registered"
        );
        self.registry.insert_target(target);
        self.detector.clear_cache();
    }

    /// Remove a drop target. If the drag is over it, `dragleave` is emitted
    /// right away and the drag continues without a target.
    pub fn unregister_drop_target(&mut self, id: &DropTargetId) -> bool {
        if self
            .session
            .as_ref()
            .is_some_and(|session| session.target.as_ref() == Some(id))
        {
            self.set_target(None);
            self.emit_with_target(DragEventKind::DragLeave, Some(id.clone()), Instant::now());
            self.retarget_pending_move();
        }
        let removed = self.registry.remove_target(id).is_some();
        self.detector.clear_cache();
        if removed {
            tracing::debug!(target: "dragforge.engine", drop_target = %id, "drop target unregistered");
        }
        removed
    }

    /// Add a sensor at runtime.
    pub fn register_sensor(&mut self, sensor: Box<dyn Sensor>) -> SensorRegistration {
        if self.destroyed {
            return SensorRegistration::INERT;
        }
        let registration = self.sensors.register(sensor);
        self.drain_sensor_events();
        registration
    }

    /// Remove a sensor at runtime. A drag it drives is cancelled.
    pub fn unregister_sensor(&mut self, name: &str) -> bool {
        let removed = self.sensors.unregister(name);
        self.drain_sensor_events();
        removed
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    pub fn enable(&mut self) {
        if !self.destroyed && !self.enabled {
            self.enabled = true;
            tracing::debug!(target: "dragforge.engine", "drag engine enabled");
        }
    }

    /// Stop accepting new drags. A drag in progress is cancelled.
    pub fn disable(&mut self) {
        if !self.enabled {
            return;
        }
        self.abort(Instant::now());
        self.enabled = false;
        tracing::debug!(target: "dragforge.engine", "drag engine disabled");
    }

    /// Cancel any drag, release every sensor and listener and forget all
    /// registrations. The engine is inert afterwards.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.abort(Instant::now());
        self.sensors.destroy();
        self.queue.borrow_mut().clear();
        self.pending_move.cancel();
        self.bus.clear();
        self.registry.clear();
        self.detector.clear_cache();
        self.enabled = false;
        self.destroyed = true;
        tracing::debug!(target: "dragforge.engine", "drag engine destroyed");
    }

    // -----------------------------------------------------------------------
    // Listeners
    // -----------------------------------------------------------------------

    /// Subscribe to one event kind. Keep the handle to unsubscribe.
    pub fn on(&self, kind: DragEventKind, listener: impl Fn(&DragEvent) + 'static) -> ListenerHandle {
        self.bus.on(kind, listener)
    }

    pub fn off(&self, handle: ListenerHandle) -> bool {
        self.bus.off(handle)
    }

    #[must_use]
    pub fn listener_count(&self, kind: DragEventKind) -> usize {
        self.bus.listener_count(kind)
    }

    /// A clone of the bus, sharing the same listener table.
    #[must_use]
    pub fn bus(&self) -> EventBus {
        self.bus.clone()
    }

    // -----------------------------------------------------------------------
    // Collision
    // -----------------------------------------------------------------------

    /// Replace the collision strategy.
    pub fn set_collision_strategy(&mut self, strategy: Box<dyn CollisionStrategy>) {
        self.detector.set_strategy(strategy);
    }

    /// Go back to the strategy described by the config.
    pub fn reset_collision_strategy(&mut self) {
        self.detector.reset_strategy();
    }

    #[must_use]
    pub fn collision_strategy_name(&self) -> &str {
        self.detector.strategy_name()
    }

    /// Highest-ranked result of the last detection while dragging.
    #[must_use]
    pub fn best_target(&self) -> Option<&CollisionResult> {
        self.session.as_ref()?;
        self.detector.best_target()
    }

    /// Every result of the last detection while dragging.
    #[must_use]
    pub fn collisions(&self) -> &[CollisionResult] {
        if self.session.is_some() {
            self.detector.last_results()
        } else {
            &[]
        }
    }

    /// Current dragged rectangle.
    #[must_use]
    pub fn drag_rect(&self) -> Option<Rect> {
        self.session.as_ref().map(|session| session.drag_rect)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn drag_state(&self) -> DragState {
        self.session
            .as_ref()
            .map_or_else(DragState::default, DragSession::snapshot)
    }

    #[must_use]
    pub const fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub const fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// A `dragmove` is waiting for the next tick.
    #[must_use]
    pub const fn has_pending_move(&self) -> bool {
        self.pending_move.is_pending()
    }

    #[must_use]
    pub const fn root(&self) -> ElementId {
        self.root
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub const fn sensors(&self) -> &SensorManager {
        &self.sensors
    }

    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub const fn tree(&self) -> &T {
        &self.tree
    }

    /// Mutable access to the tree. Cached target rectangles are refreshed
    /// before the next detection.
    pub fn tree_mut(&mut self) -> &mut T {
        self.registry.invalidate_rects();
        &mut self.tree
    }

    /// Re-read target rectangles before the next detection.
    pub fn invalidate_layout(&mut self) {
        self.registry.invalidate_rects();
        self.detector.clear_cache();
    }
}

impl<T: VisualTree> Drop for DragEngine<T> {
    fn drop(&mut self) {
        self.destroy();
    }
}
