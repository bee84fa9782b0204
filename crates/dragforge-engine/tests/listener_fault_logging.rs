#![forbid(unsafe_code)]

//! Log output of the drag engine.
//!
//! - A panicking listener is an ERROR on `dragforge.engine.bus` with the
//!   listener id, event name and panic message. Later listeners still run
//!   and the drag completes.
//! - Drag lifecycle transitions are DEBUG on `dragforge.engine`.
//! - Ignored operations are TRACE, never WARN.
//!
//! Run:
//!   cargo test -p dragforge-engine --test listener_fault_logging

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use dragforge_core::{ElementTree, Point, Rect};
use dragforge_engine::{DragEngine, DragEventKind, DraggableNode, DropTarget, EngineConfig};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use web_time::Instant;

// ============================================================================
// Test Infrastructure
// ============================================================================

#[derive(Debug, Clone)]
struct CapturedEvent {
    level: tracing::Level,
    target: String,
    fields: HashMap<String, String>,
    message: Option<String>,
}

impl CapturedEvent {
    fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

impl<S> tracing_subscriber::Layer<S> for EventCapture
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        let fields: HashMap<String, String> = visitor.0.into_iter().collect();
        let message = fields.get("message").cloned();
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            fields,
            message,
        });
    }
}

fn with_captured_events<F>(f: F) -> Vec<CapturedEvent>
where
    F: FnOnce(),
{
    let events = Arc::new(Mutex::new(Vec::new()));
    let layer = EventCapture {
        events: Arc::clone(&events),
    };
    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::filter::LevelFilter::TRACE)
        .with(layer);
    tracing::subscriber::with_default(subscriber, f);
    let captured = events.lock().unwrap().clone();
    captured
}

fn messages_at(events: &[CapturedEvent], level: tracing::Level, target: &str) -> Vec<String> {
    events
        .iter()
        .filter(|e| e.level == level && e.target == target)
        .filter_map(|e| e.message.clone())
        .collect()
}

fn engine() -> DragEngine {
    let mut tree = ElementTree::default();
    let root = tree.create(None, Some(Rect::new(0.0, 0.0, 800.0, 600.0)));
    let card = tree.create(Some(root), Some(Rect::new(0.0, 0.0, 40.0, 40.0)));
    let lane = tree.create(Some(root), Some(Rect::new(100.0, 0.0, 100.0, 100.0)));
    let mut config = EngineConfig::default();
    config.collision.throttle_ms = 0;
    let mut engine = DragEngine::builder(tree, root)
        .config(config)
        .build()
        .expect("default config is valid");
    engine.register_draggable(DraggableNode::new("card", card));
    engine.register_drop_target(DropTarget::new("lane", lane));
    engine
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn panicking_listener_is_logged_and_contained() {
    let completed = Rc::new(Cell::new(false));
    let events = with_captured_events(|| {
        let mut engine = engine();
        engine.on(DragEventKind::Drop, |_| panic!("host blew up"));
        {
            let completed = Rc::clone(&completed);
            engine.on(DragEventKind::DragEnd, move |_| completed.set(true));
        }
        let now = Instant::now();
        engine.start_drag("card", Point::new(20.0, 20.0), now);
        engine.move_drag(Point::new(140.0, 40.0), now);
        assert!(engine.end_drag(now));
        assert!(!engine.is_dragging());
    });

    assert!(completed.get(), "dragend must still be delivered");
    let errors: Vec<&CapturedEvent> = events
        .iter()
        .filter(|e| e.level == tracing::Level::ERROR)
        .collect();
    assert_eq!(errors.len(), 1, "{events:#?}");
    let error = errors[0];
    assert_eq!(error.target, "dragforge.engine.bus");
    assert_eq!(error.field("event"), Some("drop"));
    assert_eq!(error.field("panic"), Some("host blew up"));
    assert!(error.field("listener_id").is_some());
    assert_eq!(error.message.as_deref(), Some("drag listener panicked"));
}

#[test]
fn lifecycle_is_debug() {
    let events = with_captured_events(|| {
        let mut engine = engine();
        engine.start_drag("card", Point::new(20.0, 20.0), Instant::now());
        engine.cancel_drag();
        engine.destroy();
    });

    let debug = messages_at(&events, tracing::Level::DEBUG, "dragforge.engine");
    for expected in [
        "drag engine created",
        "draggable registered",
        "drop target registered",
        "drag started",
        "drag cancelled",
        "drag engine destroyed",
    ] {
        assert!(debug.iter().any(|m| m == expected), "missing {expected:?} in {debug:?}");
    }
    let started = events
        .iter()
        .find(|e| e.message.as_deref() == Some("drag started"))
        .expect("drag started logged");
    assert_eq!(started.field("node"), Some("card"));
    assert_eq!(started.field("sensor"), Some("api"));
}

#[test]
fn ignored_operations_are_trace_only() {
    let events = with_captured_events(|| {
        let mut engine = engine();
        let now = Instant::now();
        engine.move_drag(Point::new(10.0, 10.0), now);
        assert!(!engine.end_drag(now));
        assert!(!engine.cancel_drag());
        assert!(!engine.start_drag("missing", Point::ZERO, now));
        engine.start_drag("card", Point::ZERO, now);
        assert!(!engine.start_drag("card", Point::ZERO, now));
    });

    assert!(
        events
            .iter()
            .all(|e| e.level != tracing::Level::WARN && e.level != tracing::Level::ERROR),
        "{events:#?}"
    );
    let trace = messages_at(&events, tracing::Level::TRACE, "dragforge.engine");
    for expected in [
        "move ignored: no drag in progress",
        "end ignored: no drag in progress",
        "cancel ignored: no drag in progress",
        "drag start ignored: unknown draggable",
        "drag start ignored: drag in progress",
    ] {
        assert!(trace.iter().any(|m| m == expected), "missing {expected:?} in {trace:?}");
    }
}

#[test]
fn listener_subscribed_during_emit_sees_next_session_only() {
    let mut engine = engine();
    let late = Rc::new(RefCell::new(Vec::new()));
    {
        let bus = engine.bus();
        let late = Rc::clone(&late);
        engine.on(DragEventKind::DragStart, move |_| {
            let late = Rc::clone(&late);
            bus.on(DragEventKind::DragStart, move |e| late.borrow_mut().push(e.node.to_string()));
        });
    }
    let now = Instant::now();
    engine.start_drag("card", Point::ZERO, now);
    engine.cancel_drag();
    assert!(late.borrow().is_empty());
    engine.start_drag("card", Point::ZERO, now);
    assert_eq!(*late.borrow(), ["card"]);
}
