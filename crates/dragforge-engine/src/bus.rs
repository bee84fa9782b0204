#![forbid(unsafe_code)]

//! Typed publish/subscribe for [`DragEvent`]s.
//!
//! # Design
//!
//! Listeners are keyed by [`DragEventKind`] and called in registration
//! order. [`EventBus::on`] returns a [`ListenerHandle`] that is the only way
//! to remove the listener again. Cloning the bus shares the same listener
//! table.
//!
//! # Failure Modes
//!
//! - **Listener panic**: caught per listener and logged at ERROR with the
//!   listener id, event kind and panic message. Remaining listeners still
//!   run.
//! - **Re-entrant subscription**: listeners may call `on`/`off` on a clone
//!   of the bus. Changes take effect from the next `emit`.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use ahash::AHashMap;

use crate::event::{DragEvent, DragEventKind};

type Listener = Rc<dyn Fn(&DragEvent)>;

/// Disposer for a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle {
    kind: DragEventKind,
    id: u64,
}

impl ListenerHandle {
    #[must_use]
    pub const fn kind(&self) -> DragEventKind {
        self.kind
    }

    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Default)]
struct BusInner {
    next_id: u64,
    listeners: AHashMap<DragEventKind, Vec<(u64, Listener)>>,
}

/// Shared listener table.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Rc<RefCell<BusInner>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        let counts: Vec<(&str, usize)> = DragEventKind::ALL
            .iter()
            .map(|kind| {
                let count = inner.listeners.get(kind).map_or(0, Vec::len);
                (kind.as_str(), count)
            })
            .filter(|(_, count)| *count > 0)
            .collect();
        f.debug_struct("EventBus").field("listeners", &counts).finish()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one event kind.
    pub fn on(&self, kind: DragEventKind, listener: impl Fn(&DragEvent) + 'static) -> ListenerHandle {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner
            .listeners
            .entry(kind)
            .or_default()
            .push((id, Rc::new(listener)));
        ListenerHandle { kind, id }
    }

    /// Remove a listener. Returns `false` if it was already gone.
    pub fn off(&self, handle: ListenerHandle) -> bool {
        let mut inner = self.inner.borrow_mut();
        let Some(listeners) = inner.listeners.get_mut(&handle.kind) else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|(id, _)| *id != handle.id);
        let removed = listeners.len() != before;
        if listeners.is_empty() {
            inner.listeners.remove(&handle.kind);
        }
        removed
    }

    /// Number of listeners for `kind`.
    #[must_use]
    pub fn listener_count(&self, kind: DragEventKind) -> usize {
        self.inner
            .borrow()
            .listeners
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Remove every listener.
    pub fn clear(&self) {
        self.inner.borrow_mut().listeners.clear();
    }

    /// Deliver `event` to every listener of its kind.
    ///
    /// Returns the number of listeners that completed without panicking.
    pub fn emit(&self, event: &DragEvent) -> usize {
        let listeners: Vec<(u64, Listener)> = {
            let inner = self.inner.borrow();
            match inner.listeners.get(&event.kind) {
                Some(listeners) => listeners.clone(),
                None => return 0,
            }
        };

        let mut delivered = 0;
        for (id, listener) in listeners {
            match catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(()) => delivered += 1,
                Err(payload) => {
                    tracing::error!(
                        target: "dragforge.engine.bus",
                        listener_id = id,
                        event = event.kind.as_str(),
                        panic = %panic_message(payload.as_ref()),
                        "drag listener panicked"
                    );
                }
            }
        }
        delivered
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "<non-string panic payload>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dragforge_core::{DraggableId, Point};
    use std::cell::Cell;
    use web_time::Instant;

    fn event(kind: DragEventKind) -> DragEvent {
        DragEvent {
            kind,
            node: DraggableId::from("n"),
            node_data: None,
            position: Point::ZERO,
            delta: Point::ZERO,
            target: None,
            target_data: None,
            timestamp: Instant::now(),
            sensor: None,
        }
    }

    #[test]
    fn listeners_fire_in_registration_order() {
        let bus = EventBus::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for tag in 0..3 {
            let order = Rc::clone(&order);
            bus.on(DragEventKind::DragMove, move |_| order.borrow_mut().push(tag));
        }
        assert_eq!(bus.emit(&event(DragEventKind::DragMove)), 3);
        assert_eq!(bus.emit(&event(DragEventKind::Drop)), 0);
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn off_removes_exactly_one() {
        let bus = EventBus::new();
        let hits = Rc::new(Cell::new(0));
        let a = {
            let hits = Rc::clone(&hits);
            bus.on(DragEventKind::Drop, move |_| hits.set(hits.get() + 1))
        };
        let _b = {
            let hits = Rc::clone(&hits);
            bus.on(DragEventKind::Drop, move |_| hits.set(hits.get() + 10))
        };
        assert_eq!(bus.listener_count(DragEventKind::Drop), 2);
        assert!(bus.off(a));
        assert!(!bus.off(a));
        bus.emit(&event(DragEventKind::Drop));
        assert_eq!(hits.get(), 10);
        assert_eq!(bus.listener_count(DragEventKind::Drop), 1);
    }

    #[test]
    fn panicking_listener_does_not_stop_delivery() {
        let bus = EventBus::new();
        let reached = Rc::new(Cell::new(false));
        bus.on(DragEventKind::DragEnd, |_| panic!("listener failure"));
        {
            let reached = Rc::clone(&reached);
            bus.on(DragEventKind::DragEnd, move |_| reached.set(true));
        }
        assert_eq!(bus.emit(&event(DragEventKind::DragEnd)), 1);
        assert!(reached.get());
    }

    #[test]
    fn subscription_during_emit_applies_next_time() {
        let bus = EventBus::new();
        let late_hits = Rc::new(Cell::new(0));
        {
            let bus2 = bus.clone();
            let late_hits = Rc::clone(&late_hits);
            bus.on(DragEventKind::DragStart, move |_| {
                let late_hits = Rc::clone(&late_hits);
                bus2.on(DragEventKind::DragStart, move |_| late_hits.set(late_hits.get() + 1));
            });
        }
        bus.emit(&event(DragEventKind::DragStart));
        assert_eq!(late_hits.get(), 0);
        bus.emit(&event(DragEventKind::DragStart));
        assert_eq!(late_hits.get(), 1);
    }
}
