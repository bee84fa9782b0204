#![forbid(unsafe_code)]

//! Armed-listener bookkeeping.
//!
//! A sensor only reacts to a raw input while the matching channel is armed.
//! Root channels are armed while the sensor is attached and enabled; session
//! channels only between a press and the gesture's terminal transition.
//! Hosts and tests read [`Listeners`] to check that nothing stays armed.

use bitflags::bitflags;
use dragforge_core::RawInputKind;

bitflags! {
    /// Raw input channels a sensor listens on.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Listeners: u16 {
        const POINTER_DOWN  = 1 << 0;
        const POINTER_MOVE  = 1 << 1;
        const POINTER_UP    = 1 << 2;
        const POINTER_LEAVE = 1 << 3;
        const TOUCH_START   = 1 << 4;
        const TOUCH_MOVE    = 1 << 5;
        const TOUCH_END     = 1 << 6;
        const TOUCH_CANCEL  = 1 << 7;
        const KEY           = 1 << 8;
        const BLUR          = 1 << 9;
    }
}

impl Listeners {
    /// Channel a raw input arrives on.
    #[must_use]
    pub const fn channel(kind: &RawInputKind) -> Self {
        match kind {
            RawInputKind::PointerDown { .. } => Self::POINTER_DOWN,
            RawInputKind::PointerMove { .. } => Self::POINTER_MOVE,
            RawInputKind::PointerUp { .. } => Self::POINTER_UP,
            RawInputKind::PointerLeave => Self::POINTER_LEAVE,
            RawInputKind::TouchStart { .. } => Self::TOUCH_START,
            RawInputKind::TouchMove { .. } => Self::TOUCH_MOVE,
            RawInputKind::TouchEnd { .. } => Self::TOUCH_END,
            RawInputKind::TouchCancel => Self::TOUCH_CANCEL,
            RawInputKind::Key(_) => Self::KEY,
            RawInputKind::Blur => Self::BLUR,
        }
    }
}

/// Root and session channel sets of one sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListenerSet {
    root: Listeners,
    session: Listeners,
    armed: Listeners,
}

impl ListenerSet {
    /// Declare the channels armed at rest and during a gesture.
    #[must_use]
    pub const fn new(root: Listeners, session: Listeners) -> Self {
        Self {
            root,
            session,
            armed: Listeners::empty(),
        }
    }

    /// Currently armed channels.
    #[must_use]
    pub const fn armed(&self) -> Listeners {
        self.armed
    }

    /// Every channel the sensor may ever arm.
    #[must_use]
    pub const fn declared(&self) -> Listeners {
        self.root.union(self.session)
    }

    /// Arm the root channels only.
    pub fn arm_root(&mut self) {
        self.armed = self.root;
    }

    /// Arm the session channels on top of the root channels.
    pub fn arm_session(&mut self) {
        self.armed = self.root | self.session;
    }

    /// Disarm everything.
    pub fn disarm(&mut self) {
        self.armed = Listeners::empty();
    }

    /// Whether the channel for `kind` is armed.
    #[must_use]
    pub const fn accepts(&self, kind: &RawInputKind) -> bool {
        self.armed.intersects(Listeners::channel(kind))
    }

    /// Whether any session-only channel is armed.
    #[must_use]
    pub fn session_armed(&self) -> bool {
        self.armed.intersects(self.session.difference(self.root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_arming_cycle() {
        let mut set = ListenerSet::new(
            Listeners::POINTER_DOWN,
            Listeners::POINTER_MOVE | Listeners::POINTER_UP,
        );
        assert!(set.armed().is_empty());
        set.arm_root();
        assert!(!set.accepts(&RawInputKind::PointerLeave));
        assert!(!set.session_armed());
        set.arm_session();
        assert!(set.session_armed());
        assert!(set.accepts(&RawInputKind::PointerMove {
            position: dragforge_core::Point::ZERO,
            pointer_id: 1
        }));
        set.arm_root();
        assert_eq!(set.armed(), Listeners::POINTER_DOWN);
        set.disarm();
        assert!(set.armed().is_empty());
    }
}
