#![forbid(unsafe_code)]

//! Single-slot frame coalescing.
//!
//! High-frequency values scheduled between two render ticks collapse into
//! one: the latest value wins and is delivered at the next [`take`]. A value
//! is never dropped without being superseded or explicitly cancelled.
//!
//! [`take`]: FrameCoalescer::take

/// Holds at most one pending value until the next tick.
#[derive(Debug, Clone)]
pub struct FrameCoalescer<T> {
    pending: Option<T>,
    superseded: u64,
}

impl<T> Default for FrameCoalescer<T> {
    fn default() -> Self {
        Self {
            pending: None,
            superseded: 0,
        }
    }
}

impl<T> FrameCoalescer<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` for the next tick. Returns `true` if it replaced a
    /// value that was still pending.
    pub fn schedule(&mut self, value: T) -> bool {
        let replaced = self.pending.replace(value).is_some();
        if replaced {
            self.superseded += 1;
        }
        replaced
    }

    /// Take the pending value, if any.
    pub fn take(&mut self) -> Option<T> {
        self.pending.take()
    }

    /// Discard the pending value. Returns `true` if there was one.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    #[must_use]
    pub const fn pending(&self) -> Option<&T> {
        self.pending.as_ref()
    }

    /// Values replaced before delivery since creation.
    #[must_use]
    pub const fn superseded(&self) -> u64 {
        self.superseded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_write_wins() {
        let mut c = FrameCoalescer::new();
        assert!(!c.schedule(1));
        assert!(c.schedule(2));
        assert!(c.schedule(3));
        assert_eq!(c.superseded(), 2);
        assert_eq!(c.take(), Some(3));
        assert_eq!(c.take(), None);
    }

    #[test]
    fn cancel_discards() {
        let mut c = FrameCoalescer::new();
        assert!(!c.cancel());
        c.schedule("move");
        assert!(c.is_pending());
        assert!(c.cancel());
        assert!(!c.is_pending());
        assert_eq!(c.pending(), None);
    }
}
