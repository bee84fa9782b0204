#![forbid(unsafe_code)]

//! Throttled collision detection with a last-result cache.
//!
//! The detector composes a strategy from [`CollisionDetectorOptions`] (or
//! accepts a custom one) and runs it at most once per throttle window.
//! Calls that land inside the window return the cached results unchanged.
//!
//! # Invariants
//!
//! - The throttle is measured on the caller-supplied timestamps, never on a
//!   wall clock, so detection is deterministic under test.
//! - [`CollisionDetector::last_results`] always returns what the most recent
//!   [`detect`](CollisionDetector::detect) returned.
//! - Built-in composition order is grid snap, nested containers, then the
//!   base strategy. A single strategy is used directly, more are wrapped in
//!   [`Composite`].

use std::time::Duration;

use web_time::Instant;

use crate::quadtree::QuadTreeConfig;
use crate::strategies::{
    ClosestCenter, ClosestCorners, Composite, DEFAULT_DISTANCE_CUTOFF, DEFAULT_INDEX_THRESHOLD,
    GridSnap, GridSnapOptions, NestedContainer, NestedContainerOptions, PointerWithin,
    RectIntersection,
};
use crate::strategy::{CollisionCandidate, CollisionContext, CollisionResult, CollisionStrategy};

/// Base strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StrategyKind {
    #[default]
    RectIntersection,
    ClosestCenter,
    ClosestCorners,
    PointerWithin,
}

impl StrategyKind {
    /// Stable name matching [`CollisionStrategy::name`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RectIntersection => "rectIntersection",
            Self::ClosestCenter => "closestCenter",
            Self::ClosestCorners => "closestCorners",
            Self::PointerWithin => "pointerWithin",
        }
    }
}

/// Detector configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionDetectorOptions {
    pub strategy: StrategyKind,
    pub grid_snap: Option<GridSnapOptions>,
    pub nested_containers: Option<NestedContainerOptions>,
    /// Minimum spacing between two real detections.
    pub throttle: Duration,
    /// Candidate count above which rect intersection uses the quadtree.
    pub index_threshold: usize,
    pub quadtree: QuadTreeConfig,
    /// Cutoff for the distance strategies.
    pub distance_cutoff: f64,
}

impl Default for CollisionDetectorOptions {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::RectIntersection,
            grid_snap: None,
            nested_containers: None,
            throttle: Duration::from_millis(16),
            index_threshold: DEFAULT_INDEX_THRESHOLD,
            quadtree: QuadTreeConfig::default(),
            distance_cutoff: DEFAULT_DISTANCE_CUTOFF,
        }
    }
}

impl CollisionDetectorOptions {
    /// Compose the strategy these options describe.
    #[must_use]
    pub fn build_strategy(&self) -> Box<dyn CollisionStrategy> {
        let rect = || RectIntersection::with_index(self.index_threshold, self.quadtree);

        let base: Box<dyn CollisionStrategy> = match self.strategy {
            StrategyKind::RectIntersection => Box::new(rect()),
            StrategyKind::ClosestCenter => Box::new(ClosestCenter::with_cutoff(self.distance_cutoff)),
            StrategyKind::ClosestCorners => {
                Box::new(ClosestCorners::with_cutoff(self.distance_cutoff))
            }
            StrategyKind::PointerWithin => Box::new(PointerWithin),
        };

        let mut layers: Vec<Box<dyn CollisionStrategy>> = Vec::new();
        if let Some(grid) = self.grid_snap.filter(|g| g.enabled) {
            layers.push(Box::new(GridSnap::new(grid).with_inner(rect())));
        }
        if let Some(nested) = self.nested_containers.filter(|n| n.enabled) {
            layers.push(Box::new(NestedContainer::new(nested)));
        }

        if layers.is_empty() {
            base
        } else {
            layers.push(base);
            Box::new(Composite::new(layers))
        }
    }
}

/// Strategy host with throttling and a result cache.
pub struct CollisionDetector {
    options: CollisionDetectorOptions,
    strategy: Box<dyn CollisionStrategy>,
    custom: bool,
    last_detection: Option<Instant>,
    cached: Vec<CollisionResult>,
    /// A throttled call was answered from the cache since the last real run.
    stale: bool,
}

impl std::fmt::Debug for CollisionDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollisionDetector")
            .field("strategy", &self.strategy.name())
            .field("custom", &self.custom)
            .field("options", &self.options)
            .field("cached", &self.cached.len())
            .finish()
    }
}

impl Default for CollisionDetector {
    fn default() -> Self {
        Self::new(CollisionDetectorOptions::default())
    }
}

impl CollisionDetector {
    /// Build a detector from options.
    #[must_use]
    pub fn new(options: CollisionDetectorOptions) -> Self {
        let strategy = options.build_strategy();
        Self {
            options,
            strategy,
            custom: false,
            last_detection: None,
            cached: Vec::new(),
            stale: false,
        }
    }

    /// Build a detector around a custom strategy.
    ///
    /// Option changes keep the custom strategy; only the throttle applies.
    #[must_use]
    pub fn with_strategy(
        options: CollisionDetectorOptions,
        strategy: Box<dyn CollisionStrategy>,
    ) -> Self {
        Self {
            options,
            strategy,
            custom: true,
            last_detection: None,
            cached: Vec::new(),
            stale: false,
        }
    }

    /// Run detection unless `now` falls inside the throttle window.
    pub fn detect(
        &mut self,
        context: &CollisionContext<'_>,
        candidates: &[CollisionCandidate],
        now: Instant,
    ) -> &[CollisionResult] {
        if let Some(last) = self.last_detection {
            let elapsed = now.checked_duration_since(last).unwrap_or_default();
            if elapsed < self.options.throttle {
                tracing::trace!(
                    target: "dragforge.collision",
                    elapsed_us = elapsed.as_micros() as u64,
                    "detection throttled"
                );
                self.stale = true;
                return &self.cached;
            }
        }
        self.detect_now(context, candidates, now)
    }

    /// Run detection regardless of the throttle window.
    ///
    /// Used on release and on frame boundaries so the trailing edge of a
    /// throttled burst is never lost.
    pub fn detect_now(
        &mut self,
        context: &CollisionContext<'_>,
        candidates: &[CollisionCandidate],
        now: Instant,
    ) -> &[CollisionResult] {
        self.last_detection = Some(now);
        self.stale = false;
        self.cached = self.strategy.detect(context, candidates);
        &self.cached
    }

    /// Whether the cached results may lag behind the last `detect` call.
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        self.stale
    }

    /// Top result of the most recent detection.
    #[must_use]
    pub fn best_target(&self) -> Option<&CollisionResult> {
        self.cached.first()
    }

    /// Results of the most recent detection.
    #[must_use]
    pub fn last_results(&self) -> &[CollisionResult] {
        &self.cached
    }

    /// Name of the active strategy.
    #[must_use]
    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    /// Current options.
    #[must_use]
    pub fn options(&self) -> &CollisionDetectorOptions {
        &self.options
    }

    /// Whether a custom strategy is installed.
    #[must_use]
    pub const fn has_custom_strategy(&self) -> bool {
        self.custom
    }

    /// Replace the options and rebuild the built-in strategy.
    pub fn update_options(&mut self, options: CollisionDetectorOptions) {
        if !self.custom {
            self.strategy = options.build_strategy();
        }
        self.options = options;
        self.clear_cache();
        tracing::debug!(
            target: "dragforge.collision",
            strategy = self.strategy.name(),
            throttle_ms = self.options.throttle.as_millis() as u64,
            "collision options updated"
        );
    }

    /// Install a custom strategy.
    pub fn set_strategy(&mut self, strategy: Box<dyn CollisionStrategy>) {
        self.strategy = strategy;
        self.custom = true;
        self.clear_cache();
        tracing::debug!(
            target: "dragforge.collision",
            strategy = self.strategy.name(),
            "collision strategy replaced"
        );
    }

    /// Drop the custom strategy and go back to the one the options describe.
    pub fn reset_strategy(&mut self) {
        self.strategy = self.options.build_strategy();
        self.custom = false;
        self.clear_cache();
    }

    /// Forget cached results and restart the throttle window.
    pub fn clear_cache(&mut self) {
        self.cached.clear();
        self.last_detection = None;
        self.stale = false;
        self.strategy.clear_cache();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dragforge_core::{ElementId, ElementTree, Point, Rect};

    fn candidates() -> Vec<CollisionCandidate> {
        vec![
            CollisionCandidate::new("a", ElementId(1), Rect::new(0.0, 0.0, 50.0, 50.0), 0),
            CollisionCandidate::new("b", ElementId(2), Rect::new(100.0, 0.0, 50.0, 50.0), 1),
        ]
    }

    fn context_at(tree: &ElementTree, x: f64) -> CollisionContext<'_> {
        let position = Point::new(x, 25.0);
        CollisionContext {
            position,
            drag_rect: Rect::from_center(position, 20.0, 20.0),
            viewport: Rect::new(0.0, 0.0, 800.0, 600.0),
            tree,
        }
    }

    #[test]
    fn default_is_plain_rect_intersection() {
        let detector = CollisionDetector::default();
        assert_eq!(detector.strategy_name(), "rectIntersection");
        assert!(!detector.has_custom_strategy());
    }

    #[test]
    fn layered_options_build_composite() {
        let options = CollisionDetectorOptions {
            grid_snap: Some(GridSnapOptions::grid(10.0)),
            nested_containers: Some(NestedContainerOptions::enabled(None)),
            ..CollisionDetectorOptions::default()
        };
        let detector = CollisionDetector::new(options);
        assert_eq!(detector.strategy_name(), "composite");

        let disabled_layers = CollisionDetectorOptions {
            grid_snap: Some(GridSnapOptions::default()),
            ..CollisionDetectorOptions::default()
        };
        assert_eq!(
            CollisionDetector::new(disabled_layers).strategy_name(),
            "rectIntersection"
        );
    }

    #[test]
    fn throttle_returns_cached_results() {
        let tree = ElementTree::default();
        let mut detector = CollisionDetector::default();
        let t0 = Instant::now();
        let first = detector.detect(&context_at(&tree, 25.0), &candidates(), t0).to_vec();
        assert_eq!(first[0].target.as_str(), "a");

        let cached = detector
            .detect(&context_at(&tree, 125.0), &candidates(), t0 + Duration::from_millis(5))
            .to_vec();
        assert_eq!(cached, first);

        let fresh = detector
            .detect(&context_at(&tree, 125.0), &candidates(), t0 + Duration::from_millis(16))
            .to_vec();
        assert_eq!(fresh[0].target.as_str(), "b");
        assert_eq!(detector.best_target().map(|r| r.target.as_str()), Some("b"));
    }

    #[test]
    fn throttled_call_marks_cache_stale_until_forced() {
        let tree = ElementTree::default();
        let mut detector = CollisionDetector::default();
        let t0 = Instant::now();
        detector.detect(&context_at(&tree, 25.0), &candidates(), t0);
        assert!(!detector.is_stale());

        detector.detect(&context_at(&tree, 125.0), &candidates(), t0 + Duration::from_millis(5));
        assert!(detector.is_stale());
        assert_eq!(detector.best_target().map(|r| r.target.as_str()), Some("a"));

        let forced = detector
            .detect_now(&context_at(&tree, 125.0), &candidates(), t0 + Duration::from_millis(6))
            .to_vec();
        assert_eq!(forced[0].target.as_str(), "b");
        assert!(!detector.is_stale());
    }

    #[test]
    fn clear_cache_restarts_window() {
        let tree = ElementTree::default();
        let mut detector = CollisionDetector::default();
        let t0 = Instant::now();
        detector.detect(&context_at(&tree, 25.0), &candidates(), t0);
        detector.clear_cache();
        assert!(detector.last_results().is_empty());
        let fresh = detector.detect(&context_at(&tree, 125.0), &candidates(), t0);
        assert_eq!(fresh[0].target.as_str(), "b");
    }

    #[test]
    fn custom_strategy_survives_option_updates() {
        let mut detector = CollisionDetector::default();
        detector.set_strategy(Box::new(PointerWithin));
        detector.update_options(CollisionDetectorOptions {
            strategy: StrategyKind::ClosestCenter,
            ..CollisionDetectorOptions::default()
        });
        assert_eq!(detector.strategy_name(), "pointerWithin");
        detector.reset_strategy();
        assert_eq!(detector.strategy_name(), "closestCenter");
    }
}
