#![forbid(unsafe_code)]

//! Collision strategy contract and shared result types.
//!
//! A strategy receives the drag geometry and the current drop-target
//! candidates and returns a ranked list of [`CollisionResult`]s.
//!
//! # Invariants
//!
//! - Results are ordered by descending `priority`, ties broken by ascending
//!   registration `order`. [`rank`] establishes this order and every
//!   built-in strategy calls it before returning.
//! - Disabled candidates never produce a result.
//! - A target appears at most once in any result list.

use std::cmp::Ordering;

use dragforge_core::{DropTargetId, ElementId, Point, Rect, VisualTree};

/// A drop target as seen by collision detection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionCandidate {
    pub id: DropTargetId,
    /// Host element backing the target.
    pub element: ElementId,
    /// Absolute bounds at detection time.
    pub rect: Rect,
    /// Registration order; lower registered earlier.
    pub order: u64,
    pub disabled: bool,
}

impl CollisionCandidate {
    /// Create an enabled candidate.
    #[must_use]
    pub fn new(id: impl Into<DropTargetId>, element: ElementId, rect: Rect, order: u64) -> Self {
        Self {
            id: id.into(),
            element,
            rect,
            order,
            disabled: false,
        }
    }

    /// Mark the candidate disabled.
    #[must_use]
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

/// Inputs shared by every candidate in one detection pass.
#[derive(Clone, Copy)]
pub struct CollisionContext<'a> {
    /// Current pointer position.
    pub position: Point,
    /// Rectangle of the dragged element at `position`.
    pub drag_rect: Rect,
    /// Visible region.
    pub viewport: Rect,
    /// Host hierarchy, for strategies that need container depth.
    pub tree: &'a dyn VisualTree,
}

impl std::fmt::Debug for CollisionContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollisionContext")
            .field("position", &self.position)
            .field("drag_rect", &self.drag_rect)
            .field("viewport", &self.viewport)
            .finish_non_exhaustive()
    }
}

/// One scored candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionResult {
    pub target: DropTargetId,
    pub element: ElementId,
    /// Registration order of the target, used for tie-breaking.
    pub order: u64,
    /// Strategy-specific distance; `0.0` when not meaningful.
    pub distance: f64,
    /// Overlap ratio in `[0, 1]`; strategies without overlap use `0` or `1`.
    pub intersection_ratio: f64,
    /// Ranking key; higher wins.
    pub priority: f64,
}

impl CollisionResult {
    pub(crate) fn for_candidate(
        candidate: &CollisionCandidate,
        distance: f64,
        intersection_ratio: f64,
        priority: f64,
    ) -> Self {
        Self {
            target: candidate.id.clone(),
            element: candidate.element,
            order: candidate.order,
            distance,
            intersection_ratio,
            priority,
        }
    }
}

/// Total order used for ranking: higher priority first, then earlier
/// registration.
#[must_use]
pub fn compare_results(a: &CollisionResult, b: &CollisionResult) -> Ordering {
    b.priority
        .total_cmp(&a.priority)
        .then_with(|| a.order.cmp(&b.order))
}

/// Sort results into ranking order.
pub fn rank(results: &mut [CollisionResult]) {
    results.sort_by(compare_results);
}

/// A pluggable collision algorithm.
///
/// Strategies take `&mut self` so they can keep scratch state such as a
/// spatial index between passes.
pub trait CollisionStrategy {
    /// Stable strategy name, used in logs.
    fn name(&self) -> &str;

    /// Score `candidates` against `context`, returning ranked results.
    fn detect(
        &mut self,
        context: &CollisionContext<'_>,
        candidates: &[CollisionCandidate],
    ) -> Vec<CollisionResult>;

    /// Drop any cached scratch state.
    fn clear_cache(&mut self) {}
}

impl<S: CollisionStrategy + ?Sized> CollisionStrategy for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn detect(
        &mut self,
        context: &CollisionContext<'_>,
        candidates: &[CollisionCandidate],
    ) -> Vec<CollisionResult> {
        (**self).detect(context, candidates)
    }

    fn clear_cache(&mut self) {
        (**self).clear_cache();
    }
}

/// Adapter turning a closure into a [`CollisionStrategy`].
///
/// The closure's output is re-ranked, so it may return results in any order.
pub struct FnStrategy<F> {
    name: String,
    detect: F,
}

impl<F> FnStrategy<F>
where
    F: FnMut(&CollisionContext<'_>, &[CollisionCandidate]) -> Vec<CollisionResult>,
{
    /// Wrap `detect` under `name`.
    pub fn new(name: impl Into<String>, detect: F) -> Self {
        Self {
            name: name.into(),
            detect,
        }
    }
}

impl<F> CollisionStrategy for FnStrategy<F>
where
    F: FnMut(&CollisionContext<'_>, &[CollisionCandidate]) -> Vec<CollisionResult>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn detect(
        &mut self,
        context: &CollisionContext<'_>,
        candidates: &[CollisionCandidate],
    ) -> Vec<CollisionResult> {
        let mut results = (self.detect)(context, candidates);
        rank(&mut results);
        results
    }
}
