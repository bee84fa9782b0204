#![forbid(unsafe_code)]

//! Built-in collision strategies.
//!
//! | Strategy | Candidate kept when | Priority |
//! |---|---|---|
//! | [`RectIntersection`] | drag rect overlaps target | overlap ratio |
//! | [`ClosestCenter`] | center distance below cutoff | `1000 / (d + 1)` |
//! | [`ClosestCorners`] | corner distance below cutoff | `1000 / (d + 1)` |
//! | [`PointerWithin`] | target contains pointer | `1000` |
//! | [`GridSnap`] | rect intersection after snapping | overlap ratio |
//! | [`NestedContainer`] | deepest container holding the pointer | `1000 + depth` |
//! | [`Composite`] | any inner strategy keeps it | best inner priority |
//!
//! # Invariants
//!
//! - [`RectIntersection`] returns the same results with and without the
//!   spatial index.

use ahash::{AHashMap, AHashSet};
use dragforge_core::{DropTargetId, Point, Rect, ancestors_of};

use crate::algorithms::{
    closest_center, closest_corners, is_rect_in_viewport, pointer_distance, pointer_within,
    rect_intersection, snap_to_grid,
};
use crate::quadtree::{QuadTree, QuadTreeConfig};
use crate::strategy::{
    CollisionCandidate, CollisionContext, CollisionResult, CollisionStrategy, rank,
};

/// Candidate count above which [`RectIntersection`] builds a spatial index.
pub const DEFAULT_INDEX_THRESHOLD: usize = 20;

/// Distance at or beyond which the distance strategies drop a target.
pub const DEFAULT_DISTANCE_CUTOFF: f64 = 200.0;

/// Base priority of pointer containment.
pub const POINTER_PRIORITY: f64 = 1000.0;

// ---------------------------------------------------------------------------
// Rect intersection
// ---------------------------------------------------------------------------

/// Ranks targets by how much of the smaller rectangle the overlap covers.
#[derive(Debug, Clone)]
pub struct RectIntersection {
    index_threshold: usize,
    index: QuadTree<usize>,
}

impl Default for RectIntersection {
    fn default() -> Self {
        Self::new()
    }
}

impl RectIntersection {
    /// Default index threshold and quadtree thresholds.
    #[must_use]
    pub fn new() -> Self {
        Self::with_index(DEFAULT_INDEX_THRESHOLD, QuadTreeConfig::default())
    }

    /// Explicit index threshold and quadtree thresholds.
    #[must_use]
    pub fn with_index(index_threshold: usize, config: QuadTreeConfig) -> Self {
        Self {
            index_threshold,
            index: QuadTree::with_config(Rect::default(), config),
        }
    }

    /// Candidate count above which the index is used.
    #[must_use]
    pub const fn index_threshold(&self) -> usize {
        self.index_threshold
    }

    fn score(drag_rect: &Rect, candidate: &CollisionCandidate) -> Option<CollisionResult> {
        if candidate.disabled {
            return None;
        }
        rect_intersection(drag_rect, &candidate.rect)
            .map(|ratio| CollisionResult::for_candidate(candidate, 0.0, ratio, ratio))
    }

    fn rebuild_index(&mut self, context: &CollisionContext<'_>, candidates: &[CollisionCandidate]) {
        // The root must cover every candidate or the query could miss one.
        let bounds = candidates
            .iter()
            .fold(context.viewport.union(&context.drag_rect), |acc, c| {
                acc.union(&c.rect)
            });
        self.index.reset(bounds);
        for (slot, candidate) in candidates.iter().enumerate() {
            if !candidate.disabled {
                self.index.insert(candidate.rect, slot);
            }
        }
    }
}

impl CollisionStrategy for RectIntersection {
    fn name(&self) -> &str {
        "rectIntersection"
    }

    fn detect(
        &mut self,
        context: &CollisionContext<'_>,
        candidates: &[CollisionCandidate],
    ) -> Vec<CollisionResult> {
        if !is_rect_in_viewport(&context.drag_rect, &context.viewport) {
            return Vec::new();
        }

        let mut results: Vec<CollisionResult> = if candidates.len() > self.index_threshold {
            self.rebuild_index(context, candidates);
            let mut out = Vec::new();
            self.index.visit(&context.drag_rect, |_, &slot| {
                if let Some(hit) = candidates
                    .get(slot)
                    .and_then(|c| Self::score(&context.drag_rect, c))
                {
                    out.push(hit);
                }
            });
            out
        } else {
            candidates
                .iter()
                .filter_map(|c| Self::score(&context.drag_rect, c))
                .collect()
        };

        rank(&mut results);
        results
    }

    fn clear_cache(&mut self) {
        self.index.clear();
    }
}

// ---------------------------------------------------------------------------
// Distance strategies
// ---------------------------------------------------------------------------

fn rank_by_distance(
    context: &CollisionContext<'_>,
    candidates: &[CollisionCandidate],
    cutoff: f64,
    distance: fn(&Rect, &Rect) -> f64,
) -> Vec<CollisionResult> {
    if !is_rect_in_viewport(&context.drag_rect, &context.viewport) {
        return Vec::new();
    }
    let mut results: Vec<CollisionResult> = candidates
        .iter()
        .filter(|c| !c.disabled)
        .filter_map(|c| {
            let d = distance(&context.drag_rect, &c.rect);
            (d < cutoff).then(|| CollisionResult::for_candidate(c, d, 0.0, 1000.0 / (d + 1.0)))
        })
        .collect();
    rank(&mut results);
    results
}

/// Ranks targets by distance between rectangle centers.
#[derive(Debug, Clone, Copy)]
pub struct ClosestCenter {
    cutoff: f64,
}

impl Default for ClosestCenter {
    fn default() -> Self {
        Self {
            cutoff: DEFAULT_DISTANCE_CUTOFF,
        }
    }
}

impl ClosestCenter {
    /// Drop targets at or beyond `cutoff`.
    #[must_use]
    pub const fn with_cutoff(cutoff: f64) -> Self {
        Self { cutoff }
    }
}

impl CollisionStrategy for ClosestCenter {
    fn name(&self) -> &str {
        "closestCenter"
    }

    fn detect(
        &mut self,
        context: &CollisionContext<'_>,
        candidates: &[CollisionCandidate],
    ) -> Vec<CollisionResult> {
        rank_by_distance(context, candidates, self.cutoff, closest_center)
    }
}

/// Ranks targets by the closest pair of corners.
#[derive(Debug, Clone, Copy)]
pub struct ClosestCorners {
    cutoff: f64,
}

impl Default for ClosestCorners {
    fn default() -> Self {
        Self {
            cutoff: DEFAULT_DISTANCE_CUTOFF,
        }
    }
}

impl ClosestCorners {
    /// Drop targets at or beyond `cutoff`.
    #[must_use]
    pub const fn with_cutoff(cutoff: f64) -> Self {
        Self { cutoff }
    }
}

impl CollisionStrategy for ClosestCorners {
    fn name(&self) -> &str {
        "closestCorners"
    }

    fn detect(
        &mut self,
        context: &CollisionContext<'_>,
        candidates: &[CollisionCandidate],
    ) -> Vec<CollisionResult> {
        rank_by_distance(context, candidates, self.cutoff, closest_corners)
    }
}

// ---------------------------------------------------------------------------
// Pointer containment
// ---------------------------------------------------------------------------

/// Every target containing the pointer, at equal priority.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointerWithin;

impl CollisionStrategy for PointerWithin {
    fn name(&self) -> &str {
        "pointerWithin"
    }

    fn detect(
        &mut self,
        context: &CollisionContext<'_>,
        candidates: &[CollisionCandidate],
    ) -> Vec<CollisionResult> {
        let mut results: Vec<CollisionResult> = candidates
            .iter()
            .filter(|c| !c.disabled && pointer_within(context.position, &c.rect))
            .map(|c| {
                let distance = pointer_distance(context.position, &c.rect);
                CollisionResult::for_candidate(c, distance, 1.0, POINTER_PRIORITY)
            })
            .collect();
        rank(&mut results);
        results
    }
}

// ---------------------------------------------------------------------------
// Grid snap
// ---------------------------------------------------------------------------

/// Grid snapping parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSnapOptions {
    pub enabled: bool,
    pub grid_size: f64,
    pub offset: Point,
}

impl Default for GridSnapOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            grid_size: 20.0,
            offset: Point::ZERO,
        }
    }
}

impl GridSnapOptions {
    /// Enabled grid with the given cell size and no offset.
    #[must_use]
    pub const fn grid(grid_size: f64) -> Self {
        Self {
            enabled: true,
            grid_size,
            offset: Point::ZERO,
        }
    }
}

/// Rect intersection after re-centering the drag rect on the snapped
/// pointer position.
#[derive(Debug, Clone)]
pub struct GridSnap {
    options: GridSnapOptions,
    inner: RectIntersection,
}

impl GridSnap {
    #[must_use]
    pub fn new(options: GridSnapOptions) -> Self {
        Self {
            options,
            inner: RectIntersection::new(),
        }
    }

    /// Replace the inner rect-intersection configuration.
    #[must_use]
    pub fn with_inner(mut self, inner: RectIntersection) -> Self {
        self.inner = inner;
        self
    }

    #[must_use]
    pub const fn options(&self) -> GridSnapOptions {
        self.options
    }
}

impl CollisionStrategy for GridSnap {
    fn name(&self) -> &str {
        "gridSnap"
    }

    fn detect(
        &mut self,
        context: &CollisionContext<'_>,
        candidates: &[CollisionCandidate],
    ) -> Vec<CollisionResult> {
        if !self.options.enabled {
            return self.inner.detect(context, candidates);
        }
        let snapped = snap_to_grid(context.position, self.options.grid_size, self.options.offset);
        let snapped_context = CollisionContext {
            position: snapped,
            drag_rect: context.drag_rect.with_center(snapped),
            ..*context
        };
        self.inner.detect(&snapped_context, candidates)
    }

    fn clear_cache(&mut self) {
        self.inner.clear_cache();
    }
}

// ---------------------------------------------------------------------------
// Nested containers
// ---------------------------------------------------------------------------

/// Nested-container parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NestedContainerOptions {
    pub enabled: bool,
    /// Deepest container considered; `None` or `Some(0)` means unbounded.
    pub max_depth: Option<usize>,
}

impl NestedContainerOptions {
    /// Enabled with an optional depth bound.
    #[must_use]
    pub const fn enabled(max_depth: Option<usize>) -> Self {
        Self {
            enabled: true,
            max_depth,
        }
    }
}

/// Picks the most deeply nested target that contains the pointer.
///
/// Depth counts the ancestors of a target's element that are themselves
/// candidate elements. The first candidate wins among equal depths. When
/// disabled, behaves as [`PointerWithin`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NestedContainer {
    options: NestedContainerOptions,
}

impl NestedContainer {
    #[must_use]
    pub const fn new(options: NestedContainerOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub const fn options(&self) -> NestedContainerOptions {
        self.options
    }
}

impl CollisionStrategy for NestedContainer {
    fn name(&self) -> &str {
        "nestedContainer"
    }

    fn detect(
        &mut self,
        context: &CollisionContext<'_>,
        candidates: &[CollisionCandidate],
    ) -> Vec<CollisionResult> {
        if !self.options.enabled {
            return PointerWithin.detect(context, candidates);
        }

        let containers: AHashSet<_> = candidates.iter().map(|c| c.element).collect();
        let mut deepest: Option<(&CollisionCandidate, usize)> = None;

        for candidate in candidates {
            if candidate.disabled || !pointer_within(context.position, &candidate.rect) {
                continue;
            }
            let depth = ancestors_of(context.tree, candidate.element)
                .into_iter()
                .filter(|ancestor| containers.contains(ancestor))
                .count();
            if self.options.max_depth.is_some_and(|max| max > 0 && depth > max) {
                continue;
            }
            if deepest.is_none_or(|(_, best)| depth > best) {
                deepest = Some((candidate, depth));
            }
        }

        deepest
            .map(|(candidate, depth)| {
                #[allow(clippy::cast_precision_loss)]
                let priority = POINTER_PRIORITY + depth as f64;
                vec![CollisionResult::for_candidate(candidate, 0.0, 1.0, priority)]
            })
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Composite
// ---------------------------------------------------------------------------

/// Runs several strategies and keeps the best result per target.
///
/// A later strategy replaces an earlier result only with a strictly higher
/// priority.
pub struct Composite {
    strategies: Vec<Box<dyn CollisionStrategy>>,
}

impl std::fmt::Debug for Composite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.strategies.iter().map(|s| s.name()).collect();
        f.debug_struct("Composite").field("strategies", &names).finish()
    }
}

impl Composite {
    #[must_use]
    pub fn new(strategies: Vec<Box<dyn CollisionStrategy>>) -> Self {
        Self { strategies }
    }

    /// Names of the inner strategies, in evaluation order.
    #[must_use]
    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }
}

impl CollisionStrategy for Composite {
    fn name(&self) -> &str {
        "composite"
    }

    fn detect(
        &mut self,
        context: &CollisionContext<'_>,
        candidates: &[CollisionCandidate],
    ) -> Vec<CollisionResult> {
        let mut best: AHashMap<DropTargetId, CollisionResult> = AHashMap::new();
        for strategy in &mut self.strategies {
            for result in strategy.detect(context, candidates) {
                match best.get(&result.target) {
                    Some(existing) if result.priority <= existing.priority => {}
                    _ => {
                        best.insert(result.target.clone(), result);
                    }
                }
            }
        }
        let mut results: Vec<CollisionResult> = best.into_values().collect();
        rank(&mut results);
        results
    }

    fn clear_cache(&mut self) {
        for strategy in &mut self.strategies {
            strategy.clear_cache();
        }
    }
}
