#![forbid(unsafe_code)]

//! Pure geometry used by the collision strategies.
//!
//! Every function here is total: degenerate rectangles produce a defined
//! answer (usually `None` or `0.0`) rather than NaN.

use dragforge_core::{Point, Rect};

/// Overlap ratio of `drag` against `target`.
///
/// Returns `None` when the rectangles do not share positive area. Otherwise
/// returns the intersection area divided by the smaller of the two areas, or
/// `0.0` when that smaller area is zero.
#[must_use]
pub fn rect_intersection(drag: &Rect, target: &Rect) -> Option<f64> {
    let overlap = drag.intersection_opt(target)?;
    let min_area = drag.area().min(target.area());
    if min_area > 0.0 {
        Some(overlap.area() / min_area)
    } else {
        Some(0.0)
    }
}

/// Distance between the centers of two rectangles.
#[inline]
#[must_use]
pub fn closest_center(drag: &Rect, target: &Rect) -> f64 {
    drag.center().distance(target.center())
}

/// Smallest distance between any corner of `drag` and any corner of `target`.
#[must_use]
pub fn closest_corners(drag: &Rect, target: &Rect) -> f64 {
    let target_corners = target.corners();
    drag.corners()
        .iter()
        .flat_map(|a| target_corners.iter().map(move |b| a.distance(*b)))
        .fold(f64::INFINITY, f64::min)
}

/// Whether `position` lies inside `target`, edges included.
#[inline]
#[must_use]
pub fn pointer_within(position: Point, target: &Rect) -> bool {
    target.contains(position)
}

/// Distance from `position` to the nearest point of `target`; `0.0` inside.
#[must_use]
pub fn pointer_distance(position: Point, target: &Rect) -> f64 {
    if pointer_within(position, target) {
        return 0.0;
    }
    let dx = (target.left() - position.x)
        .max(0.0)
        .max(position.x - target.right());
    let dy = (target.top() - position.y)
        .max(0.0)
        .max(position.y - target.bottom());
    dx.hypot(dy)
}

/// Point where the ray from the center of `rect` towards `position` leaves
/// the rectangle.
///
/// A `position` at the exact center maps to the midpoint of the right edge.
#[must_use]
pub fn closest_edge_point(rect: &Rect, position: Point) -> Point {
    let center = rect.center();
    let dx = position.x - center.x;
    let dy = position.y - center.y;
    let half_w = rect.width / 2.0;
    let half_h = rect.height / 2.0;

    if dx == 0.0 && dy == 0.0 {
        return Point::new(rect.right(), center.y);
    }

    // Left/right edges when the ray is flatter than the diagonal.
    if dx.abs() * half_h > dy.abs() * half_w {
        let x = if dx > 0.0 { rect.right() } else { rect.left() };
        let y = center.y + dy / dx * (x - center.x);
        Point::new(x, y)
    } else {
        let y = if dy > 0.0 { rect.bottom() } else { rect.top() };
        let x = center.x + dx / dy * (y - center.y);
        Point::new(x, y)
    }
}

/// Overlapping region of two rectangles, if it has positive area.
#[inline]
#[must_use]
pub fn intersection_rect(a: &Rect, b: &Rect) -> Option<Rect> {
    a.intersection_opt(b)
}

/// Snap `position` to the nearest grid intersection.
///
/// Grid lines sit at `offset + k * grid_size`. A non-positive or non-finite
/// `grid_size` leaves the position unchanged.
#[must_use]
pub fn snap_to_grid(position: Point, grid_size: f64, offset: Point) -> Point {
    if !(grid_size.is_finite() && grid_size > 0.0) {
        return position;
    }
    Point::new(
        ((position.x - offset.x) / grid_size).round() * grid_size + offset.x,
        ((position.y - offset.y) / grid_size).round() * grid_size + offset.y,
    )
}

/// Clamp `position` into `bounds`, edges included.
#[must_use]
pub fn clamp_position(position: Point, bounds: &Rect) -> Point {
    Point::new(
        position.x.max(bounds.left()).min(bounds.right()),
        position.y.max(bounds.top()).min(bounds.bottom()),
    )
}

/// Whether `rect` touches `viewport`, edges included.
#[inline]
#[must_use]
pub fn is_rect_in_viewport(rect: &Rect, viewport: &Rect) -> bool {
    rect.touches(viewport)
}
