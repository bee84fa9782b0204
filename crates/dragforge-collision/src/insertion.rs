#![forbid(unsafe_code)]

//! Insertion-index helpers for placeholder collaborators.
//!
//! Given the child rectangles of the current best drop target and the
//! pointer position, these decide where a dragged item would land.

use dragforge_core::{Point, Rect};

/// Whether children are laid out along the x axis.
///
/// Decided from the first two children: horizontal when they are further
/// apart horizontally than vertically. Fewer than two children count as
/// horizontal.
#[must_use]
pub fn is_horizontal_layout(children: &[Rect]) -> bool {
    match children {
        [first, second, ..] => {
            (first.top() - second.top()).abs() < (first.left() - second.left()).abs()
        }
        _ => true,
    }
}

/// Index before which an item dropped at `position` would be inserted.
///
/// Returns the first child whose center lies after `position` on the layout
/// axis, or `children.len()` to append.
#[must_use]
pub fn insertion_index(children: &[Rect], position: Point) -> usize {
    let horizontal = is_horizontal_layout(children);
    children
        .iter()
        .position(|child| {
            let center = child.center();
            if horizontal {
                position.x < center.x
            } else {
                position.y < center.y
            }
        })
        .unwrap_or(children.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column() -> Vec<Rect> {
        (0..3)
            .map(|i| Rect::new(0.0, f64::from(i) * 50.0, 200.0, 40.0))
            .collect()
    }

    fn row() -> Vec<Rect> {
        (0..3)
            .map(|i| Rect::new(f64::from(i) * 50.0, 0.0, 40.0, 200.0))
            .collect()
    }

    #[test]
    fn detects_layout_axis() {
        assert!(!is_horizontal_layout(&column()));
        assert!(is_horizontal_layout(&row()));
        assert!(is_horizontal_layout(&column()[..1]));
        assert!(is_horizontal_layout(&[]));
    }

    #[test]
    fn vertical_insertion() {
        let children = column();
        assert_eq!(insertion_index(&children, Point::new(10.0, 5.0)), 0);
        assert_eq!(insertion_index(&children, Point::new(10.0, 30.0)), 1);
        assert_eq!(insertion_index(&children, Point::new(10.0, 500.0)), 3);
    }

    #[test]
    fn horizontal_insertion() {
        let children = row();
        assert_eq!(insertion_index(&children, Point::new(75.0, 10.0)), 2);
        assert_eq!(insertion_index(&[], Point::new(75.0, 10.0)), 0);
    }
}
