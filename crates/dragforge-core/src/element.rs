#![forbid(unsafe_code)]

//! Opaque element handles and the host visual-tree seam.
//!
//! The engine never owns visual elements. It holds [`ElementId`] handles and
//! asks a [`VisualTree`] for hierarchy and layout when it needs them.
//!
//! # Invariants
//!
//! - [`VisualTree::ancestors`] yields at most [`MAX_ANCESTOR_WALK`] items, so
//!   a cyclic parent relation in host data cannot hang a query.
//! - [`ElementTree::remove`] detaches children (their parent becomes `None`)
//!   rather than removing them.

use ahash::AHashMap;

use crate::geometry::Rect;

/// Upper bound on ancestor walks.
pub const MAX_ANCESTOR_WALK: usize = 1024;

/// Opaque, non-owning handle to a host visual element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ElementId(pub u64);

impl ElementId {
    /// Raw handle value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for ElementId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// Read access to the host's element hierarchy and layout.
pub trait VisualTree {
    /// Parent of `element`, or `None` for roots and unknown elements.
    fn parent(&self, element: ElementId) -> Option<ElementId>;

    /// Absolute bounding rectangle of `element`, or `None` if it is unknown
    /// or not laid out.
    fn bounds(&self, element: ElementId) -> Option<Rect>;

    /// The visible viewport in the same coordinate space as [`bounds`](Self::bounds).
    fn viewport(&self) -> Rect;

    /// Iterate over the ancestors of `element`, nearest first, excluding
    /// `element` itself.
    fn ancestors(&self, element: ElementId) -> Ancestors<'_, Self>
    where
        Self: Sized,
    {
        Ancestors {
            tree: self,
            next: self.parent(element),
            remaining: MAX_ANCESTOR_WALK,
        }
    }

    /// Check whether `ancestor` is `element` or one of its ancestors.
    fn is_ancestor_or_self(&self, ancestor: ElementId, element: ElementId) -> bool {
        let mut current = Some(element);
        let mut remaining = MAX_ANCESTOR_WALK;
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            if remaining == 0 {
                return false;
            }
            remaining -= 1;
            current = self.parent(node);
        }
        false
    }
}

/// Walk up from `element` through a trait object, nearest ancestor first.
///
/// Same bound as [`VisualTree::ancestors`], usable with `&dyn VisualTree`.
pub fn ancestors_of(tree: &dyn VisualTree, element: ElementId) -> Vec<ElementId> {
    let mut out = Vec::new();
    let mut current = tree.parent(element);
    while let Some(node) = current {
        if out.len() >= MAX_ANCESTOR_WALK {
            break;
        }
        out.push(node);
        current = tree.parent(node);
    }
    out
}

/// Iterator returned by [`VisualTree::ancestors`].
pub struct Ancestors<'a, T: VisualTree + ?Sized> {
    tree: &'a T,
    next: Option<ElementId>,
    remaining: usize,
}

impl<T: VisualTree + ?Sized> Iterator for Ancestors<'_, T> {
    type Item = ElementId;

    fn next(&mut self) -> Option<ElementId> {
        if self.remaining == 0 {
            return None;
        }
        let current = self.next?;
        self.remaining -= 1;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

impl<T: VisualTree + ?Sized> VisualTree for &T {
    fn parent(&self, element: ElementId) -> Option<ElementId> {
        (**self).parent(element)
    }

    fn bounds(&self, element: ElementId) -> Option<Rect> {
        (**self).bounds(element)
    }

    fn viewport(&self) -> Rect {
        (**self).viewport()
    }
}

// ---------------------------------------------------------------------------
// ElementTree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
struct ElementEntry {
    parent: Option<ElementId>,
    bounds: Option<Rect>,
}

/// A retained [`VisualTree`] for hosts without their own hierarchy.
#[derive(Debug, Clone)]
pub struct ElementTree {
    entries: AHashMap<ElementId, ElementEntry>,
    viewport: Rect,
    next_id: u64,
}

impl Default for ElementTree {
    fn default() -> Self {
        Self::new(Rect::new(0.0, 0.0, 1024.0, 768.0))
    }
}

impl ElementTree {
    /// Create an empty tree with the given viewport.
    #[must_use]
    pub fn new(viewport: Rect) -> Self {
        Self {
            entries: AHashMap::new(),
            viewport,
            next_id: 1,
        }
    }

    /// Allocate a fresh element with optional parent and bounds.
    pub fn create(&mut self, parent: Option<ElementId>, bounds: Option<Rect>) -> ElementId {
        while self.entries.contains_key(&ElementId(self.next_id)) {
            self.next_id += 1;
        }
        let id = ElementId(self.next_id);
        self.next_id += 1;
        self.entries.insert(id, ElementEntry { parent, bounds });
        id
    }

    /// Insert or replace an element under a host-chosen id.
    pub fn insert(&mut self, id: ElementId, parent: Option<ElementId>, bounds: Option<Rect>) {
        self.entries.insert(id, ElementEntry { parent, bounds });
    }

    /// Update the bounds of an element. Returns `false` if it is unknown.
    pub fn set_bounds(&mut self, id: ElementId, bounds: Rect) -> bool {
        match self.entries.get_mut(&id) {
            Some(entry) => {
                entry.bounds = Some(bounds);
                true
            }
            None => false,
        }
    }

    /// Re-parent an element. Returns `false` if it is unknown.
    pub fn set_parent(&mut self, id: ElementId, parent: Option<ElementId>) -> bool {
        match self.entries.get_mut(&id) {
            Some(entry) => {
                entry.parent = parent;
                true
            }
            None => false,
        }
    }

    /// Remove an element. Its children become roots.
    pub fn remove(&mut self, id: ElementId) -> bool {
        if self.entries.remove(&id).is_none() {
            return false;
        }
        for entry in self.entries.values_mut() {
            if entry.parent == Some(id) {
                entry.parent = None;
            }
        }
        true
    }

    /// Replace the viewport.
    pub fn set_viewport(&mut self, viewport: Rect) {
        self.viewport = viewport;
    }

    /// Check whether an element is known.
    #[must_use]
    pub fn contains(&self, id: ElementId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Number of known elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the tree is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl VisualTree for ElementTree {
    fn parent(&self, element: ElementId) -> Option<ElementId> {
        self.entries.get(&element).and_then(|entry| entry.parent)
    }

    fn bounds(&self, element: ElementId) -> Option<Rect> {
        self.entries.get(&element).and_then(|entry| entry.bounds)
    }

    fn viewport(&self) -> Rect {
        self.viewport
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nested() -> (ElementTree, [ElementId; 3]) {
        let mut tree = ElementTree::default();
        let root = tree.create(None, Some(Rect::new(0.0, 0.0, 100.0, 100.0)));
        let mid = tree.create(Some(root), Some(Rect::new(10.0, 10.0, 50.0, 50.0)));
        let leaf = tree.create(Some(mid), Some(Rect::new(20.0, 20.0, 10.0, 10.0)));
        (tree, [root, mid, leaf])
    }

    #[test]
    fn ancestors_nearest_first() {
        let (tree, [root, mid, leaf]) = nested();
        let walked: Vec<_> = tree.ancestors(leaf).collect();
        assert_eq!(walked, vec![mid, root]);
        assert_eq!(ancestors_of(&tree, leaf), vec![mid, root]);
    }

    #[test]
    fn ancestor_or_self() {
        let (tree, [root, mid, leaf]) = nested();
        assert!(tree.is_ancestor_or_self(leaf, leaf));
        assert!(tree.is_ancestor_or_self(root, leaf));
        assert!(!tree.is_ancestor_or_self(leaf, mid));
    }

    #[test]
    fn cyclic_parents_terminate() {
        let mut tree = ElementTree::default();
        let a = ElementId(1);
        let b = ElementId(2);
        tree.insert(a, Some(b), None);
        tree.insert(b, Some(a), None);
        assert_eq!(tree.ancestors(a).count(), MAX_ANCESTOR_WALK);
        assert!(!tree.is_ancestor_or_self(ElementId(99), a));
    }

    #[test]
    fn remove_detaches_children() {
        let (mut tree, [root, mid, leaf]) = nested();
        assert!(tree.remove(mid));
        assert_eq!(tree.parent(leaf), None);
        assert!(tree.contains(root));
        assert!(!tree.remove(mid));
    }

    #[test]
    fn create_skips_inserted_ids() {
        let mut tree = ElementTree::default();
        tree.insert(ElementId(1), None, None);
        let fresh = tree.create(None, None);
        assert_ne!(fresh, ElementId(1));
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn bounds_updates() {
        let (mut tree, [_, _, leaf]) = nested();
        let moved = Rect::new(0.0, 0.0, 5.0, 5.0);
        assert!(tree.set_bounds(leaf, moved));
        assert_eq!(tree.bounds(leaf), Some(moved));
        assert!(!tree.set_bounds(ElementId(404), moved));
    }
}
