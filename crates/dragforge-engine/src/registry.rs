#![forbid(unsafe_code)]

//! Draggable and drop-target registries.
//!
//! # Invariants
//!
//! - Ids are unique per registry. Registering an id again replaces the
//!   entry in place.
//! - Several draggables may share an element. Element lookup prefers the
//!   earliest registered enabled node; removing one never hides another.
//! - Drop targets keep the order of their first registration. That order
//!   breaks ties between equal collision results, so re-registration must
//!   not move a target to the back.
//! - Cached target rectangles are refreshed lazily: after
//!   [`Registry::invalidate_rects`], the next [`Registry::candidates`] call
//!   re-reads every bound from the tree.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use dragforge_collision::CollisionCandidate;
use dragforge_core::{DraggableId, DropTargetId, ElementId, Rect, VisualTree};

use crate::constraints::DragConstraint;
use crate::event::Payload;

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

/// A registered draggable.
#[derive(Clone)]
pub struct DraggableNode {
    pub id: DraggableId,
    pub element: ElementId,
    pub data: Option<Payload>,
    pub disabled: bool,
    /// Applied in order to every move.
    pub constraints: Vec<Rc<dyn DragConstraint>>,
}

impl DraggableNode {
    #[must_use]
    pub fn new(id: impl Into<DraggableId>, element: ElementId) -> Self {
        Self {
            id: id.into(),
            element,
            data: None,
            disabled: false,
            constraints: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_data(mut self, data: Payload) -> Self {
        self.data = Some(data);
        self
    }

    #[must_use]
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    #[must_use]
    pub fn with_constraint(mut self, constraint: impl DragConstraint + 'static) -> Self {
        self.constraints.push(Rc::new(constraint));
        self
    }
}

impl fmt::Debug for DraggableNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DraggableNode")
            .field("id", &self.id)
            .field("element", &self.element)
            .field("has_data", &self.data.is_some())
            .field("disabled", &self.disabled)
            .field("constraints", &self.constraints.len())
            .finish()
    }
}

/// A registered drop target.
#[derive(Clone)]
pub struct DropTarget {
    pub id: DropTargetId,
    pub element: ElementId,
    pub data: Option<Payload>,
    pub disabled: bool,
}

impl DropTarget {
    #[must_use]
    pub fn new(id: impl Into<DropTargetId>, element: ElementId) -> Self {
        Self {
            id: id.into(),
            element,
            data: None,
            disabled: false,
        }
    }

    #[must_use]
    pub fn with_data(mut self, data: Payload) -> Self {
        self.data = Some(data);
        self
    }

    #[must_use]
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

impl fmt::Debug for DropTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DropTarget")
            .field("id", &self.id)
            .field("element", &self.element)
            .field("has_data", &self.data.is_some())
            .field("disabled", &self.disabled)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct TargetEntry {
    target: DropTarget,
    rect: Option<Rect>,
}

/// Arena of draggables and drop targets owned by one engine.
#[derive(Debug, Default)]
pub struct Registry {
    draggables: AHashMap<DraggableId, DraggableNode>,
    by_element: AHashMap<ElementId, Vec<DraggableId>>,
    targets: BTreeMap<u64, TargetEntry>,
    target_order: AHashMap<DropTargetId, u64>,
    next_order: u64,
    rects_dirty: bool,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a draggable. Returns the replaced node.
    pub fn insert_draggable(&mut self, node: DraggableNode) -> Option<DraggableNode> {
        let previous = self.draggables.remove(&node.id);
        let same_element = previous.as_ref().is_some_and(|p| p.element == node.element);
        if let Some(previous) = &previous
            && !same_element
        {
            self.unindex(previous.element, &previous.id);
        }
        if !same_element {
            self.by_element.entry(node.element).or_default().push(node.id.clone());
        }
        self.draggables.insert(node.id.clone(), node);
        previous
    }

    pub fn remove_draggable(&mut self, id: &DraggableId) -> Option<DraggableNode> {
        let node = self.draggables.remove(id)?;
        self.unindex(node.element, id);
        Some(node)
    }

    fn unindex(&mut self, element: ElementId, id: &DraggableId) {
        if let Some(ids) = self.by_element.get_mut(&element) {
            ids.retain(|other| other != id);
            if ids.is_empty() {
                self.by_element.remove(&element);
            }
        }
    }

    #[must_use]
    pub fn draggable(&self, id: &DraggableId) -> Option<&DraggableNode> {
        self.draggables.get(id)
    }

    /// Draggable registered on `element` or, failing that, on its nearest
    /// registered ancestor.
    ///
    /// Among nodes sharing an element the first enabled one wins; if all are
    /// disabled the first is returned so the caller can report it.
    #[must_use]
    pub fn draggable_for_element<T: VisualTree>(
        &self,
        element: ElementId,
        tree: &T,
    ) -> Option<&DraggableNode> {
        let ids = std::iter::once(element)
            .chain(tree.ancestors(element))
            .find_map(|candidate| self.by_element.get(&candidate))?;
        let mut nodes = ids.iter().filter_map(|id| self.draggables.get(id));
        let first = nodes.next()?;
        if !first.disabled {
            return Some(first);
        }
        nodes.find(|node| !node.disabled).or(Some(first))
    }

    /// Insert or replace a drop target. Returns the replaced target.
    pub fn insert_target(&mut self, target: DropTarget) -> Option<DropTarget> {
        let order = match self.target_order.get(&target.id) {
            Some(order) => *order,
            None => {
                let order = self.next_order;
                self.next_order += 1;
                self.target_order.insert(target.id.clone(), order);
                order
            }
        };
        let previous = self.targets.insert(order, TargetEntry { target, rect: None });
        self.rects_dirty = true;
        previous.map(|entry| entry.target)
    }

    pub fn remove_target(&mut self, id: &DropTargetId) -> Option<DropTarget> {
        let order = self.target_order.remove(id)?;
        self.targets.remove(&order).map(|entry| entry.target)
    }

    #[must_use]
    pub fn target(&self, id: &DropTargetId) -> Option<&DropTarget> {
        let order = self.target_order.get(id)?;
        self.targets.get(order).map(|entry| &entry.target)
    }

    /// Mark every cached target rectangle stale.
    pub fn invalidate_rects(&mut self) {
        self.rects_dirty = true;
    }

    /// Collision candidates in registration order.
    ///
    /// Targets the tree has no bounds for are skipped.
    pub fn candidates<T: VisualTree>(&mut self, tree: &T) -> Vec<CollisionCandidate> {
        let refresh = std::mem::take(&mut self.rects_dirty);
        self.targets
            .iter_mut()
            .filter_map(|(order, entry)| {
                if refresh || entry.rect.is_none() {
                    entry.rect = tree.bounds(entry.target.element);
                }
                let rect = entry.rect?;
                Some(
                    CollisionCandidate::new(&entry.target.id, entry.target.element, rect, *order)
                        .disabled(entry.target.disabled),
                )
            })
            .collect()
    }

    #[must_use]
    pub fn draggable_count(&self) -> usize {
        self.draggables.len()
    }

    #[must_use]
    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    pub fn clear(&mut self) {
        self.draggables.clear();
        self.by_element.clear();
        self.targets.clear();
        self.target_order.clear();
        self.rects_dirty = false;
    }
}
