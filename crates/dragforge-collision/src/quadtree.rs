#![forbid(unsafe_code)]

//! Region quadtree over axis-aligned rectangles.
//!
//! # Invariants
//!
//! - An item is pushed into a child only when it lies strictly inside one
//!   child quadrant. Items straddling a midline stay at the node, so no item
//!   is ever stored twice.
//! - A node splits when its direct item count exceeds
//!   [`QuadTreeConfig::max_objects`] and its level is below
//!   [`QuadTreeConfig::max_depth`]. After a split every remaining direct item
//!   straddles a midline.
//! - [`QuadTree::query`] returns a superset of the items whose rectangle
//!   touches the query rectangle, provided the items lie inside the root
//!   bounds.
//!
//! # Failure Modes
//!
//! - An item outside the root bounds can be pushed into a child that does
//!   not contain it, and a query may then miss it. Size the root to cover
//!   every item.

use dragforge_core::Rect;
use smallvec::SmallVec;

/// Split thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuadTreeConfig {
    /// Direct items a node may hold before it splits.
    pub max_objects: usize,
    /// Deepest level a split may create. The root is level 0.
    pub max_depth: usize,
}

impl Default for QuadTreeConfig {
    fn default() -> Self {
        Self {
            max_objects: 10,
            max_depth: 5,
        }
    }
}

/// Child order: top-right, top-left, bottom-left, bottom-right.
const TOP_RIGHT: usize = 0;
const TOP_LEFT: usize = 1;
const BOTTOM_LEFT: usize = 2;
const BOTTOM_RIGHT: usize = 3;

#[derive(Debug, Clone)]
struct QuadNode<T> {
    bounds: Rect,
    level: usize,
    items: Vec<(Rect, T)>,
    children: Option<Box<[QuadNode<T>; 4]>>,
}

impl<T> QuadNode<T> {
    fn new(bounds: Rect, level: usize) -> Self {
        Self {
            bounds,
            level,
            items: Vec::new(),
            children: None,
        }
    }

    /// Quadrant that fully contains `rect`, if any.
    fn index_of(&self, rect: &Rect) -> Option<usize> {
        let mid_x = self.bounds.x + self.bounds.width / 2.0;
        let mid_y = self.bounds.y + self.bounds.height / 2.0;

        let in_top = rect.bottom() < mid_y;
        let in_bottom = rect.y > mid_y;
        let in_left = rect.right() < mid_x;
        let in_right = rect.x > mid_x;

        if in_top {
            if in_right {
                return Some(TOP_RIGHT);
            }
            if in_left {
                return Some(TOP_LEFT);
            }
        } else if in_bottom {
            if in_left {
                return Some(BOTTOM_LEFT);
            }
            if in_right {
                return Some(BOTTOM_RIGHT);
            }
        }
        None
    }

    fn split(&mut self) {
        let Rect {
            x,
            y,
            width,
            height,
        } = self.bounds;
        let hw = width / 2.0;
        let hh = height / 2.0;
        let level = self.level + 1;
        self.children = Some(Box::new([
            QuadNode::new(Rect::new(x + hw, y, hw, hh), level),
            QuadNode::new(Rect::new(x, y, hw, hh), level),
            QuadNode::new(Rect::new(x, y + hh, hw, hh), level),
            QuadNode::new(Rect::new(x + hw, y + hh, hw, hh), level),
        ]));
    }

    fn insert(&mut self, rect: Rect, item: T, config: &QuadTreeConfig) {
        if let Some(index) = self.index_of(&rect)
            && let Some(children) = self.children.as_mut()
        {
            children[index].insert(rect, item, config);
            return;
        }

        self.items.push((rect, item));

        if self.items.len() > config.max_objects && self.level < config.max_depth {
            if self.children.is_none() {
                self.split();
            }
            let pending = std::mem::take(&mut self.items);
            for (rect, item) in pending {
                match self.index_of(&rect) {
                    Some(index) => {
                        if let Some(children) = self.children.as_mut() {
                            children[index].insert(rect, item, config);
                        }
                    }
                    None => self.items.push((rect, item)),
                }
            }
        }
    }

    fn remove(&mut self, rect: &Rect, matches: &mut dyn FnMut(&T) -> bool) -> bool {
        if let Some(index) = self.index_of(rect)
            && let Some(children) = self.children.as_mut()
        {
            return children[index].remove(rect, matches);
        }
        let found = self
            .items
            .iter()
            .position(|(stored, candidate)| stored == rect && matches(candidate));
        match found {
            Some(position) => {
                self.items.swap_remove(position);
                true
            }
            None => false,
        }
    }
}

/// Quadtree keyed by rectangle, storing arbitrary payloads.
#[derive(Debug, Clone)]
pub struct QuadTree<T> {
    root: QuadNode<T>,
    config: QuadTreeConfig,
    len: usize,
}

/// Per-node debug information, in pre-order.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadNodeInfo {
    pub bounds: Rect,
    pub level: usize,
    /// Items stored directly at this node.
    pub items: usize,
    pub has_children: bool,
}

/// Shape summary returned by [`QuadTree::stats`].
#[derive(Debug, Clone, PartialEq)]
pub struct QuadTreeStats {
    pub node_count: usize,
    /// Deepest level that has a node.
    pub depth: usize,
    pub item_count: usize,
    pub nodes: Vec<QuadNodeInfo>,
}

impl<T> QuadTree<T> {
    /// Create an empty tree covering `bounds` with default thresholds.
    #[must_use]
    pub fn new(bounds: Rect) -> Self {
        Self::with_config(bounds, QuadTreeConfig::default())
    }

    /// Create an empty tree with explicit thresholds.
    #[must_use]
    pub fn with_config(bounds: Rect, config: QuadTreeConfig) -> Self {
        Self {
            root: QuadNode::new(bounds, 0),
            config,
            len: 0,
        }
    }

    /// Root bounds.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.root.bounds
    }

    /// Split thresholds.
    #[must_use]
    pub const fn config(&self) -> QuadTreeConfig {
        self.config
    }

    /// Number of stored items.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the tree holds no items.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Remove every item and collapse to a single root node.
    pub fn clear(&mut self) {
        self.root.items.clear();
        self.root.children = None;
        self.len = 0;
    }

    /// Remove every item and move the root to new bounds.
    pub fn reset(&mut self, bounds: Rect) {
        self.clear();
        self.root.bounds = bounds;
    }

    /// Insert an item under `rect`.
    pub fn insert(&mut self, rect: Rect, item: T) {
        let config = self.config;
        self.root.insert(rect, item, &config);
        self.len += 1;
    }

    /// Visit every item stored in a node whose bounds touch `area`.
    ///
    /// The visited set is a superset of the items touching `area`.
    pub fn visit<'a, F: FnMut(&'a Rect, &'a T)>(&'a self, area: &Rect, mut f: F) {
        let mut stack: SmallVec<[&'a QuadNode<T>; 16]> = SmallVec::new();
        stack.push(&self.root);
        while let Some(node) = stack.pop() {
            if !node.bounds.touches(area) {
                continue;
            }
            for (rect, item) in &node.items {
                f(rect, item);
            }
            if let Some(children) = node.children.as_deref() {
                stack.extend(children.iter().rev());
            }
        }
    }

    /// Candidates that may touch `area`.
    #[must_use]
    pub fn query(&self, area: &Rect) -> Vec<&T> {
        let mut out = Vec::new();
        self.visit(area, |_, item| out.push(item));
        out
    }

    /// Every stored item, in pre-order.
    #[must_use]
    pub fn all_items(&self) -> Vec<&T> {
        let mut out = Vec::with_capacity(self.len);
        let mut stack: SmallVec<[&QuadNode<T>; 16]> = SmallVec::new();
        stack.push(&self.root);
        while let Some(node) = stack.pop() {
            out.extend(node.items.iter().map(|(_, item)| item));
            if let Some(children) = node.children.as_deref() {
                stack.extend(children.iter().rev());
            }
        }
        out
    }

    /// Debug summary of the tree shape.
    #[must_use]
    pub fn stats(&self) -> QuadTreeStats {
        let mut nodes = Vec::new();
        let mut stack: SmallVec<[&QuadNode<T>; 16]> = SmallVec::new();
        stack.push(&self.root);
        while let Some(node) = stack.pop() {
            nodes.push(QuadNodeInfo {
                bounds: node.bounds,
                level: node.level,
                items: node.items.len(),
                has_children: node.children.is_some(),
            });
            if let Some(children) = node.children.as_deref() {
                stack.extend(children.iter().rev());
            }
        }
        QuadTreeStats {
            node_count: nodes.len(),
            depth: nodes.iter().map(|n| n.level).max().unwrap_or(0),
            item_count: self.len,
            nodes,
        }
    }
}

impl<T: PartialEq> QuadTree<T> {
    /// Remove one item previously inserted under `rect`.
    ///
    /// Nodes are not merged back after removal; queries stay correct.
    pub fn remove(&mut self, rect: &Rect, item: &T) -> bool {
        let removed = self.root.remove(rect, &mut |candidate: &T| candidate == item);
        if removed {
            self.len -= 1;
        }
        removed
    }
}
