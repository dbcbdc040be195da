//! A red-black tree over ordered, unique keys.
#![warn(missing_docs)]

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::TryReserveError;
use std::fmt;
use std::mem;

use log::{debug, trace};

mod rb_node;

pub use rb_node::{Color, LeafRef, Node, NodeId, Side};
use rb_node::Slot;

/// A red-black tree. Duplicate keys are rejected.
///
/// Nodes live in an arena indexed by [`NodeId`]; slot 0 is the black leaf
/// sentinel shared by every missing child.
pub struct RbTree<K> {
    slots: Vec<Slot<K>>,
    root: NodeId,
    free: Option<NodeId>,
    length: usize,
}

impl<K> RbTree<K> {
    /// Creates a new empty tree.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty tree with room for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity + 1);
        slots.push(Slot::Leaf);
        RbTree {
            slots,
            root: NodeId::LEAF,
            free: None,
            length: 0,
        }
    }

    /// Returns the number of keys in the tree.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Returns true if the tree holds no keys.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Removes every key. Outstanding handles all become stale.
    pub fn clear(&mut self) {
        self.slots.truncate(1);
        self.root = NodeId::LEAF;
        self.free = None;
        self.length = 0;
    }

    /// The root node, or [`NodeId::LEAF`] when empty.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Resolves a handle. Returns `None` for the sentinel and for freed slots.
    pub fn node(&self, id: NodeId) -> Option<&Node<K>> {
        self.slots.get(id.index()).and_then(Slot::as_node)
    }

    /// Key stored at `id`, if it names a live node.
    pub fn key(&self, id: NodeId) -> Option<&K> {
        self.node(id).map(Node::key)
    }

    /// Color of `id`. The sentinel, and any handle without a live node,
    /// reports [`Color::Black`].
    pub fn color(&self, id: NodeId) -> Color {
        self.node(id).map_or(Color::Black, Node::color)
    }

    /// Left child of `id`; the sentinel if `id` is not a live node.
    pub fn left(&self, id: NodeId) -> NodeId {
        self.child(id, Side::Left)
    }

    /// Right child of `id`; the sentinel if `id` is not a live node.
    pub fn right(&self, id: NodeId) -> NodeId {
        self.child(id, Side::Right)
    }

    /// Parent of `id`; `None` for the root and for non-live handles.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(Node::parent)
    }

    /// Number of black nodes from the root down to a leaf sentinel, the
    /// root itself excluded and the sentinel included. Zero when empty.
    pub fn black_height(&self) -> usize {
        let mut height = 0;
        let mut current = self.root;
        while !current.is_leaf() {
            current = self.left(current);
            if self.color(current) == Color::Black {
                height += 1;
            }
        }
        height
    }

    /// Every live node, in pre-order.
    pub fn all_nodes(&self) -> Vec<NodeId> {
        let mut result = Vec::with_capacity(self.length);
        let mut stack = Vec::new();
        if !self.root.is_leaf() {
            stack.push(self.root);
        }
        while let Some(id) = stack.pop() {
            result.push(id);
            // Right first so the left subtree pops first
            for child in [self.right(id), self.left(id)] {
                if !child.is_leaf() {
                    stack.push(child);
                }
            }
        }
        result
    }

    /// Every leaf sentinel position, left to right.
    pub fn leaf_nodes(&self) -> Vec<LeafRef> {
        if self.root.is_leaf() {
            return vec![LeafRef {
                parent: None,
                side: Side::Left,
            }];
        }
        let mut result = Vec::with_capacity(self.length + 1);
        for id in self.all_nodes() {
            for side in [Side::Left, Side::Right] {
                if self.child(id, side).is_leaf() {
                    result.push(LeafRef {
                        parent: Some(id),
                        side,
                    });
                }
            }
        }
        result
    }

    /// Keys in ascending order.
    pub fn in_order_keys(&self) -> Vec<&K> {
        let mut result = Vec::with_capacity(self.length);
        let mut stack = Vec::new();
        let mut current = self.root;
        loop {
            while let Some(node) = self.node(current) {
                stack.push(current);
                current = node.left;
            }
            match stack.pop() {
                Some(id) => {
                    if let Some(node) = self.node(id) {
                        result.push(&node.key);
                        current = node.right;
                    }
                }
                None => break,
            }
        }
        result
    }

    /// Smallest key.
    pub fn min(&self) -> Option<&K> {
        self.key(self.extreme(self.root, Side::Left))
    }

    /// Greatest key.
    pub fn max(&self) -> Option<&K> {
        self.key(self.extreme(self.root, Side::Right))
    }

    fn extreme(&self, mut id: NodeId, side: Side) -> NodeId {
        while let Some(node) = self.node(id) {
            let next = node.child(side);
            if next.is_leaf() {
                break;
            }
            id = next;
        }
        id
    }

    fn child(&self, id: NodeId, side: Side) -> NodeId {
        self.node(id).map_or(NodeId::LEAF, |node| node.child(side))
    }

    fn live(&self, id: NodeId) -> &Node<K> {
        match self.node(id) {
            Some(node) => node,
            None => unreachable!("{id:?} is not a live node"),
        }
    }

    fn live_mut(&mut self, id: NodeId) -> &mut Node<K> {
        match self.slots.get_mut(id.index()).and_then(Slot::as_node_mut) {
            Some(node) => node,
            None => unreachable!("{id:?} is not a live node"),
        }
    }

    fn set_color(&mut self, id: NodeId, color: Color) {
        match self.slots.get_mut(id.index()).and_then(Slot::as_node_mut) {
            Some(node) => node.color = color,
            None => debug_assert_eq!(color, Color::Black, "sentinel must stay black"),
        }
    }

    fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) {
        // The sentinel's parent is never recorded
        if let Some(node) = self.slots.get_mut(id.index()).and_then(Slot::as_node_mut) {
            node.parent = parent;
        }
    }

    fn side_of(&self, id: NodeId, parent: NodeId) -> Side {
        if self.live(parent).left == id {
            Side::Left
        } else {
            Side::Right
        }
    }

    /// Puts `new` where `old` hung under `parent` (or at the root).
    fn replace_in_parent(&mut self, old: NodeId, parent: Option<NodeId>, new: NodeId) {
        match parent {
            None => self.root = new,
            Some(p) => {
                let side = self.side_of(old, p);
                self.live_mut(p).set_child(side, new);
            }
        }
        self.set_parent(new, parent);
    }

    /// Rotates toward `dir` around `pivot`: a left rotation lifts the right
    /// child into the pivot's place and hands it the pivot as left child.
    fn rotate(&mut self, pivot: NodeId, dir: Side) {
        let riser = self.child(pivot, dir.opposite());
        debug_assert!(!pivot.is_leaf() && !riser.is_leaf());
        trace!("rotate {dir:?} at {pivot:?}, {riser:?} rises");

        let inner = self.child(riser, dir);
        self.live_mut(pivot).set_child(dir.opposite(), inner);
        self.set_parent(inner, Some(pivot));

        let parent = self.live(pivot).parent;
        self.replace_in_parent(pivot, parent, riser);

        self.live_mut(riser).set_child(dir, pivot);
        self.set_parent(pivot, Some(riser));
    }

    fn alloc(
        &mut self,
        node: Node<K>,
        grow: impl FnOnce(&mut Vec<Slot<K>>) -> Result<(), TryReserveError>,
    ) -> Result<NodeId, TryReserveError> {
        if let Some(id) = self.free {
            self.free = match self.slots[id.index()] {
                Slot::Vacant { next_free } => next_free,
                _ => unreachable!("free list points at {id:?}, which is in use"),
            };
            self.slots[id.index()] = Slot::Occupied(node);
            return Ok(id);
        }
        grow(&mut self.slots)?;
        let id = NodeId(self.slots.len());
        self.slots.push(Slot::Occupied(node));
        Ok(id)
    }

    fn release(&mut self, id: NodeId) -> Node<K> {
        let vacant = Slot::Vacant {
            next_free: self.free,
        };
        match mem::replace(&mut self.slots[id.index()], vacant) {
            Slot::Occupied(node) => {
                self.free = Some(id);
                node
            }
            _ => unreachable!("released {id:?} twice"),
        }
    }

    fn insert_fixup(&mut self, mut id: NodeId) {
        while let Some(parent) = self.parent(id).filter(|&p| self.color(p) == Color::Red) {
            // A red parent is never the root
            let Some(grandparent) = self.parent(parent) else {
                break;
            };
            let side = self.side_of(parent, grandparent);
            let uncle = self.child(grandparent, side.opposite());

            if self.color(uncle) == Color::Red {
                trace!("insert fixup: red uncle {uncle:?}, recolor {grandparent:?}");
                self.set_color(parent, Color::Black);
                self.set_color(uncle, Color::Black);
                self.set_color(grandparent, Color::Red);
                id = grandparent;
                continue;
            }

            if id == self.child(parent, side.opposite()) {
                trace!("insert fixup: inner child {id:?}, rotate at parent");
                self.rotate(parent, side);
                id = parent;
            }
            let Some(parent) = self.parent(id) else {
                break;
            };
            trace!("insert fixup: outer child {id:?}, rotate at {grandparent:?}");
            self.set_color(parent, Color::Black);
            self.set_color(grandparent, Color::Red);
            self.rotate(grandparent, side.opposite());
            break;
        }
        let root = self.root;
        self.set_color(root, Color::Black);
    }

    // `parent` is tracked explicitly because `id` may be the sentinel.
    fn delete_fixup(&mut self, mut id: NodeId, mut parent: Option<NodeId>) {
        while id != self.root && self.color(id) == Color::Black {
            let Some(p) = parent else {
                break;
            };
            let side = if self.left(p) == id {
                Side::Left
            } else {
                Side::Right
            };
            let far = side.opposite();
            let mut sibling = self.child(p, far);

            if self.color(sibling) == Color::Red {
                trace!("delete fixup: red sibling {sibling:?}");
                self.set_color(sibling, Color::Black);
                self.set_color(p, Color::Red);
                self.rotate(p, side);
                sibling = self.child(p, far);
            }
            debug_assert!(!sibling.is_leaf(), "double black node without a sibling");

            let near_black = self.color(self.child(sibling, side)) == Color::Black;
            let far_black = self.color(self.child(sibling, far)) == Color::Black;
            if near_black && far_black {
                trace!("delete fixup: black sibling {sibling:?} with black children");
                self.set_color(sibling, Color::Red);
                id = p;
                parent = self.parent(p);
                continue;
            }

            if far_black {
                trace!("delete fixup: near child of {sibling:?} is red, rotate at sibling");
                let near = self.child(sibling, side);
                self.set_color(near, Color::Black);
                self.set_color(sibling, Color::Red);
                self.rotate(sibling, far);
                sibling = self.child(p, far);
            }

            trace!("delete fixup: far child of {sibling:?} is red, rotate at {p:?}");
            let parent_color = self.color(p);
            self.set_color(sibling, parent_color);
            self.set_color(p, Color::Black);
            let far_child = self.child(sibling, far);
            self.set_color(far_child, Color::Black);
            self.rotate(p, side);
            id = self.root;
            parent = None;
        }
        self.set_color(id, Color::Black);
    }
}

impl<K> Default for RbTree<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug> fmt::Debug for RbTree<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.in_order_keys()).finish()
    }
}

impl<K> RbTree<K>
where
    K: Ord,
{
    /// Finds the node holding `key`.
    pub fn find_node<Q: ?Sized + Ord>(&self, key: &Q) -> Option<NodeId>
    where
        K: Borrow<Q>,
    {
        let mut current = self.root;
        while let Some(node) = self.node(current) {
            current = match key.cmp(node.key.borrow()) {
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
                Ordering::Equal => return Some(current),
            };
        }
        None
    }

    /// Returns true if `key` is in the tree.
    pub fn contains<Q: ?Sized + Ord>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
    {
        self.find_node(key).is_some()
    }

    /// Inserts `key`.
    /// Returns `(true, new)` on insertion, or `(false, existing)` if the key
    /// was already present, in which case the tree is unchanged.
    pub fn insert_node(&mut self, key: K) -> (bool, NodeId) {
        let grow = |slots: &mut Vec<Slot<K>>| -> Result<(), TryReserveError> {
            slots.reserve(1);
            Ok(())
        };
        match self.insert_with(key, grow) {
            Ok(inserted) => inserted,
            Err(_) => unreachable!("infallible growth reported an error"),
        }
    }

    /// Like [`insert_node`](Self::insert_node), but reports allocation
    /// failure instead of aborting.
    pub fn try_insert_node(&mut self, key: K) -> Result<(bool, NodeId), TryReserveError> {
        self.insert_with(key, |slots| slots.try_reserve(1))
    }

    // The arena only grows once the descent has found a free leaf slot.
    fn insert_with(
        &mut self,
        key: K,
        grow: impl FnOnce(&mut Vec<Slot<K>>) -> Result<(), TryReserveError>,
    ) -> Result<(bool, NodeId), TryReserveError> {
        let mut parent = None;
        let mut side = Side::Left;
        let mut current = self.root;
        while let Some(node) = self.node(current) {
            side = match key.cmp(&node.key) {
                Ordering::Less => Side::Left,
                Ordering::Greater => Side::Right,
                Ordering::Equal => {
                    debug!("insert rejected: key already at {current:?}");
                    return Ok((false, current));
                }
            };
            parent = Some(current);
            current = node.child(side);
        }

        let id = self.alloc(Node::new(key, parent), grow)?;
        match parent {
            None => self.root = id,
            Some(p) => self.live_mut(p).set_child(side, id),
        }
        self.length += 1;
        self.insert_fixup(id);
        debug!("inserted {id:?}, len {}", self.length);
        Ok((true, id))
    }

    /// Removes `key`. Returns false if it was not present.
    ///
    /// A node with two children keeps its slot and receives its in-order
    /// successor's key; the successor's slot is freed instead.
    pub fn delete_node<Q: ?Sized + Ord>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
    {
        let Some(target) = self.find_node(key) else {
            debug!("delete: key not found");
            return false;
        };

        let (left, right) = (self.left(target), self.right(target));
        let removed = if !left.is_leaf() && !right.is_leaf() {
            self.extreme(right, Side::Left)
        } else {
            target
        };

        let replacement = match self.left(removed) {
            l if l.is_leaf() => self.right(removed),
            l => l,
        };
        let parent = self.parent(removed);
        let removed_color = self.color(removed);
        self.replace_in_parent(removed, parent, replacement);

        let node = self.release(removed);
        if removed != target {
            self.live_mut(target).key = node.key;
        }
        self.length -= 1;

        if removed_color == Color::Black {
            self.delete_fixup(replacement, parent);
        }
        debug!("deleted {removed:?}, len {}", self.length);
        true
    }
}
