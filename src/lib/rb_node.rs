use std::fmt;

/// Color of a node. Leaf sentinels are always [`Color::Black`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    /// Red node.
    Red,
    /// Black node.
    Black,
}

/// Which child slot of a parent a node hangs from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The left (smaller keys) child.
    Left,
    /// The right (greater keys) child.
    Right,
}

impl Side {
    /// Returns the mirrored side.
    pub fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Handle to a node stored in an [`RbTree`](crate::RbTree).
///
/// Handles are plain indices and do not keep the node alive. A handle is
/// invalidated by a later `delete_node` that removes its node, or that copies
/// an in-order successor's key into it. Nothing tracks this: a stale handle
/// may resolve to nothing, to a node holding a different key, or (once the
/// slot is reused by an insertion) to an unrelated node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(super) usize);

impl NodeId {
    /// The shared leaf sentinel that stands in for every missing child.
    pub const LEAF: NodeId = NodeId(0);

    /// Returns true if this handle names the leaf sentinel.
    pub fn is_leaf(self) -> bool {
        self == Self::LEAF
    }

    pub(super) fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_leaf() {
            f.write_str("NodeId(LEAF)")
        } else {
            write!(f, "NodeId({})", self.0)
        }
    }
}

/// A live node: one stored key plus its links.
#[derive(Debug)]
pub struct Node<K> {
    pub(super) key: K,
    pub(super) color: Color,
    pub(super) left: NodeId,
    pub(super) right: NodeId,
    pub(super) parent: Option<NodeId>,
}

impl<K> Node<K> {
    // New nodes are red with two sentinel children.
    pub(super) fn new(key: K, parent: Option<NodeId>) -> Self {
        Node {
            key,
            color: Color::Red,
            left: NodeId::LEAF,
            right: NodeId::LEAF,
            parent,
        }
    }

    /// The stored key.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// The node's current color.
    pub fn color(&self) -> Color {
        self.color
    }

    /// Left child, or [`NodeId::LEAF`].
    pub fn left(&self) -> NodeId {
        self.left
    }

    /// Right child, or [`NodeId::LEAF`].
    pub fn right(&self) -> NodeId {
        self.right
    }

    /// Parent node, `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub(super) fn child(&self, side: Side) -> NodeId {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    pub(super) fn set_child(&mut self, side: Side, child: NodeId) {
        match side {
            Side::Left => self.left = child,
            Side::Right => self.right = child,
        }
    }
}

/// Position of one leaf sentinel: the child slot `side` of `parent`.
///
/// `parent` is `None` only for the empty tree, whose root is the sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafRef {
    /// Node owning the sentinel slot.
    pub parent: Option<NodeId>,
    /// Which child slot of `parent` holds the sentinel.
    pub side: Side,
}

impl LeafRef {
    /// The sentinel itself.
    pub fn id(&self) -> NodeId {
        NodeId::LEAF
    }
}

/// One cell of the tree's arena.
pub(super) enum Slot<K> {
    /// Slot 0, the immutable black sentinel.
    Leaf,
    /// A live node.
    Occupied(Node<K>),
    /// Freed cell, chained on the free list.
    Vacant { next_free: Option<NodeId> },
}

impl<K> Slot<K> {
    pub(super) fn as_node(&self) -> Option<&Node<K>> {
        match self {
            Slot::Occupied(node) => Some(node),
            _ => None,
        }
    }

    pub(super) fn as_node_mut(&mut self) -> Option<&mut Node<K>> {
        match self {
            Slot::Occupied(node) => Some(node),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Left.opposite(), Side::Right);
        assert_eq!(Side::Right.opposite(), Side::Left);
        assert_eq!(Side::Left.opposite().opposite(), Side::Left);
    }

    #[test]
    fn test_new_node_is_red_leaf() {
        let node = Node::new(7, Some(NodeId(3)));
        assert_eq!(*node.key(), 7);
        assert_eq!(node.color(), Color::Red);
        assert!(node.left().is_leaf());
        assert!(node.right().is_leaf());
        assert_eq!(node.parent(), Some(NodeId(3)));
    }

    #[test]
    fn test_set_child() {
        let mut node = Node::new(1, None);
        node.set_child(Side::Right, NodeId(5));
        assert_eq!(node.child(Side::Right), NodeId(5));
        assert!(node.child(Side::Left).is_leaf());
        node.set_child(Side::Left, NodeId(2));
        assert_eq!(node.left(), NodeId(2));
    }

    #[test]
    fn test_slot_views() {
        let mut slot = Slot::Occupied(Node::new(4, None));
        assert!(slot.as_node().is_some());
        if let Some(node) = slot.as_node_mut() {
            node.color = Color::Black;
        }
        assert_eq!(slot.as_node().map(Node::color), Some(Color::Black));

        assert!(Slot::<i32>::Leaf.as_node().is_none());
        assert!(Slot::<i32>::Vacant { next_free: None }.as_node().is_none());
    }

    #[test]
    fn test_leaf_handle() {
        assert!(NodeId::LEAF.is_leaf());
        assert!(!NodeId(1).is_leaf());
        assert_eq!(format!("{:?}", NodeId::LEAF), "NodeId(LEAF)");
        assert_eq!(format!("{:?}", NodeId(9)), "NodeId(9)");

        let leaf = LeafRef {
            parent: Some(NodeId(2)),
            side: Side::Left,
        };
        assert!(leaf.id().is_leaf());
    }
}
