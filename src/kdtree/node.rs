//! k-d tree node types.

use crate::tree::{ChildSlots, NodeIndex, Unlink, NO_CHILD};
use crate::util::{Axis, Vec3};

/// Element stored in a k-d tree: anything with a position.
pub trait KdContent: Clone + Send + Sync {
    fn position(&self) -> Vec3;
}

impl KdContent for Vec3 {
    #[inline]
    fn position(&self) -> Vec3 {
        *self
    }
}

/// Node of a linked k-d tree. Either child may be missing.
#[derive(Debug, Clone)]
pub struct KdNode<T> {
    pub content: T,
    /// Axis the children are split along. Meaningless for leaves.
    pub axis: Axis,
    /// Slot 0 holds coordinates `<=` the node's, slot 1 `>=`.
    pub children: [Option<Box<KdNode<T>>>; 2],
}

impl<T> KdNode<T> {
    pub fn leaf(content: T) -> Self {
        Self::new(content, Axis::X)
    }

    pub fn new(content: T, axis: Axis) -> Self {
        Self {
            content,
            axis,
            children: [None, None],
        }
    }

    /// Builder-style child attachment, mostly for hand-built trees.
    pub fn with_child(mut self, slot: usize, child: KdNode<T>) -> Self {
        self.children[slot] = Some(Box::new(child));
        self
    }

    #[inline]
    pub fn child(&self, slot: usize) -> Option<&KdNode<T>> {
        self.children[slot].as_deref()
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    /// Number of nodes in this subtree.
    pub fn count(&self) -> usize {
        1 + self
            .children
            .iter()
            .flatten()
            .map(|c| c.count())
            .sum::<usize>()
    }
}

/// Node of a packed k-d tree. Children index the same array.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedKdNode<T> {
    pub content: T,
    pub axis: Axis,
    pub(crate) children: [NodeIndex; 2],
}

impl<T> PackedKdNode<T> {
    #[inline]
    pub fn child(&self, slot: usize) -> Option<usize> {
        let index = self.children[slot];
        (index != NO_CHILD).then_some(index as usize)
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children == [NO_CHILD; 2]
    }
}

impl<T> ChildSlots for PackedKdNode<T> {
    fn set_child(&mut self, slot: usize, index: NodeIndex) {
        self.children[slot] = index;
    }
}

impl<T> Unlink for KdNode<T> {
    type Packed = PackedKdNode<T>;

    fn unlink(self) -> (PackedKdNode<T>, [Option<Box<KdNode<T>>>; 2]) {
        (
            PackedKdNode {
                content: self.content,
                axis: self.axis,
                children: [NO_CHILD; 2],
            },
            self.children,
        )
    }
}

/// Read access to k-d nodes, independent of representation.
pub(crate) trait KdNodes<'a, T: 'a> {
    type Id: Copy;

    fn root(&self) -> Self::Id;
    fn content(&self, id: Self::Id) -> &'a T;
    fn axis(&self, id: Self::Id) -> Axis;
    fn child(&self, id: Self::Id, slot: usize) -> Option<Self::Id>;
}

pub(crate) struct LinkedKd<'a, T>(pub &'a KdNode<T>);

impl<'a, T: 'a> KdNodes<'a, T> for LinkedKd<'a, T> {
    type Id = &'a KdNode<T>;

    #[inline]
    fn root(&self) -> &'a KdNode<T> {
        self.0
    }

    #[inline]
    fn content(&self, id: &'a KdNode<T>) -> &'a T {
        &id.content
    }

    #[inline]
    fn axis(&self, id: &'a KdNode<T>) -> Axis {
        id.axis
    }

    #[inline]
    fn child(&self, id: &'a KdNode<T>, slot: usize) -> Option<&'a KdNode<T>> {
        id.child(slot)
    }
}

pub(crate) struct PackedKd<'a, T>(pub &'a [PackedKdNode<T>]);

impl<'a, T: 'a> KdNodes<'a, T> for PackedKd<'a, T> {
    type Id = usize;

    #[inline]
    fn root(&self) -> usize {
        0
    }

    #[inline]
    fn content(&self, id: usize) -> &'a T {
        &self.0[id].content
    }

    #[inline]
    fn axis(&self, id: usize) -> Axis {
        self.0[id].axis
    }

    #[inline]
    fn child(&self, id: usize, slot: usize) -> Option<usize> {
        self.0[id].child(slot)
    }
}
