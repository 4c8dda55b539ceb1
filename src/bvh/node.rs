//! BVH node types and the node-access seam shared by traversal code.

use std::ops::Range;

use crate::shape::Aabb;
use crate::tree::{ChildSlots, NodeIndex, Unlink, NO_CHILD};
use crate::util::Axis;

/// Node of a linked BVH.
#[derive(Debug)]
pub struct BvhNode {
    pub aabb: Aabb,
    pub content: BvhContent,
}

#[derive(Debug)]
pub enum BvhContent {
    /// Positions of the leaf's elements in the tree's collection.
    Leaf(Range<usize>),
    Internal {
        /// Axis the node was split along.
        axis: Axis,
        children: [Box<BvhNode>; 2],
    },
}

impl BvhNode {
    pub fn leaf(aabb: Aabb, range: Range<usize>) -> Self {
        Self {
            aabb,
            content: BvhContent::Leaf(range),
        }
    }

    pub fn internal(aabb: Aabb, axis: Axis, left: Box<BvhNode>, right: Box<BvhNode>) -> Self {
        Self {
            aabb,
            content: BvhContent::Internal {
                axis,
                children: [left, right],
            },
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self.content, BvhContent::Leaf(_))
    }
}

/// Node of a packed BVH. Children are indices into the same array.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedBvhNode {
    pub aabb: Aabb,
    content: PackedContent,
}

#[derive(Debug, Clone, PartialEq)]
enum PackedContent {
    Leaf { start: u32, end: u32 },
    Internal { axis: Axis, children: [NodeIndex; 2] },
}

impl PackedBvhNode {
    /// Element range for a leaf.
    #[inline]
    pub fn leaf_range(&self) -> Option<Range<usize>> {
        match self.content {
            PackedContent::Leaf { start, end } => Some(start as usize..end as usize),
            PackedContent::Internal { .. } => None,
        }
    }

    /// Split axis and child indices for an internal node.
    #[inline]
    pub fn children(&self) -> Option<(Axis, [usize; 2])> {
        match self.content {
            PackedContent::Leaf { .. } => None,
            PackedContent::Internal { axis, children } => {
                Some((axis, children.map(|c| c as usize)))
            }
        }
    }
}

impl ChildSlots for PackedBvhNode {
    fn set_child(&mut self, slot: usize, index: NodeIndex) {
        if let PackedContent::Internal { children, .. } = &mut self.content {
            children[slot] = index;
        }
    }
}

impl Unlink for BvhNode {
    type Packed = PackedBvhNode;

    fn unlink(self) -> (PackedBvhNode, [Option<Box<BvhNode>>; 2]) {
        match self.content {
            BvhContent::Leaf(range) => (
                PackedBvhNode {
                    aabb: self.aabb,
                    content: PackedContent::Leaf {
                        start: range.start as u32,
                        end: range.end as u32,
                    },
                },
                [None, None],
            ),
            BvhContent::Internal { axis, children: [left, right] } => (
                PackedBvhNode {
                    aabb: self.aabb,
                    content: PackedContent::Internal {
                        axis,
                        children: [NO_CHILD; 2],
                    },
                },
                [Some(left), Some(right)],
            ),
        }
    }
}

/// What traversal finds at a node.
pub(crate) enum Step<Id> {
    Leaf(Range<usize>),
    Internal { axis: Axis, children: [Id; 2] },
}

/// Read access to BVH nodes, independent of representation.
pub(crate) trait BvhNodes {
    type Id: Copy;

    fn root(&self) -> Self::Id;
    fn aabb(&self, id: Self::Id) -> Aabb;
    fn step(&self, id: Self::Id) -> Step<Self::Id>;
}

/// Linked nodes, addressed by reference.
pub(crate) struct LinkedNodes<'a>(pub &'a BvhNode);

impl<'a> BvhNodes for LinkedNodes<'a> {
    type Id = &'a BvhNode;

    #[inline]
    fn root(&self) -> &'a BvhNode {
        self.0
    }

    #[inline]
    fn aabb(&self, id: &'a BvhNode) -> Aabb {
        id.aabb
    }

    #[inline]
    fn step(&self, id: &'a BvhNode) -> Step<&'a BvhNode> {
        match &id.content {
            BvhContent::Leaf(range) => Step::Leaf(range.clone()),
            BvhContent::Internal { axis, children } => Step::Internal {
                axis: *axis,
                children: [&*children[0], &*children[1]],
            },
        }
    }
}

/// Packed nodes, addressed by index.
pub(crate) struct PackedNodes<'a>(pub &'a [PackedBvhNode]);

impl BvhNodes for PackedNodes<'_> {
    type Id = usize;

    #[inline]
    fn root(&self) -> usize {
        0
    }

    #[inline]
    fn aabb(&self, id: usize) -> Aabb {
        self.0[id].aabb
    }

    #[inline]
    fn step(&self, id: usize) -> Step<usize> {
        match self.0[id].content {
            PackedContent::Leaf { start, end } => Step::Leaf(start as usize..end as usize),
            PackedContent::Internal { axis, children } => Step::Internal {
                axis,
                children: children.map(|c| c as usize),
            },
        }
    }
}
