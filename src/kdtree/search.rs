//! Iterative nearest-neighbour search over a packed k-d tree.
//!
//! Visits nodes in exactly the order of the recursive query and therefore
//! returns the same elements, but keeps its path on a fixed-capacity stack
//! instead of the call stack.

use smallvec::SmallVec;

use super::node::{KdContent, PackedKdNode};
use super::query::{near_slot, Nearest, NeighbourSet};
use crate::shape::Aabb;
use crate::util::Vec3;

/// Stack depth kept inline. Deeper trees spill to the heap.
pub const MAX_SEARCH_DEPTH: usize = 64;

#[derive(Clone, Copy)]
struct Frame {
    node: usize,
    /// Child slot on the target's side.
    near: usize,
    /// Whether the node itself and its far side were handled.
    processed: bool,
    cell: Aabb,
}

/// Nearest-neighbour search specialized for packed trees.
pub struct KdTreeSearch<'a, T> {
    nodes: &'a [PackedKdNode<T>],
    stack: SmallVec<[Frame; MAX_SEARCH_DEPTH]>,
}

impl<'a, T: KdContent> KdTreeSearch<'a, T> {
    /// Searcher over a packed node array (root at index 0).
    ///
    /// Reusable: its stack is kept between queries.
    pub fn new(nodes: &'a [PackedKdNode<T>]) -> Self {
        Self {
            nodes,
            stack: SmallVec::new(),
        }
    }

    /// Same contract as [`KdTree::nearest`](super::KdTree::nearest).
    pub fn nearest<F>(
        &mut self,
        target: Vec3,
        k: usize,
        max_radius: f32,
        filter: F,
        out: &mut Vec<&'a T>,
    ) -> Nearest
    where
        F: Fn(&T) -> bool,
    {
        let mut set = NeighbourSet::new(k, max_radius);
        self.stack.clear();
        if k == 0 || self.nodes.is_empty() {
            return set.finish(out);
        }

        self.descend(0, Aabb::UNBOUNDED, target);
        while let Some(top) = self.stack.last_mut() {
            if top.processed {
                self.stack.pop();
                continue;
            }
            top.processed = true;
            let frame = *top;

            let nodes = self.nodes;
            let node = &nodes[frame.node];
            set.consider(&node.content, target, &filter);

            let far = 1 - frame.near;
            if let Some(child) = node.child(far) {
                let pos = node.content.position()[node.axis.index()];
                let cell = frame.cell.split(node.axis, pos)[far];
                if cell.distance_to(target) <= set.radius() {
                    self.descend(child, cell, target);
                }
            }
        }
        set.finish(out)
    }

    /// Push `index` and its chain of near-side children.
    fn descend(&mut self, mut index: usize, mut cell: Aabb, target: Vec3) {
        loop {
            let node = &self.nodes[index];
            let axis = node.axis;
            let pos = node.content.position()[axis.index()];
            let near = near_slot(pos, target[axis.index()]);
            self.stack.push(Frame {
                node: index,
                near,
                processed: false,
                cell,
            });
            match node.child(near) {
                Some(child) => {
                    cell = cell.split(axis, pos)[near];
                    index = child;
                }
                None => break,
            }
        }
    }
}
