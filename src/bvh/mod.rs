//! Bounding volume hierarchy over a shape collection.
//!
//! A [`Bvh`] is built linked by [`BvhBuilder`], can be traced in that form,
//! and can be [packed](Bvh::pack) once into a breadth-first node array. Both
//! forms return identical results for every query.
//!
//! ```ignore
//! let mut bvh = BvhBuilder::new(settings).build(mesh)?;
//! bvh.pack()?;
//! let hit = bvh.trace_ray(&ray);
//! ```

mod builder;
mod node;
mod packet;
mod traverse;

pub use builder::{BvhBuilder, SplitCandidate, SplitDecision};
pub use node::{BvhContent, BvhNode, PackedBvhNode};
pub use packet::{HitPacket, RayPacket, PACKET_SIZE};

use std::ops::Range;

use node::{LinkedNodes, PackedNodes};

use crate::shape::{Aabb, RayHit, ShapeCollection, ShapeList};
use crate::tree::{TreeRepr, TreeStats};
use crate::util::{Ray, Result};

/// BVH owning the (reordered) collection it indexes.
#[derive(Debug)]
pub struct Bvh<S = ShapeList> {
    shapes: S,
    repr: TreeRepr<BvhNode, PackedBvhNode>,
    stats: TreeStats,
}

impl<S: ShapeCollection> Bvh<S> {
    pub(crate) fn from_linked(shapes: S, root: Box<BvhNode>, stats: TreeStats) -> Self {
        Self {
            shapes,
            repr: TreeRepr::Linked(root),
            stats,
        }
    }

    /// The collection in leaf order.
    #[inline]
    pub fn shapes(&self) -> &S {
        &self.shapes
    }

    /// Number of nodes.
    #[inline]
    pub fn size(&self) -> usize {
        self.stats.nodes
    }

    #[inline]
    pub fn stats(&self) -> &TreeStats {
        &self.stats
    }

    #[inline]
    pub fn is_packed(&self) -> bool {
        self.repr.is_packed()
    }

    /// Bounds of the whole tree.
    pub fn bounds(&self) -> Aabb {
        match &self.repr {
            TreeRepr::Linked(root) => root.aabb,
            TreeRepr::Packed(nodes) => nodes[0].aabb,
        }
    }

    /// Root of the linked form, `None` once packed.
    pub fn root(&self) -> Option<&BvhNode> {
        match &self.repr {
            TreeRepr::Linked(root) => Some(root.as_ref()),
            TreeRepr::Packed(_) => None,
        }
    }

    /// Node array of the packed form, root at index 0.
    pub fn packed_nodes(&self) -> Option<&[PackedBvhNode]> {
        match &self.repr {
            TreeRepr::Linked(_) => None,
            TreeRepr::Packed(nodes) => Some(nodes.as_slice()),
        }
    }

    /// Element ranges of all leaves in breadth-first order.
    pub fn leaf_ranges(&self) -> Vec<Range<usize>> {
        let mut ranges = Vec::with_capacity(self.stats.leaves);
        match &self.repr {
            TreeRepr::Linked(root) => {
                let mut queue = std::collections::VecDeque::from([&**root]);
                while let Some(node) = queue.pop_front() {
                    match &node.content {
                        BvhContent::Leaf(range) => ranges.push(range.clone()),
                        BvhContent::Internal { children, .. } => {
                            queue.extend(children.iter().map(|c| &**c));
                        }
                    }
                }
            }
            TreeRepr::Packed(nodes) => ranges.extend(nodes.iter().filter_map(|n| n.leaf_range())),
        }
        ranges
    }

    /// Convert to the packed form. Fails if already packed.
    #[tracing::instrument(skip_all, fields(nodes = self.stats.nodes))]
    pub fn pack(&mut self) -> Result<()> {
        self.repr.pack(self.stats.nodes)
    }

    /// Closest hit along `ray`.
    pub fn trace_ray(&self, ray: &Ray) -> Option<RayHit> {
        match &self.repr {
            TreeRepr::Linked(root) => {
                traverse::trace_ray(&LinkedNodes(root.as_ref()), &self.shapes, ray)
            }
            TreeRepr::Packed(nodes) => {
                traverse::trace_ray(&PackedNodes(nodes.as_slice()), &self.shapes, ray)
            }
        }
    }

    /// Any hit with `t <= max_t`, for shadow rays.
    pub fn test_visibility(&self, ray: &Ray, max_t: f32) -> Option<RayHit> {
        match &self.repr {
            TreeRepr::Linked(root) => {
                traverse::test_visibility(&LinkedNodes(root.as_ref()), &self.shapes, ray, max_t)
            }
            TreeRepr::Packed(nodes) => {
                traverse::test_visibility(&PackedNodes(nodes.as_slice()), &self.shapes, ray, max_t)
            }
        }
    }

    /// Closest hit for each of [`PACKET_SIZE`] rays, traced together.
    ///
    /// Every entry equals what [`Bvh::trace_ray`] returns for that ray.
    pub fn trace_rays(&self, rays: &RayPacket) -> HitPacket {
        match &self.repr {
            TreeRepr::Linked(root) => {
                packet::trace_packet(&LinkedNodes(root.as_ref()), &self.shapes, rays)
            }
            TreeRepr::Packed(nodes) => {
                packet::trace_packet(&PackedNodes(nodes.as_slice()), &self.shapes, rays)
            }
        }
    }
}
