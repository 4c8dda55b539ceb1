//! Packet traversal: 32 rays walk the tree together.
//!
//! Rays are tracked by index in a small permutation array. At each internal
//! node the active rays are grouped by the sign of their direction along the
//! split axis, so every group visits the children in one order. Inside a
//! group, the rays that still need a child are partitioned to the front and
//! only that prefix descends. Every ray ends with the same hit single-ray
//! traversal would give it.

use super::node::{BvhNodes, Step};
use crate::shape::{RayHit, ShapeCollection};
use crate::tree::partition;
use crate::util::Ray;

/// Number of rays in a packet.
pub const PACKET_SIZE: usize = 32;

/// Rays traced together.
pub type RayPacket = [Ray; PACKET_SIZE];

/// Per-ray results of a packet trace.
pub type HitPacket = [Option<RayHit>; PACKET_SIZE];

pub(crate) fn trace_packet<N, S>(nodes: &N, shapes: &S, rays: &RayPacket) -> HitPacket
where
    N: BvhNodes,
    S: ShapeCollection,
{
    let mut hits: HitPacket = [None; PACKET_SIZE];
    let mut active: [u8; PACKET_SIZE] = std::array::from_fn(|i| i as u8);

    let root = nodes.root();
    let root_aabb = nodes.aabb(root);
    let n = partition(&mut active, |&r| root_aabb.intersect(&rays[r as usize]).is_some());
    if n > 0 {
        trace_node(nodes, shapes, root, rays, &mut active[..n], &mut hits);
    }
    hits
}

fn trace_node<N, S>(
    nodes: &N,
    shapes: &S,
    id: N::Id,
    rays: &RayPacket,
    active: &mut [u8],
    hits: &mut HitPacket,
) where
    N: BvhNodes,
    S: ShapeCollection,
{
    match nodes.step(id) {
        Step::Leaf(range) => {
            for &r in active.iter() {
                let r = r as usize;
                if let Some(hit) = shapes.trace_range(&rays[r], range.clone()) {
                    RayHit::keep_closest(&mut hits[r], hit);
                }
            }
        }
        Step::Internal { axis, children } => {
            let direction = |r: u8| rays[r as usize].direction_on(axis);
            let backward_len = partition(&mut *active, |&r| direction(r) < 0.0);
            let (backward, rest) = active.split_at_mut(backward_len);
            let parallel_len = partition(&mut *rest, |&r| direction(r) == 0.0);
            let (parallel, forward) = rest.split_at_mut(parallel_len);

            let aabbs = children.map(|c| nodes.aabb(c));
            // Same orders as `traverse::visit_order`.
            for (group, order) in [(backward, [1, 0]), (parallel, [1, 0]), (forward, [0, 1])] {
                if group.is_empty() {
                    continue;
                }
                for slot in order {
                    let aabb = &aabbs[slot];
                    let n = partition(&mut *group, |&r| {
                        let r = r as usize;
                        match aabb.intersect(&rays[r]) {
                            Some(entry) => !hits[r].is_some_and(|b| b.t < entry),
                            None => false,
                        }
                    });
                    if n > 0 {
                        trace_node(nodes, shapes, children[slot], rays, &mut group[..n], hits);
                    }
                }
            }
        }
    }
}
