//! Single-ray traversal over either node representation.

use super::node::{BvhNodes, Step};
use crate::shape::{RayHit, ShapeCollection};
use crate::util::Ray;

/// Child visit order for a ray direction component along the split axis.
#[inline]
pub(crate) fn visit_order(direction: f32) -> [usize; 2] {
    if direction > 0.0 {
        [0, 1]
    } else {
        [1, 0]
    }
}

/// Closest hit below the root.
pub(crate) fn trace_ray<N, S>(nodes: &N, shapes: &S, ray: &Ray) -> Option<RayHit>
where
    N: BvhNodes,
    S: ShapeCollection,
{
    let root = nodes.root();
    nodes.aabb(root).intersect(ray)?;
    let mut best = None;
    trace_node(nodes, shapes, root, ray, &mut best);
    best
}

fn trace_node<N, S>(nodes: &N, shapes: &S, id: N::Id, ray: &Ray, best: &mut Option<RayHit>)
where
    N: BvhNodes,
    S: ShapeCollection,
{
    match nodes.step(id) {
        Step::Leaf(range) => {
            if let Some(hit) = shapes.trace_range(ray, range) {
                RayHit::keep_closest(best, hit);
            }
        }
        Step::Internal { axis, children } => {
            let entries = children.map(|c| nodes.aabb(c).intersect(ray));
            for slot in visit_order(ray.direction_on(axis)) {
                let Some(entry) = entries[slot] else {
                    continue;
                };
                // Nothing inside this child can beat a hit closer than its entry.
                if best.is_some_and(|b| b.t < entry) {
                    continue;
                }
                trace_node(nodes, shapes, children[slot], ray, best);
            }
        }
    }
}

/// First hit found with `t <= max_t`, not necessarily the closest.
pub(crate) fn test_visibility<N, S>(nodes: &N, shapes: &S, ray: &Ray, max_t: f32) -> Option<RayHit>
where
    N: BvhNodes,
    S: ShapeCollection,
{
    let root = nodes.root();
    let entry = nodes.aabb(root).intersect(ray)?;
    if entry > max_t {
        return None;
    }
    any_hit(nodes, shapes, root, ray, max_t)
}

fn any_hit<N, S>(nodes: &N, shapes: &S, id: N::Id, ray: &Ray, max_t: f32) -> Option<RayHit>
where
    N: BvhNodes,
    S: ShapeCollection,
{
    match nodes.step(id) {
        Step::Leaf(range) => shapes.test_visibility_range(ray, max_t, range),
        Step::Internal { axis, children } => {
            for slot in visit_order(ray.direction_on(axis)) {
                let child = children[slot];
                match nodes.aabb(child).intersect(ray) {
                    Some(entry) if entry <= max_t => {
                        if let Some(hit) = any_hit(nodes, shapes, child, ray, max_t) {
                            return Some(hit);
                        }
                    }
                    _ => {}
                }
            }
            None
        }
    }
}
