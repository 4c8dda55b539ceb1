//! Parallel SAH builder.
//!
//! Each node sorts its elements by centroid along every axis in turn, sweeps
//! prefix/suffix bounding areas to price every split position with the
//! surface area heuristic, and becomes a leaf unless some split is strictly
//! cheaper than intersecting all of its elements. The two halves of a split
//! are disjoint views of the collection, built with `rayon::join` when large.

use super::node::{BvhContent, BvhNode};
use super::Bvh;
use crate::shape::{Aabb, ShapeCollection, ShapeView};
use crate::tree::{exclusive_build, TreeStats};
use crate::util::{Axis, BuildSettings, Error, Result};

/// Cheapest split found for a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitCandidate {
    pub axis: Axis,
    /// Number of elements going left, in `1..count`.
    pub index: usize,
    pub cost: f32,
}

/// Result of pricing every split of a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitDecision {
    /// Bounds of all elements.
    pub bounds: Aabb,
    /// Cost of keeping every element in one leaf.
    pub leaf_cost: f32,
    /// Cheapest split cost over all axes and positions (infinite for one element).
    pub min_split_cost: f32,
    /// Chosen split; `Some` only when strictly cheaper than `leaf_cost`.
    pub split: Option<SplitCandidate>,
    /// Axis the view is sorted by on return.
    pub sorted_by: Axis,
}

/// Builds a [`Bvh`] over any [`ShapeCollection`].
#[derive(Debug, Clone, Default)]
pub struct BvhBuilder {
    settings: BuildSettings,
}

impl BvhBuilder {
    pub fn new(settings: BuildSettings) -> Self {
        Self { settings }
    }

    #[inline]
    pub fn settings(&self) -> &BuildSettings {
        &self.settings
    }

    /// Build a linked BVH, taking ownership of `shapes`.
    ///
    /// The collection is reordered so every leaf covers a contiguous range.
    /// Waits for any other running build first.
    #[tracing::instrument(skip_all, fields(count = shapes.count()))]
    pub fn build<S: ShapeCollection>(&self, mut shapes: S) -> Result<Bvh<S>> {
        let count = shapes.count();
        if count == 0 {
            return Err(Error::EmptyInput("BVH"));
        }
        let _guard = exclusive_build("BVH");

        let (root, size) = {
            let mut view = shapes.view_mut();
            view.sort_by_centroid(Axis::X, self.settings.should_sort_parallel(count));
            self.build_node(view, Axis::X)
        };

        let stats = collect_stats(&root);
        debug_assert_eq!(stats.nodes, size);
        tracing::debug!("BVH built: {stats}");
        Ok(Bvh::from_linked(shapes, root, stats))
    }

    /// Build the subtree over `view`, which is sorted by `presorted`.
    fn build_node<V: ShapeView>(&self, mut view: V, presorted: Axis) -> (Box<BvhNode>, usize) {
        if view.count() == 1 {
            let aabb = view.aabb(0);
            return (Box::new(BvhNode::leaf(aabb, view.range())), 1);
        }

        let decision = self.evaluate_split(&mut view, presorted);
        let Some(split) = decision.split else {
            return (Box::new(BvhNode::leaf(decision.bounds, view.range())), 1);
        };

        let count = view.count();
        if decision.sorted_by != split.axis {
            view.sort_by_centroid(split.axis, self.settings.should_sort_parallel(count));
        }
        let (left, right) = view.split(split.index);

        let ((left, left_size), (right, right_size)) = if self.settings.should_fork(count) {
            rayon::join(
                || self.build_node(left, split.axis),
                || self.build_node(right, split.axis),
            )
        } else {
            (
                self.build_node(left, split.axis),
                self.build_node(right, split.axis),
            )
        };

        let node = BvhNode::internal(decision.bounds, split.axis, left, right);
        (Box::new(node), left_size + right_size + 1)
    }

    /// Price every split of `view` along all three axes, `presorted` first.
    ///
    /// The cost of putting the first `k` of `n` elements left is
    /// `traversal + (area_l / area) * k * isect + (area_r / area) * (n - k) * isect`.
    /// Leaves the view sorted by the last axis examined.
    pub fn evaluate_split<V: ShapeView>(&self, view: &mut V, presorted: Axis) -> SplitDecision {
        let n = view.count();
        let intersect = self.settings.intersect_cost;
        let traversal = self.settings.traversal_cost;
        let parallel = self.settings.should_sort_parallel(n);

        let leaf_cost = n as f32 * intersect;
        let mut decision = SplitDecision {
            bounds: view.aabb(0),
            leaf_cost,
            min_split_cost: f32::INFINITY,
            split: None,
            sorted_by: presorted,
        };
        if n < 2 {
            return decision;
        }

        // left_area[k - 1]: area of the bounds of the first k elements.
        let mut left_area = vec![0.0f32; n];
        for axis in Axis::starting_with(presorted) {
            if decision.sorted_by != axis {
                view.sort_by_centroid(axis, parallel);
                decision.sorted_by = axis;
            }

            let mut bounds = view.aabb(0);
            left_area[0] = bounds.surface_area();
            for (i, area) in left_area.iter_mut().enumerate().skip(1) {
                bounds = bounds.merge(&view.aabb(i));
                *area = bounds.surface_area();
            }
            decision.bounds = bounds;
            let total = left_area[n - 1];

            let mut right = view.aabb(n - 1);
            for k in (1..n).rev() {
                let cost = traversal
                    + (left_area[k - 1] / total) * k as f32 * intersect
                    + (right.surface_area() / total) * (n - k) as f32 * intersect;
                decision.min_split_cost = decision.min_split_cost.min(cost);

                let to_beat = decision.split.map_or(leaf_cost, |s| s.cost);
                if cost < to_beat {
                    decision.split = Some(SplitCandidate { axis, index: k, cost });
                }
                right = right.merge(&view.aabb(k - 1));
            }
        }
        decision
    }
}

fn collect_stats(root: &BvhNode) -> TreeStats {
    let mut stats = TreeStats::default();
    let mut stack = vec![(root, 1)];
    while let Some((node, depth)) = stack.pop() {
        match &node.content {
            BvhContent::Leaf(range) => stats.leaf(depth, range.len()),
            BvhContent::Internal { children, .. } => {
                stats.internal(depth);
                stack.push((&*children[0], depth + 1));
                stack.push((&*children[1], depth + 1));
            }
        }
    }
    stats
}
