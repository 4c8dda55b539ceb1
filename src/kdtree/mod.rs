//! Point k-d tree with filtered nearest-neighbour and radius queries.
//!
//! Built linked by [`KdTreeBuilder`] from median splits, optionally packed
//! into a breadth-first array and, for plain-data elements, written to and
//! read back from a binary cache. Queries run on either form with the same
//! results; [`KdTreeSearch`] is a stack-based variant for packed trees.

mod builder;
mod format;
mod node;
mod query;
mod search;

pub use builder::KdTreeBuilder;
pub use format::{HEADER_SIZE, NODE_TAIL_SIZE};
pub use node::{KdContent, KdNode, PackedKdNode};
pub use query::Nearest;
pub use search::{KdTreeSearch, MAX_SEARCH_DEPTH};

use node::{LinkedKd, PackedKd};

use crate::tree::{TreeRepr, TreeStats};
use crate::util::{Result, Vec3};

/// k-d tree over elements with a position.
#[derive(Debug)]
pub struct KdTree<T> {
    repr: TreeRepr<KdNode<T>, PackedKdNode<T>>,
    stats: TreeStats,
}

impl<T: KdContent> KdTree<T> {
    /// Wrap an already linked tree, such as a hand-built one.
    pub fn from_root(root: KdNode<T>) -> Self {
        let stats = linked_stats(&root);
        Self {
            repr: TreeRepr::Linked(Box::new(root)),
            stats,
        }
    }

    pub(crate) fn from_packed(nodes: Vec<PackedKdNode<T>>) -> Self {
        let stats = packed_stats(&nodes);
        Self {
            repr: TreeRepr::Packed(nodes),
            stats,
        }
    }

    /// Number of nodes, which is the number of stored elements.
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

    /// Root of the linked form, `None` once packed.
    pub fn root(&self) -> Option<&KdNode<T>> {
        match &self.repr {
            TreeRepr::Linked(root) => Some(root.as_ref()),
            TreeRepr::Packed(_) => None,
        }
    }

    /// Node array of the packed form, root at index 0.
    pub fn packed_nodes(&self) -> Option<&[PackedKdNode<T>]> {
        match &self.repr {
            TreeRepr::Linked(_) => None,
            TreeRepr::Packed(nodes) => Some(nodes.as_slice()),
        }
    }

    /// Convert to the packed form. Fails if already packed.
    #[tracing::instrument(skip_all, fields(nodes = self.stats.nodes))]
    pub fn pack(&mut self) -> Result<()> {
        self.repr.pack(self.stats.nodes)
    }

    /// Up to `k` elements nearest to `target` that pass `filter`, nearest first.
    ///
    /// Only elements strictly closer than `max_radius` qualify. `out` is
    /// cleared first. The returned radius is the distance of the farthest
    /// element found.
    pub fn nearest<'a, F>(
        &'a self,
        target: Vec3,
        k: usize,
        max_radius: f32,
        filter: F,
        out: &mut Vec<&'a T>,
    ) -> Nearest
    where
        F: Fn(&T) -> bool,
    {
        match &self.repr {
            TreeRepr::Linked(root) => {
                query::nearest(&LinkedKd(root.as_ref()), target, k, max_radius, &filter, out)
            }
            TreeRepr::Packed(nodes) => {
                query::nearest(&PackedKd(nodes.as_slice()), target, k, max_radius, &filter, out)
            }
        }
    }

    /// [`KdTree::nearest`] without a radius limit or filter.
    pub fn nearest_all<'a>(&'a self, target: Vec3, k: usize, out: &mut Vec<&'a T>) -> Nearest {
        self.nearest(target, k, f32::INFINITY, |_| true, out)
    }

    /// Every element strictly closer than `radius` to `target` that passes `filter`.
    ///
    /// `out` is cleared first; order is unspecified.
    pub fn in_radius<'a, F>(&'a self, target: Vec3, radius: f32, filter: F, out: &mut Vec<&'a T>)
    where
        F: Fn(&T) -> bool,
    {
        match &self.repr {
            TreeRepr::Linked(root) => {
                query::in_radius(&LinkedKd(root.as_ref()), target, radius, &filter, out)
            }
            TreeRepr::Packed(nodes) => {
                query::in_radius(&PackedKd(nodes.as_slice()), target, radius, &filter, out)
            }
        }
    }

    /// Stack-based searcher, available once packed.
    pub fn search(&self) -> Option<KdTreeSearch<'_, T>> {
        self.packed_nodes().map(KdTreeSearch::new)
    }
}

fn linked_stats<T>(root: &KdNode<T>) -> TreeStats {
    let mut stats = TreeStats::default();
    let mut stack = vec![(root, 1)];
    while let Some((node, depth)) = stack.pop() {
        if node.is_leaf() {
            stats.leaf(depth, 1);
        } else {
            stats.internal(depth);
        }
        stack.extend(node.children.iter().flatten().map(|c| (&**c, depth + 1)));
    }
    stats
}

fn packed_stats<T>(nodes: &[PackedKdNode<T>]) -> TreeStats {
    let mut stats = TreeStats::default();
    if nodes.is_empty() {
        return stats;
    }
    let mut stack = vec![(0usize, 1)];
    while let Some((index, depth)) = stack.pop() {
        let node = &nodes[index];
        if node.is_leaf() {
            stats.leaf(depth, 1);
        } else {
            stats.internal(depth);
        }
        stack.extend((0..2).filter_map(|slot| node.child(slot)).map(|c| (c, depth + 1)));
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::{BuildSettings, Error};

    fn p(x: f32, y: f32, z: f32) -> Vec3 {
        Vec3::new(x, y, z)
    }

    fn xs(out: &[&Vec3]) -> Vec<Vec3> {
        out.iter().map(|v| **v).collect()
    }

    #[test]
    fn test_hand_built_two_nearest() {
        let tree = KdTree::from_root(
            KdNode::new(p(0.0, 0.0, 0.0), crate::util::Axis::X)
                .with_child(0, KdNode::leaf(p(-5.0, 0.0, 0.0)))
                .with_child(1, KdNode::leaf(p(5.0, 0.0, 0.0))),
        );
        let mut out = Vec::new();
        let nearest = tree.nearest_all(p(-4.0, 0.0, 0.0), 2, &mut out);
        assert_eq!(nearest.found, 2);
        assert_eq!(xs(&out), vec![p(-5.0, 0.0, 0.0), p(0.0, 0.0, 0.0)]);
        assert_eq!(nearest.radius, 4.0);
    }

    #[test]
    fn test_hand_built_crosses_split_plane() {
        let tree = KdTree::from_root(
            KdNode::new(p(0.0, 5.0, 0.0), crate::util::Axis::X)
                .with_child(0, KdNode::leaf(p(-5.0, 0.0, 0.0)))
                .with_child(1, KdNode::leaf(p(5.0, 0.0, 0.0))),
        );
        let mut out = Vec::new();
        tree.nearest_all(p(5.0, 4.0, 0.0), 2, &mut out);
        assert_eq!(xs(&out), vec![p(5.0, 0.0, 0.0), p(0.0, 5.0, 0.0)]);

        let tree = KdTree::from_root(
            KdNode::new(p(0.0, 0.0, 0.0), crate::util::Axis::X)
                .with_child(0, KdNode::leaf(p(-1.0, 4.0, 0.0)))
                .with_child(1, KdNode::leaf(p(5.0, 0.0, 0.0))),
        );
        tree.nearest_all(p(1.0, 4.0, 0.0), 1, &mut out);
        assert_eq!(xs(&out), vec![p(-1.0, 4.0, 0.0)]);
    }

    #[test]
    fn test_hand_built_missing_children() {
        use crate::util::Axis;
        let tree = KdTree::from_root(
            KdNode::new(p(0.0, 0.0, 0.0), Axis::X).with_child(
                1,
                KdNode::new(p(2.0, 0.0, 0.0), Axis::Y).with_child(1, KdNode::leaf(p(2.0, 1.0, 0.0))),
            ),
        );
        let mut out = Vec::new();
        let nearest = tree.nearest_all(p(2.0, -1.0, 0.0), 1, &mut out);
        assert_eq!(xs(&out), vec![p(2.0, 0.0, 0.0)]);
        assert_eq!(nearest.radius, 1.0);

        tree.nearest_all(p(-1.0, 1.0, 0.0), 1, &mut out);
        assert_eq!(xs(&out), vec![p(0.0, 0.0, 0.0)]);

        let tree = KdTree::from_root(
            KdNode::new(p(0.0, 0.0, 0.0), Axis::X).with_child(
                1,
                KdNode::new(p(3.0, 0.0, 0.0), Axis::Y).with_child(1, KdNode::leaf(p(1.0, 1.0, 0.0))),
            ),
        );
        tree.nearest_all(p(3.0, 1.0, 0.0), 2, &mut out);
        assert_eq!(xs(&out), vec![p(3.0, 0.0, 0.0), p(1.0, 1.0, 0.0)]);
    }

    #[test]
    fn test_two_element_layout() {
        let tree = KdTreeBuilder::default()
            .build(vec![p(3.0, 0.0, 0.0), p(1.0, 0.0, 0.0)])
            .unwrap();
        let root = tree.root().unwrap();
        assert_eq!(root.content, p(1.0, 0.0, 0.0));
        assert!(root.child(0).is_none());
        assert_eq!(root.child(1).unwrap().content, p(3.0, 0.0, 0.0));
    }

    #[test]
    fn test_pack_twice_fails() {
        let mut tree = KdTreeBuilder::default().build(vec![Vec3::ONE; 5]).unwrap();
        tree.pack().unwrap();
        assert!(tree.is_packed());
        assert!(matches!(tree.pack(), Err(Error::AlreadyPacked)));
        assert_eq!(tree.packed_nodes().unwrap().len(), 5);
    }

    #[test]
    fn test_empty_input() {
        let err = KdTreeBuilder::new(BuildSettings::default())
            .build(Vec::<Vec3>::new())
            .unwrap_err();
        assert!(matches!(err, Error::EmptyInput(_)));
    }
}
