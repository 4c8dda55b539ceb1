//! Parallel median-split k-d tree builder.

use rayon::prelude::*;

use super::node::{KdContent, KdNode};
use super::KdTree;
use crate::tree::exclusive_build;
use crate::util::{Axis, BuildSettings, Error, Result};

/// Builds a [`KdTree`] by recursive median splits, cycling the split axis.
#[derive(Debug, Clone, Default)]
pub struct KdTreeBuilder {
    settings: BuildSettings,
}

impl KdTreeBuilder {
    pub fn new(settings: BuildSettings) -> Self {
        Self { settings }
    }

    /// Build a linked tree, consuming `items`.
    ///
    /// Waits for any other running build first.
    #[tracing::instrument(skip_all, fields(count = items.len()))]
    pub fn build<T: KdContent>(&self, mut items: Vec<T>) -> Result<KdTree<T>> {
        if items.is_empty() {
            return Err(Error::EmptyInput("k-d tree"));
        }
        let _guard = exclusive_build("k-d tree");

        let count = items.len();
        self.sort_by(&mut items, Axis::X);
        let root = self.build_node(&mut items, Axis::X);

        let tree = KdTree::from_root(root);
        debug_assert_eq!(tree.size(), count);
        tracing::debug!("k-d tree built: {}", tree.stats());
        Ok(tree)
    }

    /// Build the subtree over `items`, which are sorted along `presorted`.
    fn build_node<T: KdContent>(&self, items: &mut [T], presorted: Axis) -> KdNode<T> {
        match items {
            [] => unreachable!("k-d subtrees are never empty"),
            [only] => KdNode::new(only.clone(), presorted),
            // Two elements: the first becomes the node, the second its upper
            // child, keeping the presorted axis.
            [first, second] => KdNode::new(first.clone(), presorted)
                .with_child(1, KdNode::new(second.clone(), presorted)),
            _ => {
                let axis = presorted.next();
                self.sort_by(items, axis);

                let count = items.len();
                let mid = count / 2;
                let (lower, rest) = items.split_at_mut(mid);
                let (median, upper) = rest.split_at_mut(1);
                let mut node = KdNode::new(median[0].clone(), axis);

                let (left, right) = if self.settings.should_fork(count) {
                    rayon::join(
                        || self.build_node(lower, axis),
                        || self.build_node(upper, axis),
                    )
                } else {
                    (self.build_node(lower, axis), self.build_node(upper, axis))
                };
                node.children = [Some(Box::new(left)), Some(Box::new(right))];
                node
            }
        }
    }

    fn sort_by<T: KdContent>(&self, items: &mut [T], axis: Axis) {
        let i = axis.index();
        let cmp = |a: &T, b: &T| a.position()[i].total_cmp(&b.position()[i]);
        if self.settings.should_sort_parallel(items.len()) {
            items.par_sort_by(cmp);
        } else {
            items.sort_by(cmp);
        }
    }
}
