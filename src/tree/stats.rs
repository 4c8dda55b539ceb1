//! Tree shape statistics.

use std::fmt;

/// Counters gathered by walking a finished tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    /// Total node count (internal + leaves).
    pub nodes: usize,
    pub leaves: usize,
    /// Depth of the deepest node, root at 1.
    pub max_depth: usize,
    /// Largest number of elements referenced by one leaf.
    pub max_leaf_size: usize,
}

impl TreeStats {
    #[inline]
    pub(crate) fn internal(&mut self, depth: usize) {
        self.nodes += 1;
        self.max_depth = self.max_depth.max(depth);
    }

    #[inline]
    pub(crate) fn leaf(&mut self, depth: usize, size: usize) {
        self.nodes += 1;
        self.leaves += 1;
        self.max_depth = self.max_depth.max(depth);
        self.max_leaf_size = self.max_leaf_size.max(size);
    }
}

impl fmt::Display for TreeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} nodes, {} leaves, depth {}, largest leaf {}",
            self.nodes, self.leaves, self.max_depth, self.max_leaf_size
        )
    }
}
