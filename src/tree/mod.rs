//! Machinery shared by the BVH and the k-d tree.
//!
//! - Linked/packed representation switch
//! - Breadth-first packing of a linked tree into an index arena
//! - The process-wide build lock
//! - [`TreeStats`] - shape statistics logged after every build

mod lock;
mod pack;
mod stats;

pub use lock::is_build_in_progress;
pub(crate) use lock::exclusive_build;
pub(crate) use pack::{pack_breadth_first, ChildSlots, Unlink};
pub use stats::TreeStats;

use crate::util::{Error, Result};

/// Index of a node in a packed tree.
pub type NodeIndex = u32;

/// Sentinel for a missing child in a packed node.
pub const NO_CHILD: NodeIndex = NodeIndex::MAX;

/// A tree is built linked and may later be packed into a flat array.
#[derive(Debug)]
pub(crate) enum TreeRepr<L, P> {
    Linked(Box<L>),
    Packed(Vec<P>),
}

impl<L, P> TreeRepr<L, P>
where
    L: Unlink<Packed = P>,
    P: ChildSlots,
{
    #[inline]
    pub fn is_packed(&self) -> bool {
        matches!(self, TreeRepr::Packed(_))
    }

    /// Convert the linked form into its packed form. The root lands at index 0.
    pub fn pack(&mut self, size: usize) -> Result<()> {
        match std::mem::replace(self, TreeRepr::Packed(Vec::new())) {
            TreeRepr::Linked(root) => {
                *self = TreeRepr::Packed(pack_breadth_first(root, size));
                Ok(())
            }
            packed @ TreeRepr::Packed(_) => {
                *self = packed;
                Err(Error::AlreadyPacked)
            }
        }
    }
}

/// Move every element satisfying `pred` to the front, returning their count.
///
/// Order is not preserved.
pub(crate) fn partition<T, F>(slice: &mut [T], pred: F) -> usize
where
    F: Fn(&T) -> bool,
{
    let mut left = 0;
    let mut right = slice.len();
    while left < right {
        if pred(&slice[left]) {
            left += 1;
        } else {
            right -= 1;
            slice.swap(left, right);
        }
    }
    left
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition() {
        let mut v = [5, 2, 8, 1, 9, 4];
        let n = partition(&mut v, |&x| x < 5);
        assert_eq!(n, 3);
        assert!(v[..n].iter().all(|&x| x < 5));
        assert!(v[n..].iter().all(|&x| x >= 5));

        let mut empty: [u8; 0] = [];
        assert_eq!(partition(&mut empty, |_| true), 0);
    }
}
