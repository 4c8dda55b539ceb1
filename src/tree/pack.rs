//! Breadth-first packing of linked trees.

use std::collections::VecDeque;

use super::NodeIndex;

/// Packed node with up to two child slots.
pub(crate) trait ChildSlots {
    fn set_child(&mut self, slot: usize, index: NodeIndex);
}

/// Linked node that can be taken apart for packing.
pub(crate) trait Unlink: Sized {
    type Packed: ChildSlots;

    /// Split into the packed payload (children unset) and the owned children.
    fn unlink(self) -> (Self::Packed, [Option<Box<Self>>; 2]);
}

/// Lay out a linked tree in breadth-first order.
///
/// Index 0 is the root and parents always precede their children. A child's
/// index is known when it is queued: it follows every node already packed or
/// waiting in the queue. The linked tree is consumed.
pub(crate) fn pack_breadth_first<N: Unlink>(root: Box<N>, size: usize) -> Vec<N::Packed> {
    let mut packed = Vec::with_capacity(size);
    let mut queue = VecDeque::new();
    queue.push_back(root);

    while let Some(node) = queue.pop_front() {
        let (mut value, children) = (*node).unlink();
        for (slot, child) in children.into_iter().enumerate() {
            if let Some(child) = child {
                let index = packed.len() + 1 + queue.len();
                value.set_child(slot, index as NodeIndex);
                queue.push_back(child);
            }
        }
        packed.push(value);
    }

    debug_assert_eq!(packed.len(), size, "tree size disagrees with node count");
    packed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::NO_CHILD;

    struct Linked {
        label: u32,
        children: [Option<Box<Linked>>; 2],
    }

    #[derive(Debug, PartialEq)]
    struct Flat {
        label: u32,
        children: [NodeIndex; 2],
    }

    impl ChildSlots for Flat {
        fn set_child(&mut self, slot: usize, index: NodeIndex) {
            self.children[slot] = index;
        }
    }

    impl Unlink for Linked {
        type Packed = Flat;

        fn unlink(self) -> (Flat, [Option<Box<Linked>>; 2]) {
            (
                Flat {
                    label: self.label,
                    children: [NO_CHILD; 2],
                },
                self.children,
            )
        }
    }

    fn node(label: u32, left: Option<Linked>, right: Option<Linked>) -> Linked {
        Linked {
            label,
            children: [left.map(Box::new), right.map(Box::new)],
        }
    }

    #[test]
    fn test_breadth_first_layout() {
        //        0
        //      /   \
        //     1     2
        //      \   / \
        //       3 4   5
        let tree = node(
            0,
            Some(node(1, None, Some(node(3, None, None)))),
            Some(node(2, Some(node(4, None, None)), Some(node(5, None, None)))),
        );
        let packed = pack_breadth_first(Box::new(tree), 6);

        let labels: Vec<u32> = packed.iter().map(|n| n.label).collect();
        assert_eq!(labels, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(packed[0].children, [1, 2]);
        assert_eq!(packed[1].children, [NO_CHILD, 3]);
        assert_eq!(packed[2].children, [4, 5]);
        assert_eq!(packed[5].children, [NO_CHILD, NO_CHILD]);

        // Every child index points past its parent.
        for (i, n) in packed.iter().enumerate() {
            for &c in &n.children {
                assert!(c == NO_CHILD || c as usize > i);
            }
        }
    }
}
