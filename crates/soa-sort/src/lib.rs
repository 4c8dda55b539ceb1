//! Structure-of-arrays sorting.
//!
//! Sorts by the values of one key sequence and applies the resulting
//! permutation to any number of parallel arrays, so that arrays describing
//! the same elements (vertex indices, normal indices, id tables, ...) stay in
//! lock-step without first being zipped into an array of structs.

use std::cmp::Ordering;

use rayon::prelude::*;

/// A reordering of `0..len`: position `i` of the sorted order holds the
/// element that was at `source(i)` before sorting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation {
    indices: Vec<usize>,
}

impl Permutation {
    /// Identity permutation over `len` elements.
    pub fn identity(len: usize) -> Self {
        Self {
            indices: (0..len).collect(),
        }
    }

    /// Compute the stable permutation that sorts `len` elements with `cmp`.
    ///
    /// `cmp(a, b)` compares the elements currently at positions `a` and `b`.
    /// When `parallel` is set the index sort runs on the rayon pool.
    pub fn sorting_by<F>(len: usize, parallel: bool, cmp: F) -> Self
    where
        F: Fn(usize, usize) -> Ordering + Sync,
    {
        let mut indices: Vec<usize> = (0..len).collect();
        if parallel {
            indices.par_sort_by(|&a, &b| cmp(a, b));
        } else {
            indices.sort_by(|&a, &b| cmp(a, b));
        }
        Self { indices }
    }

    /// Sort by an `f32` key per element, using IEEE total ordering.
    pub fn sorting_by_key(keys: &[f32], parallel: bool) -> Self {
        Self::sorting_by(keys.len(), parallel, |a, b| keys[a].total_cmp(&keys[b]))
    }

    /// Number of elements the permutation reorders.
    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Check whether the permutation is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Original position of the element now at `i`.
    #[inline]
    pub fn source(&self, i: usize) -> usize {
        self.indices[i]
    }

    /// Check whether applying the permutation would change nothing.
    pub fn is_identity(&self) -> bool {
        self.indices.iter().enumerate().all(|(i, &s)| i == s)
    }

    /// Reorder `data` in place so that `data[i]` becomes the old `data[source(i)]`.
    ///
    /// Walks each cycle of the permutation once, so the cost is linear and no
    /// copy of `data` is made.
    ///
    /// # Panics
    ///
    /// Panics if `data.len()` differs from the permutation length.
    pub fn apply<T>(&self, data: &mut [T]) {
        assert_eq!(
            data.len(),
            self.indices.len(),
            "permutation length does not match array length"
        );

        let mut done = vec![false; data.len()];
        for start in 0..self.indices.len() {
            if done[start] {
                continue;
            }
            done[start] = true;
            let mut prev = start;
            let mut next = self.indices[start];
            while next != start {
                data.swap(prev, next);
                done[next] = true;
                prev = next;
                next = self.indices[next];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_three_cycle() {
        let perm = Permutation {
            indices: vec![2, 0, 1],
        };
        let mut data = vec!['a', 'b', 'c'];
        perm.apply(&mut data);
        assert_eq!(data, vec!['c', 'a', 'b']);
    }

    #[test]
    fn test_sort_keeps_arrays_in_lockstep() {
        let keys = [3.0f32, -1.0, 2.0, 0.5];
        let mut names = vec!["three", "minus", "two", "half"];
        let mut ids = vec![30u32, 10, 20, 5];

        let perm = Permutation::sorting_by_key(&keys, false);
        perm.apply(&mut names);
        perm.apply(&mut ids);

        assert_eq!(names, vec!["minus", "half", "two", "three"]);
        assert_eq!(ids, vec![10, 5, 20, 30]);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let keys: Vec<f32> = (0..5000).map(|i| ((i * 7919) % 1013) as f32).collect();
        let a = Permutation::sorting_by_key(&keys, false);
        let b = Permutation::sorting_by_key(&keys, true);
        assert_eq!(a, b);
    }

    #[test]
    fn test_identity() {
        let perm = Permutation::identity(4);
        assert!(perm.is_identity());
        let mut data = vec![1, 2, 3, 4];
        perm.apply(&mut data);
        assert_eq!(data, vec![1, 2, 3, 4]);
    }
}
