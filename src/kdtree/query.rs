//! Recursive k-d tree queries over either representation.

use smallvec::SmallVec;

use super::node::{KdContent, KdNodes};
use crate::shape::Aabb;
use crate::util::Vec3;

/// Outcome of a nearest-neighbour query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nearest {
    /// Number of elements written to the result list.
    pub found: usize,
    /// Distance to the farthest element found, 0 when none was.
    pub radius: f32,
}

/// Bounded, distance-sorted candidate list.
pub(crate) struct NeighbourSet<'a, T> {
    k: usize,
    max_radius: f32,
    entries: SmallVec<[(f32, &'a T); 16]>,
}

impl<'a, T: KdContent> NeighbourSet<'a, T> {
    pub fn new(k: usize, max_radius: f32) -> Self {
        Self {
            k,
            max_radius,
            entries: SmallVec::with_capacity(k.min(1024)),
        }
    }

    /// Current search radius: the worst kept distance once full, else the maximum.
    #[inline]
    pub fn radius(&self) -> f32 {
        match self.entries.last() {
            Some(&(dist, _)) if self.entries.len() == self.k => dist,
            _ => self.max_radius,
        }
    }

    /// Consider one element at `target`'s distance.
    #[inline]
    pub fn consider<F: Fn(&T) -> bool>(&mut self, item: &'a T, target: Vec3, filter: &F) {
        let dist = (item.position() - target).length();
        if dist < self.radius() && filter(item) {
            self.insert(dist, item);
        }
    }

    fn insert(&mut self, dist: f32, item: &'a T) {
        // Lower bound: a newcomer goes ahead of kept elements at equal distance.
        let at = self.entries.partition_point(|&(d, _)| d < dist);
        if at >= self.k {
            return;
        }
        if self.entries.len() == self.k {
            self.entries.pop();
        }
        self.entries.insert(at, (dist, item));
    }

    /// Write the kept elements, nearest first, into `out`.
    pub fn finish(self, out: &mut Vec<&'a T>) -> Nearest {
        out.clear();
        out.extend(self.entries.iter().map(|&(_, item)| item));
        Nearest {
            found: self.entries.len(),
            radius: self.entries.last().map_or(0.0, |&(d, _)| d),
        }
    }
}

/// Child slot on `target`'s side of a node at `pos` split along `axis`.
#[inline]
pub(crate) fn near_slot(pos: f32, target: f32) -> usize {
    if pos < target {
        1
    } else {
        0
    }
}

pub(crate) fn nearest<'a, N, T, F>(
    nodes: &N,
    target: Vec3,
    k: usize,
    max_radius: f32,
    filter: &F,
    out: &mut Vec<&'a T>,
) -> Nearest
where
    N: KdNodes<'a, T>,
    T: KdContent + 'a,
    F: Fn(&T) -> bool,
{
    let mut set = NeighbourSet::new(k, max_radius);
    if k > 0 {
        nearest_node(nodes, nodes.root(), Aabb::UNBOUNDED, target, filter, &mut set);
    }
    set.finish(out)
}

fn nearest_node<'a, N, T, F>(
    nodes: &N,
    id: N::Id,
    cell: Aabb,
    target: Vec3,
    filter: &F,
    set: &mut NeighbourSet<'a, T>,
) where
    N: KdNodes<'a, T>,
    T: KdContent + 'a,
    F: Fn(&T) -> bool,
{
    let content = nodes.content(id);
    let axis = nodes.axis(id);
    let pos = content.position()[axis.index()];
    let near = near_slot(pos, target[axis.index()]);
    let far = 1 - near;
    let cells = cell.split(axis, pos);

    if let Some(child) = nodes.child(id, near) {
        nearest_node(nodes, child, cells[near], target, filter, set);
    }
    set.consider(content, target, filter);
    if let Some(child) = nodes.child(id, far) {
        if cells[far].distance_to(target) <= set.radius() {
            nearest_node(nodes, child, cells[far], target, filter, set);
        }
    }
}

pub(crate) fn in_radius<'a, N, T, F>(
    nodes: &N,
    target: Vec3,
    radius: f32,
    filter: &F,
    out: &mut Vec<&'a T>,
) where
    N: KdNodes<'a, T>,
    T: KdContent + 'a,
    F: Fn(&T) -> bool,
{
    out.clear();
    in_radius_node(nodes, nodes.root(), Aabb::UNBOUNDED, target, radius, filter, out);
}

fn in_radius_node<'a, N, T, F>(
    nodes: &N,
    id: N::Id,
    cell: Aabb,
    target: Vec3,
    radius: f32,
    filter: &F,
    out: &mut Vec<&'a T>,
) where
    N: KdNodes<'a, T>,
    T: KdContent + 'a,
    F: Fn(&T) -> bool,
{
    let content = nodes.content(id);
    if (content.position() - target).length() < radius && filter(content) {
        out.push(content);
    }

    let axis = nodes.axis(id);
    let pos = content.position()[axis.index()];
    let cells = cell.split(axis, pos);
    for (slot, cell) in cells.iter().enumerate() {
        if let Some(child) = nodes.child(id, slot) {
            if cell.distance_to(target) <= radius {
                in_radius_node(nodes, child, *cell, target, radius, filter, out);
            }
        }
    }
}
