//! Primitive collections indexed by the BVH.
//!
//! A BVH never owns geometry directly. It reorders and splits a
//! [`ShapeCollection`] through a mutable [`ShapeView`] while building, then
//! keeps the collection and references it by position ranges from its leaves.
//!
//! - [`Aabb`] - bounding boxes
//! - [`TriangleMesh`] - triangles indexing a shared [`MeshGeometry`] buffer
//! - [`InstanceList`] - transformed [`Model`] instances
//! - [`ShapeList`] - the closed set of collection kinds behind one type

mod aabb;
mod instance;
mod list;
mod sphere;
mod triangle;

pub use aabb::*;
pub use instance::*;
pub use list::*;
pub use sphere::*;
pub use triangle::*;

use std::ops::Range;

use crate::util::{Axis, Ray, Vec2, Vec3};

/// Closest-hit record produced by ray queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Ray parameter of the hit.
    pub t: f32,
    /// Shading normal in the space of the queried ray, normalized.
    pub normal: Vec3,
    /// Interpolated texture coordinate, when the mesh has them.
    pub tex_coord: Option<Vec2>,
    /// Primitive id inside its shape (original triangle id when tracked).
    pub primitive: u32,
    /// Id of the instance that was hit, for instanced collections.
    pub instance: Option<u32>,
}

impl RayHit {
    /// World position of the hit along `ray`.
    #[inline]
    pub fn point(&self, ray: &Ray) -> Vec3 {
        ray.at(self.t)
    }

    /// Keep the closer of `best` and `candidate`; ties keep `best`.
    #[inline]
    pub fn keep_closest(best: &mut Option<RayHit>, candidate: RayHit) {
        if best.map_or(true, |b| candidate.t < b.t) {
            *best = Some(candidate);
        }
    }
}

/// An owned, indexable collection of ray-intersectable elements.
pub trait ShapeCollection: Clone + Send + Sync {
    /// Mutable sortable/splittable window used during construction.
    type View<'a>: ShapeView
    where
        Self: 'a;

    /// Number of elements.
    fn count(&self) -> usize;

    /// Bounding box of element `index`.
    fn aabb(&self, index: usize) -> Aabb;

    /// Centroid of element `index`.
    fn centroid(&self, index: usize) -> Vec3;

    /// View covering the whole collection.
    fn view_mut(&mut self) -> Self::View<'_>;

    /// Closest hit among the elements at positions `range`.
    fn trace_range(&self, ray: &Ray, range: Range<usize>) -> Option<RayHit>;

    /// Any hit with `t <= max_t` among the elements at positions `range`.
    fn test_visibility_range(&self, ray: &Ray, max_t: f32, range: Range<usize>) -> Option<RayHit> {
        self.trace_range(ray, range).filter(|hit| hit.t <= max_t)
    }
}

/// Window over a contiguous part of a collection.
///
/// Two views produced by [`ShapeView::split`] never alias, so they can be
/// sorted from different threads.
pub trait ShapeView: Send + Sized {
    /// Number of elements in the view.
    fn count(&self) -> usize;

    /// Position of the view's first element in the owning collection.
    fn offset(&self) -> usize;

    /// Bounding box of element `index` of the view.
    fn aabb(&self, index: usize) -> Aabb;

    /// Centroid of element `index` of the view.
    fn centroid(&self, index: usize) -> Vec3;

    /// Reorder the view by centroid coordinate along `axis`.
    ///
    /// Every array describing the elements is permuted the same way.
    fn sort_by_centroid(&mut self, axis: Axis, parallel: bool);

    /// Split into `[0, k)` and `[k, count)` of the current order.
    fn split(self, k: usize) -> (Self, Self);

    /// Positions covered in the owning collection.
    #[inline]
    fn range(&self) -> Range<usize> {
        self.offset()..self.offset() + self.count()
    }
}
