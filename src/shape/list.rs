//! Closed set of collection kinds behind one type.

use std::ops::Range;

use super::{
    Aabb, InstanceList, InstanceView, RayHit, ShapeCollection, ShapeView, TriangleMesh,
    TriangleView,
};
use crate::util::{Axis, Ray, Vec3};

/// Either a triangle mesh or a list of instances.
#[derive(Debug, Clone)]
pub enum ShapeList {
    Triangles(TriangleMesh),
    Instances(InstanceList),
}

impl From<TriangleMesh> for ShapeList {
    fn from(mesh: TriangleMesh) -> Self {
        ShapeList::Triangles(mesh)
    }
}

impl From<InstanceList> for ShapeList {
    fn from(list: InstanceList) -> Self {
        ShapeList::Instances(list)
    }
}

macro_rules! dispatch {
    ($value:expr, $inner:ident => $body:expr) => {
        match $value {
            ShapeList::Triangles($inner) => $body,
            ShapeList::Instances($inner) => $body,
        }
    };
}

impl ShapeCollection for ShapeList {
    type View<'a> = ShapeListView<'a>;

    fn count(&self) -> usize {
        dispatch!(self, s => s.count())
    }

    fn aabb(&self, index: usize) -> Aabb {
        dispatch!(self, s => s.aabb(index))
    }

    fn centroid(&self, index: usize) -> Vec3 {
        dispatch!(self, s => s.centroid(index))
    }

    fn view_mut(&mut self) -> ShapeListView<'_> {
        match self {
            ShapeList::Triangles(s) => ShapeListView::Triangles(s.view_mut()),
            ShapeList::Instances(s) => ShapeListView::Instances(s.view_mut()),
        }
    }

    fn trace_range(&self, ray: &Ray, range: Range<usize>) -> Option<RayHit> {
        dispatch!(self, s => s.trace_range(ray, range))
    }

    fn test_visibility_range(&self, ray: &Ray, max_t: f32, range: Range<usize>) -> Option<RayHit> {
        dispatch!(self, s => s.test_visibility_range(ray, max_t, range))
    }
}

/// View over a [`ShapeList`].
pub enum ShapeListView<'a> {
    Triangles(TriangleView<'a>),
    Instances(InstanceView<'a>),
}

impl ShapeView for ShapeListView<'_> {
    fn count(&self) -> usize {
        match self {
            ShapeListView::Triangles(v) => v.count(),
            ShapeListView::Instances(v) => v.count(),
        }
    }

    fn offset(&self) -> usize {
        match self {
            ShapeListView::Triangles(v) => v.offset(),
            ShapeListView::Instances(v) => v.offset(),
        }
    }

    fn aabb(&self, index: usize) -> Aabb {
        match self {
            ShapeListView::Triangles(v) => v.aabb(index),
            ShapeListView::Instances(v) => v.aabb(index),
        }
    }

    fn centroid(&self, index: usize) -> Vec3 {
        match self {
            ShapeListView::Triangles(v) => v.centroid(index),
            ShapeListView::Instances(v) => v.centroid(index),
        }
    }

    fn sort_by_centroid(&mut self, axis: Axis, parallel: bool) {
        match self {
            ShapeListView::Triangles(v) => v.sort_by_centroid(axis, parallel),
            ShapeListView::Instances(v) => v.sort_by_centroid(axis, parallel),
        }
    }

    fn split(self, k: usize) -> (Self, Self) {
        match self {
            ShapeListView::Triangles(v) => {
                let (l, r) = v.split(k);
                (ShapeListView::Triangles(l), ShapeListView::Triangles(r))
            }
            ShapeListView::Instances(v) => {
                let (l, r) = v.split(k);
                (ShapeListView::Instances(l), ShapeListView::Instances(r))
            }
        }
    }
}
