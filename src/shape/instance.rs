//! Transformed instances of shared models.

use std::ops::Range;
use std::sync::Arc;

use rayon::prelude::*;

use super::{Aabb, RayHit, ShapeCollection, ShapeView, Sphere, TriangleMesh};
use crate::bvh::{Bvh, BvhBuilder};
use crate::util::{Axis, BuildSettings, Ray, Result, Transform, Vec3};

/// Geometry a model is made of.
#[derive(Debug)]
pub enum Shape {
    Sphere(Sphere),
    /// Mesh with its own packed BVH, built once and shared by every instance.
    Mesh(Arc<Bvh<TriangleMesh>>),
}

impl Shape {
    /// Build and pack the second-level BVH of a mesh.
    pub fn mesh(mesh: TriangleMesh, settings: &BuildSettings) -> Result<Self> {
        let mut bvh = BvhBuilder::new(settings.clone()).build(mesh)?;
        bvh.pack()?;
        Ok(Shape::Mesh(Arc::new(bvh)))
    }

    /// Object-space bounds.
    pub fn aabb(&self) -> Aabb {
        match self {
            Shape::Sphere(_) => Sphere::AABB,
            Shape::Mesh(bvh) => bvh.bounds(),
        }
    }

    /// Closest object-space hit.
    pub fn trace(&self, ray: &Ray) -> Option<RayHit> {
        match self {
            Shape::Sphere(sphere) => sphere.intersect(ray).map(|(t, normal)| RayHit {
                t,
                normal,
                tex_coord: None,
                primitive: 0,
                instance: None,
            }),
            Shape::Mesh(bvh) => bvh.trace_ray(ray),
        }
    }

    /// Any object-space hit with `t <= max_t`.
    pub fn test_visibility(&self, ray: &Ray, max_t: f32) -> Option<RayHit> {
        match self {
            Shape::Sphere(_) => self.trace(ray).filter(|hit| hit.t <= max_t),
            Shape::Mesh(bvh) => bvh.test_visibility(ray, max_t),
        }
    }
}

/// A shape paired with its material.
#[derive(Debug, Clone)]
pub struct Model {
    pub shape: Arc<Shape>,
    pub material_id: u32,
}

impl Model {
    pub fn new(shape: Arc<Shape>, material_id: u32) -> Self {
        Self { shape, material_id }
    }
}

/// A model placed in the world.
#[derive(Debug, Clone)]
pub struct Instance {
    id: u32,
    transform: Transform,
    model: Model,
    aabb: Aabb,
}

impl Instance {
    /// Place `model` with `transform`. World bounds are computed once here.
    pub fn new(id: u32, transform: Transform, model: Model) -> Self {
        let aabb = model.shape.aabb().transformed(&transform);
        Self {
            id,
            transform,
            model,
            aabb,
        }
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    #[inline]
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// World-space bounds.
    #[inline]
    pub fn aabb(&self) -> Aabb {
        self.aabb
    }

    /// Closest world-space hit.
    pub fn trace(&self, ray: &Ray) -> Option<RayHit> {
        let local = self.transform.inverse_ray(ray);
        self.model.shape.trace(&local).map(|hit| self.to_world(hit))
    }

    /// Any world-space hit with `t <= max_t`.
    pub fn test_visibility(&self, ray: &Ray, max_t: f32) -> Option<RayHit> {
        let local = self.transform.inverse_ray(ray);
        self.model
            .shape
            .test_visibility(&local, max_t)
            .map(|hit| self.to_world(hit))
    }

    fn to_world(&self, hit: RayHit) -> RayHit {
        RayHit {
            normal: self.transform.normal(hit.normal),
            instance: Some(self.id),
            ..hit
        }
    }
}

/// Flat list of instances, the top level of a two-level scene.
#[derive(Debug, Clone, Default)]
pub struct InstanceList {
    instances: Vec<Instance>,
}

impl InstanceList {
    pub fn new(instances: Vec<Instance>) -> Self {
        Self { instances }
    }

    pub fn push(&mut self, instance: Instance) {
        self.instances.push(instance);
    }

    /// Instances in their current order.
    #[inline]
    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl FromIterator<Instance> for InstanceList {
    fn from_iter<I: IntoIterator<Item = Instance>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl ShapeCollection for InstanceList {
    type View<'a> = InstanceView<'a>;

    fn count(&self) -> usize {
        self.instances.len()
    }

    fn aabb(&self, index: usize) -> Aabb {
        self.instances[index].aabb
    }

    fn centroid(&self, index: usize) -> Vec3 {
        self.instances[index].aabb.centroid()
    }

    fn view_mut(&mut self) -> InstanceView<'_> {
        InstanceView {
            instances: &mut self.instances,
            offset: 0,
        }
    }

    fn trace_range(&self, ray: &Ray, range: Range<usize>) -> Option<RayHit> {
        let mut best = None;
        for instance in &self.instances[range] {
            if let Some(hit) = instance.trace(ray) {
                RayHit::keep_closest(&mut best, hit);
            }
        }
        best
    }

    fn test_visibility_range(&self, ray: &Ray, max_t: f32, range: Range<usize>) -> Option<RayHit> {
        self.instances[range]
            .iter()
            .find_map(|instance| instance.test_visibility(ray, max_t))
    }
}

/// Mutable window over part of an [`InstanceList`].
pub struct InstanceView<'a> {
    instances: &'a mut [Instance],
    offset: usize,
}

impl ShapeView for InstanceView<'_> {
    fn count(&self) -> usize {
        self.instances.len()
    }

    fn offset(&self) -> usize {
        self.offset
    }

    fn aabb(&self, index: usize) -> Aabb {
        self.instances[index].aabb
    }

    fn centroid(&self, index: usize) -> Vec3 {
        self.instances[index].aabb.centroid()
    }

    fn sort_by_centroid(&mut self, axis: Axis, parallel: bool) {
        let i = axis.index();
        let cmp = |a: &Instance, b: &Instance| {
            a.aabb.centroid()[i].total_cmp(&b.aabb.centroid()[i])
        };
        if parallel {
            self.instances.par_sort_by(cmp);
        } else {
            self.instances.sort_by(cmp);
        }
    }

    fn split(self, k: usize) -> (Self, Self) {
        let (left, right) = self.instances.split_at_mut(k);
        (
            InstanceView {
                instances: left,
                offset: self.offset,
            },
            InstanceView {
                instances: right,
                offset: self.offset + k,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sphere_model() -> Model {
        Model::new(Arc::new(Shape::Sphere(Sphere)), 0)
    }

    #[test]
    fn test_instance_bounds() {
        let inst = Instance::new(
            7,
            Transform::scale_translate(2.0, Vec3::new(10.0, 0.0, 0.0)),
            sphere_model(),
        );
        assert_eq!(inst.aabb().start, Vec3::new(8.0, -2.0, -2.0));
        assert_eq!(inst.aabb().end, Vec3::new(12.0, 2.0, 2.0));
    }

    #[test]
    fn test_trace_scaled_sphere_keeps_world_t() {
        let inst = Instance::new(
            3,
            Transform::scale_translate(2.0, Vec3::new(10.0, 0.0, 0.0)),
            sphere_model(),
        );
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        let hit = inst.trace(&ray).unwrap();
        assert!((hit.t - 8.0).abs() < 1e-5);
        assert_eq!(hit.instance, Some(3));
        assert!((hit.normal - Vec3::NEG_X).length() < 1e-5);
    }

    #[test]
    fn test_mesh_shape() {
        let mesh = TriangleMesh::from_triangles(&[[
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ]]);
        let shape = Arc::new(Shape::mesh(mesh, &BuildSettings::default()).unwrap());
        let list: InstanceList = (0..3)
            .map(|i| {
                Instance::new(
                    i,
                    Transform::translate(0.0, 0.0, 2.0 + i as f32),
                    Model::new(shape.clone(), 1),
                )
            })
            .collect();

        let ray = Ray::new(Vec3::ZERO, Vec3::Z);
        let hit = list.trace_range(&ray, 0..3).unwrap();
        assert_eq!(hit.instance, Some(0));
        assert!((hit.t - 2.0).abs() < 1e-6);
        assert!(list.test_visibility_range(&ray, 1.5, 0..3).is_none());
    }
}
