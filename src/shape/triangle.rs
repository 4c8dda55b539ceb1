//! Indexed triangle meshes.

use std::ops::Range;
use std::sync::Arc;

use soa_sort::Permutation;

use super::{Aabb, RayHit, ShapeCollection, ShapeView};
use crate::util::{Axis, Ray, Vec2, Vec3};

/// Vertex buffers shared by every triangle of a mesh.
#[derive(Debug, Clone, Default)]
pub struct MeshGeometry {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tex_coords: Vec<Vec2>,
}

impl MeshGeometry {
    /// Geometry with positions only.
    pub fn from_positions(positions: Vec<Vec3>) -> Self {
        Self {
            positions,
            ..Default::default()
        }
    }
}

/// Triangles indexing a shared [`MeshGeometry`].
///
/// Each triangle is described by parallel index arrays (positions, and
/// optionally normals and texture coordinates). The BVH builder reorders all
/// of them together. With [`TriangleMesh::track_permutation`] the mesh also
/// remembers each triangle's original id, which is then reported in
/// [`RayHit::primitive`].
#[derive(Debug, Clone)]
pub struct TriangleMesh {
    geometry: Arc<MeshGeometry>,
    vertex_indices: Vec<[u32; 3]>,
    normal_indices: Option<Vec<[u32; 3]>>,
    tex_coord_indices: Option<Vec<[u32; 3]>>,
    original_ids: Option<Vec<u32>>,
}

impl TriangleMesh {
    /// Mesh over `geometry` with flat shading.
    pub fn new(geometry: Arc<MeshGeometry>, vertex_indices: Vec<[u32; 3]>) -> Self {
        Self {
            geometry,
            vertex_indices,
            normal_indices: None,
            tex_coord_indices: None,
            original_ids: None,
        }
    }

    /// Single-use mesh built from a triangle soup.
    pub fn from_triangles(triangles: &[[Vec3; 3]]) -> Self {
        let positions = triangles.iter().flatten().copied().collect();
        let indices = (0..triangles.len() as u32)
            .map(|i| [3 * i, 3 * i + 1, 3 * i + 2])
            .collect();
        Self::new(Arc::new(MeshGeometry::from_positions(positions)), indices)
    }

    /// Interpolate per-vertex normals from `geometry.normals`.
    pub fn with_normals(mut self, normal_indices: Vec<[u32; 3]>) -> Self {
        debug_assert_eq!(normal_indices.len(), self.vertex_indices.len());
        self.normal_indices = Some(normal_indices);
        self
    }

    /// Interpolate texture coordinates from `geometry.tex_coords`.
    pub fn with_tex_coords(mut self, tex_coord_indices: Vec<[u32; 3]>) -> Self {
        debug_assert_eq!(tex_coord_indices.len(), self.vertex_indices.len());
        self.tex_coord_indices = Some(tex_coord_indices);
        self
    }

    /// Record each triangle's current position as its id before any reordering.
    pub fn track_permutation(mut self) -> Self {
        self.original_ids = Some((0..self.vertex_indices.len() as u32).collect());
        self
    }

    /// Shared vertex buffers.
    #[inline]
    pub fn geometry(&self) -> &Arc<MeshGeometry> {
        &self.geometry
    }

    /// Number of triangles.
    #[inline]
    pub fn len(&self) -> usize {
        self.vertex_indices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertex_indices.is_empty()
    }

    /// Id reported for the triangle at `index`.
    #[inline]
    pub fn primitive_id(&self, index: usize) -> u32 {
        match &self.original_ids {
            Some(ids) => ids[index],
            None => index as u32,
        }
    }

    /// Corner positions of the triangle at `index`.
    #[inline]
    pub fn corners(&self, index: usize) -> [Vec3; 3] {
        corners(&self.geometry, &self.vertex_indices[index])
    }

    fn hit(&self, ray: &Ray, index: usize) -> Option<RayHit> {
        let [a, b, c] = self.corners(index);
        let (t, u, v) = intersect_triangle(ray, a, b, c)?;
        let w = 1.0 - u - v;

        let normal = match &self.normal_indices {
            Some(indices) => {
                let [na, nb, nc] = indices[index].map(|i| self.geometry.normals[i as usize]);
                (na * w + nb * u + nc * v).normalize_or_zero()
            }
            None => (b - a).cross(c - a).normalize_or_zero(),
        };
        let tex_coord = self.tex_coord_indices.as_ref().map(|indices| {
            let [ta, tb, tc] = indices[index].map(|i| self.geometry.tex_coords[i as usize]);
            ta * w + tb * u + tc * v
        });

        Some(RayHit {
            t,
            normal,
            tex_coord,
            primitive: self.primitive_id(index),
            instance: None,
        })
    }
}

impl ShapeCollection for TriangleMesh {
    type View<'a> = TriangleView<'a>;

    fn count(&self) -> usize {
        self.vertex_indices.len()
    }

    fn aabb(&self, index: usize) -> Aabb {
        triangle_aabb(self.corners(index))
    }

    fn centroid(&self, index: usize) -> Vec3 {
        triangle_centroid(self.corners(index))
    }

    fn view_mut(&mut self) -> TriangleView<'_> {
        TriangleView {
            geometry: &self.geometry,
            offset: 0,
            vertex_indices: &mut self.vertex_indices,
            normal_indices: self.normal_indices.as_deref_mut(),
            tex_coord_indices: self.tex_coord_indices.as_deref_mut(),
            original_ids: self.original_ids.as_deref_mut(),
        }
    }

    fn trace_range(&self, ray: &Ray, range: Range<usize>) -> Option<RayHit> {
        let mut best = None;
        for index in range {
            if let Some(hit) = self.hit(ray, index) {
                RayHit::keep_closest(&mut best, hit);
            }
        }
        best
    }

    fn test_visibility_range(&self, ray: &Ray, max_t: f32, range: Range<usize>) -> Option<RayHit> {
        range
            .filter_map(|index| self.hit(ray, index))
            .find(|hit| hit.t <= max_t)
    }
}

/// Mutable window over part of a [`TriangleMesh`].
pub struct TriangleView<'a> {
    geometry: &'a MeshGeometry,
    offset: usize,
    vertex_indices: &'a mut [[u32; 3]],
    normal_indices: Option<&'a mut [[u32; 3]]>,
    tex_coord_indices: Option<&'a mut [[u32; 3]]>,
    original_ids: Option<&'a mut [u32]>,
}

impl ShapeView for TriangleView<'_> {
    fn count(&self) -> usize {
        self.vertex_indices.len()
    }

    fn offset(&self) -> usize {
        self.offset
    }

    fn aabb(&self, index: usize) -> Aabb {
        triangle_aabb(corners(self.geometry, &self.vertex_indices[index]))
    }

    fn centroid(&self, index: usize) -> Vec3 {
        triangle_centroid(corners(self.geometry, &self.vertex_indices[index]))
    }

    fn sort_by_centroid(&mut self, axis: Axis, parallel: bool) {
        let keys: Vec<f32> = (0..self.count())
            .map(|i| self.centroid(i)[axis.index()])
            .collect();
        let perm = Permutation::sorting_by_key(&keys, parallel);
        if perm.is_identity() {
            return;
        }

        let Self {
            vertex_indices,
            normal_indices,
            tex_coord_indices,
            original_ids,
            ..
        } = self;
        let perm = &perm;
        if parallel {
            rayon::join(
                || perm.apply(vertex_indices),
                || {
                    rayon::join(
                        || apply_opt(perm, normal_indices),
                        || {
                            apply_opt(perm, tex_coord_indices);
                            apply_opt(perm, original_ids);
                        },
                    )
                },
            );
        } else {
            perm.apply(vertex_indices);
            apply_opt(perm, normal_indices);
            apply_opt(perm, tex_coord_indices);
            apply_opt(perm, original_ids);
        }
    }

    fn split(self, k: usize) -> (Self, Self) {
        let (vl, vr) = self.vertex_indices.split_at_mut(k);
        let (nl, nr) = split_opt(self.normal_indices, k);
        let (tl, tr) = split_opt(self.tex_coord_indices, k);
        let (il, ir) = split_opt(self.original_ids, k);
        (
            TriangleView {
                geometry: self.geometry,
                offset: self.offset,
                vertex_indices: vl,
                normal_indices: nl,
                tex_coord_indices: tl,
                original_ids: il,
            },
            TriangleView {
                geometry: self.geometry,
                offset: self.offset + k,
                vertex_indices: vr,
                normal_indices: nr,
                tex_coord_indices: tr,
                original_ids: ir,
            },
        )
    }
}

fn apply_opt<T>(perm: &Permutation, data: &mut Option<&mut [T]>) {
    if let Some(data) = data {
        perm.apply(data);
    }
}

#[allow(clippy::type_complexity)]
fn split_opt<T>(data: Option<&mut [T]>, k: usize) -> (Option<&mut [T]>, Option<&mut [T]>) {
    match data {
        Some(data) => {
            let (l, r) = data.split_at_mut(k);
            (Some(l), Some(r))
        }
        None => (None, None),
    }
}

#[inline]
fn corners(geometry: &MeshGeometry, indices: &[u32; 3]) -> [Vec3; 3] {
    indices.map(|i| geometry.positions[i as usize])
}

#[inline]
fn triangle_aabb([a, b, c]: [Vec3; 3]) -> Aabb {
    Aabb::new(a.min(b).min(c), a.max(b).max(c))
}

#[inline]
fn triangle_centroid([a, b, c]: [Vec3; 3]) -> Vec3 {
    (a + b + c) / 3.0
}

/// Möller-Trumbore ray/triangle test.
///
/// Returns `(t, u, v)` with barycentrics `u` for `b` and `v` for `c`.
/// Hits at `t < 0` are rejected.
#[inline]
pub fn intersect_triangle(ray: &Ray, a: Vec3, b: Vec3, c: Vec3) -> Option<(f32, f32, f32)> {
    let e1 = b - a;
    let e2 = c - a;
    let p = ray.direction.cross(e2);
    let det = e1.dot(p);
    if det.abs() < 1e-12 {
        return None;
    }
    let inv_det = 1.0 / det;

    let s = ray.origin - a;
    let u = s.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(e1);
    let v = ray.direction.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = e2.dot(q) * inv_det;
    (t >= 0.0).then_some((t, u, v))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_strip(n: usize) -> TriangleMesh {
        // n unit triangles spaced along -x..+x, listed in reverse order.
        let tris: Vec<[Vec3; 3]> = (0..n)
            .rev()
            .map(|i| {
                let x = i as f32 * 2.0;
                [
                    Vec3::new(x, 0.0, 0.0),
                    Vec3::new(x + 1.0, 0.0, 0.0),
                    Vec3::new(x, 1.0, 0.0),
                ]
            })
            .collect();
        TriangleMesh::from_triangles(&tris)
    }

    #[test]
    fn test_intersect_triangle() {
        let ray = Ray::new(Vec3::new(0.25, 0.25, -2.0), Vec3::Z);
        let (t, u, v) = intersect_triangle(&ray, Vec3::ZERO, Vec3::X, Vec3::Y).unwrap();
        assert!((t - 2.0).abs() < 1e-6);
        assert!((u - 0.25).abs() < 1e-6);
        assert!((v - 0.25).abs() < 1e-6);

        let miss = Ray::new(Vec3::new(0.8, 0.8, -2.0), Vec3::Z);
        assert!(intersect_triangle(&miss, Vec3::ZERO, Vec3::X, Vec3::Y).is_none());

        let behind = Ray::new(Vec3::new(0.25, 0.25, 2.0), Vec3::Z);
        assert!(intersect_triangle(&behind, Vec3::ZERO, Vec3::X, Vec3::Y).is_none());
    }

    #[test]
    fn test_sort_keeps_ids_in_lockstep() {
        let mut mesh = quad_strip(5).track_permutation();
        let before: Vec<[Vec3; 3]> = (0..5).map(|i| mesh.corners(i)).collect();

        mesh.view_mut().sort_by_centroid(Axis::X, false);

        for i in 0..5 {
            let id = mesh.primitive_id(i) as usize;
            assert_eq!(mesh.corners(i), before[id]);
        }
        for i in 1..5 {
            assert!(mesh.centroid(i - 1).x <= mesh.centroid(i).x);
        }
    }

    #[test]
    fn test_split_views_do_not_overlap() {
        let mut mesh = quad_strip(6);
        let view = mesh.view_mut();
        let (left, right) = view.split(2);
        assert_eq!(left.range(), 0..2);
        assert_eq!(right.range(), 2..6);
        let (mid, tail) = right.split(3);
        assert_eq!(mid.range(), 2..5);
        assert_eq!(tail.range(), 5..6);
    }

    #[test]
    fn test_trace_range_closest() {
        // Two parallel triangles at z=1 and z=3, the far one listed first.
        let mesh = TriangleMesh::from_triangles(&[
            [Vec3::new(0.0, 0.0, 3.0), Vec3::new(1.0, 0.0, 3.0), Vec3::new(0.0, 1.0, 3.0)],
            [Vec3::new(0.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 1.0), Vec3::new(0.0, 1.0, 1.0)],
        ]);
        let ray = Ray::new(Vec3::new(0.2, 0.2, 0.0), Vec3::Z);
        let hit = mesh.trace_range(&ray, 0..2).unwrap();
        assert_eq!(hit.primitive, 1);
        assert!((hit.t - 1.0).abs() < 1e-6);
        assert!((hit.normal.z.abs() - 1.0).abs() < 1e-6);

        let visible = mesh.test_visibility_range(&ray, 2.0, 0..2).unwrap();
        assert_eq!(visible.primitive, 1);
        assert!(mesh.test_visibility_range(&ray, 0.5, 0..2).is_none());
    }
}
