//! Axis-aligned bounding box.

use std::fmt;

use crate::util::{Axis, Ray, Transform, Vec3};

/// Axis-aligned box spanning `start..=end` (componentwise `start <= end`).
///
/// Boxes are values: every operation returns a new box.
#[derive(Clone, Copy, PartialEq)]
pub struct Aabb {
    pub start: Vec3,
    pub end: Vec3,
}

impl Aabb {
    /// Box covering all of space. Used as the root cell of a k-d tree search.
    pub const UNBOUNDED: Self = Self {
        start: Vec3::splat(f32::NEG_INFINITY),
        end: Vec3::splat(f32::INFINITY),
    };

    /// Create a box from two corners.
    #[inline]
    pub fn new(start: Vec3, end: Vec3) -> Self {
        debug_assert!(!start.is_nan() && !end.is_nan(), "AABB corner is NaN");
        Self { start, end }
    }

    /// Degenerate box around a single point.
    #[inline]
    pub fn from_point(p: Vec3) -> Self {
        Self { start: p, end: p }
    }

    /// Smallest box containing every point. `None` for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(Self::from_point(first), |b, p| Self {
            start: b.start.min(p),
            end: b.end.max(p),
        }))
    }

    /// Componentwise union of two boxes.
    #[inline]
    pub fn merge(&self, other: &Aabb) -> Aabb {
        Aabb {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Surface area `2·(dx·dy + dy·dz + dx·dz)`. Only meaningful relative to other boxes.
    #[inline]
    pub fn surface_area(&self) -> f32 {
        let d = self.end - self.start;
        2.0 * (d.x * d.y + d.y * d.z + d.x * d.z)
    }

    /// Center of the box.
    #[inline]
    pub fn centroid(&self) -> Vec3 {
        (self.start + self.end) * 0.5
    }

    /// The eight corners.
    pub fn corners(&self) -> [Vec3; 8] {
        let (s, e) = (self.start, self.end);
        [
            s,
            Vec3::new(s.x, s.y, e.z),
            Vec3::new(s.x, e.y, s.z),
            Vec3::new(e.x, s.y, s.z),
            Vec3::new(s.x, e.y, e.z),
            Vec3::new(e.x, s.y, e.z),
            Vec3::new(e.x, e.y, s.z),
            e,
        ]
    }

    /// Box around the transformed corners. Conservative for rotations.
    pub fn transformed(&self, transform: &Transform) -> Aabb {
        let corners = self.corners().map(|c| transform.point(c));
        let mut out = Aabb::from_point(corners[0]);
        for c in &corners[1..] {
            out.start = out.start.min(*c);
            out.end = out.end.max(*c);
        }
        out
    }

    /// Slab test. Returns the entry distance, clamped to 0 when the origin is
    /// inside the box, or `None` when the ray misses or the box is behind it.
    #[inline]
    pub fn intersect(&self, ray: &Ray) -> Option<f32> {
        let mut t_entry = f32::NEG_INFINITY;
        let mut t_exit = f32::INFINITY;

        for i in 0..3 {
            let inv = 1.0 / ray.direction[i];
            let mut t0 = (self.start[i] - ray.origin[i]) * inv;
            let mut t1 = (self.end[i] - ray.origin[i]) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            // f32::max/min drop the NaN produced by 0 * inf on a slab boundary.
            t_entry = t_entry.max(t0);
            t_exit = t_exit.min(t1);
        }

        if t_entry > t_exit || t_exit < 0.0 {
            None
        } else {
            Some(t_entry.max(0.0))
        }
    }

    /// Split along `axis` at `coord` into the lower and upper half.
    pub fn split(&self, axis: Axis, coord: f32) -> [Aabb; 2] {
        let i = axis.index();
        let mut lower_end = self.end;
        lower_end[i] = coord;
        let mut upper_start = self.start;
        upper_start[i] = coord;
        [
            Aabb { start: self.start, end: lower_end },
            Aabb { start: upper_start, end: self.end },
        ]
    }

    /// Closest point of the box to `p`.
    #[inline]
    pub fn project(&self, p: Vec3) -> Vec3 {
        // max/min rather than clamp: never panics on an inverted cell.
        p.max(self.start).min(self.end)
    }

    /// Euclidean distance from `p` to the box (0 inside).
    #[inline]
    pub fn distance_to(&self, p: Vec3) -> f32 {
        (self.project(p) - p).length()
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::from_point(Vec3::ZERO)
    }
}

impl fmt::Debug for Aabb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Aabb({:?} - {:?})", self.start, self.end)
    }
}
