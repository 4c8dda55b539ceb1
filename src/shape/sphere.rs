//! Unit sphere primitive.

use super::Aabb;
use crate::util::{Ray, Vec3};

/// Sphere of radius 1 centered at the origin of its object space.
///
/// Placed and sized in the scene through an instance transform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sphere;

impl Sphere {
    /// Object-space bounds.
    pub const AABB: Aabb = Aabb {
        start: Vec3::splat(-1.0),
        end: Vec3::splat(1.0),
    };

    /// Nearest non-negative hit distance and the object-space normal.
    pub fn intersect(&self, ray: &Ray) -> Option<(f32, Vec3)> {
        let a = ray.direction.length_squared();
        let b = 2.0 * ray.direction.dot(ray.origin);
        let c = ray.origin.length_squared() - 1.0;

        let disc = b * b - 4.0 * a * c;
        if disc < 0.0 || a == 0.0 {
            return None;
        }
        let root = disc.sqrt();
        let near = (-b - root) / (2.0 * a);
        let far = (-b + root) / (2.0 * a);
        let t = if near >= 0.0 {
            near
        } else if far >= 0.0 {
            far
        } else {
            return None;
        };

        Some((t, ray.at(t).normalize_or_zero()))
    }
}
