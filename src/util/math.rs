//! Math type re-exports and the small geometric primitives shared by both trees.
//!
//! Vector and matrix types come from `glam`; this module adds the split
//! [`Axis`], the [`Ray`] and an invertible [`Transform`].

pub use glam::{Affine3A, Mat3A, Mat4, Quat, Vec2, Vec3, Vec3A};

use std::fmt;

/// Coordinate axis used for sorting and splitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Axis {
    #[default]
    X = 0,
    Y = 1,
    Z = 2,
}

impl Axis {
    /// All axes in index order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Index of this axis (0..3).
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Axis for an index, wrapping modulo 3.
    #[inline]
    pub const fn from_index(i: usize) -> Self {
        match i % 3 {
            0 => Axis::X,
            1 => Axis::Y,
            _ => Axis::Z,
        }
    }

    /// The axis after this one, cycling `x → y → z → x`.
    #[inline]
    pub const fn next(self) -> Self {
        Self::from_index(self.index() + 1)
    }

    /// All three axes, `start` first and the rest in index order.
    pub fn starting_with(start: Axis) -> [Axis; 3] {
        let mut axes = [start; 3];
        let mut i = 1;
        for axis in Self::ALL {
            if axis != start {
                axes[i] = axis;
                i += 1;
            }
        }
        axes
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        f.write_str(name)
    }
}

/// Half-line starting at `origin`.
///
/// The direction is not required to be normalized; hit distances are measured
/// in multiples of `direction`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Create a new ray.
    #[inline]
    pub const fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Point at parameter `t`.
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Direction component along an axis.
    #[inline]
    pub fn direction_on(&self, axis: Axis) -> f32 {
        self.direction[axis.index()]
    }
}

/// Affine transform with its inverse cached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    matrix: Affine3A,
    inverse: Affine3A,
}

impl Transform {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        matrix: Affine3A::IDENTITY,
        inverse: Affine3A::IDENTITY,
    };

    /// Wrap an affine matrix, computing its inverse.
    pub fn from_affine(matrix: Affine3A) -> Self {
        Self {
            matrix,
            inverse: matrix.inverse(),
        }
    }

    /// Translation by `(x, y, z)`.
    pub fn translate(x: f32, y: f32, z: f32) -> Self {
        Self::from_affine(Affine3A::from_translation(Vec3::new(x, y, z)))
    }

    /// Uniform scale followed by a translation.
    pub fn scale_translate(scale: f32, offset: Vec3) -> Self {
        Self::from_affine(Affine3A::from_scale_rotation_translation(
            Vec3::splat(scale),
            Quat::IDENTITY,
            offset,
        ))
    }

    /// Forward matrix.
    #[inline]
    pub fn matrix(&self) -> &Affine3A {
        &self.matrix
    }

    /// Transform a point from object to world space.
    #[inline]
    pub fn point(&self, p: Vec3) -> Vec3 {
        self.matrix.transform_point3(p)
    }

    /// Transform a normal from object to world space (inverse transpose), normalized.
    #[inline]
    pub fn normal(&self, n: Vec3) -> Vec3 {
        self.inverse.matrix3.transpose().mul_vec3(n).normalize_or_zero()
    }

    /// Bring a world-space ray into object space.
    ///
    /// The direction is transformed but not renormalized, so hit distances
    /// found in object space are valid in world space.
    #[inline]
    pub fn inverse_ray(&self, ray: &Ray) -> Ray {
        Ray::new(
            self.inverse.transform_point3(ray.origin),
            self.inverse.transform_vector3(ray.direction),
        )
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}
