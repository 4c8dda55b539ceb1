//! # Lumen
//!
//! Spatial indices for an offline path tracer.
//!
//! A [`Bvh`](bvh::Bvh) accelerates ray queries against triangle meshes and
//! instanced scenes; a [`KdTree`](kdtree::KdTree) answers filtered
//! nearest-neighbour and radius queries over photons. Both are built in
//! parallel on the rayon pool, can be packed into flat arrays after
//! construction, and give the same answers in either form. Packed photon maps
//! can be cached on disk.
//!
//! ## Modules
//!
//! - [`util`] - Errors, math types, build settings
//! - [`shape`] - Bounding boxes and the collections a BVH indexes
//! - [`tree`] - Packing, build lock and statistics shared by both trees
//! - [`bvh`] - SAH bounding volume hierarchy with single-ray and packet tracing
//! - [`kdtree`] - Median-split k-d tree, queries and binary cache
//! - [`photon`] - Photons and the photon map
//!
//! ## Example
//!
//! ```ignore
//! use lumen::prelude::*;
//!
//! let mut bvh = BvhBuilder::new(BuildSettings::default()).build(mesh)?;
//! bvh.pack()?;
//! if let Some(hit) = bvh.trace_ray(&ray) {
//!     println!("hit at t={}", hit.t);
//! }
//! ```

pub mod util;
pub mod shape;
pub mod tree;
pub mod bvh;
pub mod kdtree;
pub mod photon;

// Re-export commonly used types
pub use util::{BuildSettings, Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Axis, BuildSettings, Error, Ray, Result, Transform, Vec2, Vec3};
    pub use crate::shape::{
        Aabb, Instance, InstanceList, MeshGeometry, Model, RayHit, Shape, ShapeCollection,
        ShapeList, Sphere, TriangleMesh,
    };
    pub use crate::bvh::{Bvh, BvhBuilder, RayPacket, PACKET_SIZE};
    pub use crate::kdtree::{KdContent, KdNode, KdTree, KdTreeBuilder, KdTreeSearch, Nearest};
    pub use crate::photon::{Photon, PhotonList, PhotonMap};
    pub use crate::tree::TreeStats;
}
