//! Photons and the photon map.
//!
//! Tracing threads deposit photons into a shared [`PhotonList`] in batches.
//! Once emission is done the list is handed to the k-d tree builder and
//! becomes a [`PhotonMap`], which can be packed and cached on disk.

use bytemuck::{Pod, Zeroable};
use parking_lot::Mutex;

use crate::kdtree::{KdContent, KdTree, KdTreeBuilder};
use crate::util::{BuildSettings, Result, Vec3};

/// Photon map: a k-d tree of photons.
pub type PhotonMap = KdTree<Photon>;

const CAUSTIC: u32 = 1;

/// A stored photon hit.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Photon {
    pub position: Vec3,
    /// Surface normal at the hit.
    pub normal: Vec3,
    /// Direction the photon arrived from.
    pub incoming: Vec3,
    /// Carried power per color channel.
    pub energy: Vec3,
    flags: u32,
}

impl Photon {
    pub fn new(position: Vec3, normal: Vec3, incoming: Vec3, energy: Vec3, caustic: bool) -> Self {
        Self {
            position,
            normal,
            incoming,
            energy,
            flags: if caustic { CAUSTIC } else { 0 },
        }
    }

    /// Whether the photon only bounced off specular surfaces before landing.
    #[inline]
    pub fn is_caustic(&self) -> bool {
        self.flags & CAUSTIC != 0
    }
}

impl KdContent for Photon {
    #[inline]
    fn position(&self) -> Vec3 {
        self.position
    }
}

/// Photons collected concurrently by tracing threads.
#[derive(Debug, Default)]
pub struct PhotonList {
    photons: Mutex<Vec<Photon>>,
}

impl PhotonList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a batch. Threads should collect locally and push in batches.
    pub fn push_batch(&self, batch: impl IntoIterator<Item = Photon>) {
        self.photons.lock().extend(batch);
    }

    pub fn len(&self) -> usize {
        self.photons.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.photons.lock().is_empty()
    }

    /// Take the collected photons.
    pub fn into_vec(self) -> Vec<Photon> {
        self.photons.into_inner()
    }

    /// Build the photon map, consuming the list.
    pub fn build_map(self, settings: &BuildSettings) -> Result<PhotonMap> {
        KdTreeBuilder::new(settings.clone()).build(self.into_vec())
    }
}
