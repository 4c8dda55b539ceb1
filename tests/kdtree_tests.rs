//! Integration tests for k-d tree construction, queries and the binary cache.

use lumen::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::NamedTempFile;

fn random_photons(rng: &mut StdRng, count: usize) -> Vec<Photon> {
    (0..count)
        .map(|_| {
            let position = Vec3::new(
                rng.gen_range(-10.0..10.0),
                rng.gen_range(-10.0..10.0),
                rng.gen_range(-10.0..10.0),
            );
            Photon::new(position, Vec3::Y, Vec3::NEG_Y, Vec3::ONE, rng.gen_bool(0.3))
        })
        .collect()
}

fn brute_nearest(
    photons: &[Photon],
    target: Vec3,
    k: usize,
    max_radius: f32,
    filter: impl Fn(&Photon) -> bool,
) -> Vec<Vec3> {
    let mut candidates: Vec<(f32, Vec3)> = photons
        .iter()
        .filter(|p| filter(*p))
        .map(|p| ((p.position - target).length(), p.position))
        .filter(|&(d, _)| d < max_radius)
        .collect();
    candidates.sort_by(|a, b| a.0.total_cmp(&b.0));
    candidates.truncate(k);
    candidates.into_iter().map(|(_, p)| p).collect()
}

fn positions(found: &[&Photon]) -> Vec<Vec3> {
    found.iter().map(|p| p.position).collect()
}

fn sorted(mut points: Vec<Vec3>) -> Vec<Vec3> {
    points.sort_by(|a, b| a.to_array().partial_cmp(&b.to_array()).unwrap());
    points
}

/// Every node splits its subtrees correctly along its axis.
fn check_split_invariant<T: KdContent>(node: &KdNode<T>) -> Vec<Vec3> {
    let mut below = vec![node.content.position()];
    let i = node.axis.index();
    let pos = node.content.position()[i];
    for slot in 0..2 {
        if let Some(child) = node.child(slot) {
            let points = check_split_invariant(child);
            for p in &points {
                if slot == 0 {
                    assert!(p[i] <= pos);
                } else {
                    assert!(p[i] >= pos);
                }
            }
            below.extend(points);
        }
    }
    below
}

#[test]
fn test_build_sizes_and_split_invariant() {
    let mut rng = StdRng::seed_from_u64(1);
    for count in 1..40 {
        let photons = random_photons(&mut rng, count);
        let tree = KdTreeBuilder::default().build(photons).unwrap();
        assert_eq!(tree.size(), count);
        let all = check_split_invariant(tree.root().unwrap());
        assert_eq!(all.len(), count);
    }
}

#[test]
fn test_nearest_matches_brute_force() {
    let mut rng = StdRng::seed_from_u64(2);
    let photons = random_photons(&mut rng, 2000);
    let mut tree = KdTreeBuilder::default().build(photons.clone()).unwrap();

    let queries: Vec<(Vec3, usize, f32)> = (0..100)
        .map(|_| {
            let target = Vec3::new(
                rng.gen_range(-12.0..12.0),
                rng.gen_range(-12.0..12.0),
                rng.gen_range(-12.0..12.0),
            );
            let k = rng.gen_range(1..20);
            let max_radius = if rng.gen_bool(0.5) { f32::INFINITY } else { rng.gen_range(0.5..4.0) };
            (target, k, max_radius)
        })
        .collect();

    let mut linked_results = Vec::new();
    for &(target, k, max_radius) in &queries {
        let mut out = Vec::new();
        let expected = brute_nearest(&photons, target, k, max_radius, |p| p.is_caustic());
        let nearest = tree.nearest(target, k, max_radius, |p| p.is_caustic(), &mut out);

        assert_eq!(positions(&out), expected);
        assert_eq!(nearest.found, expected.len());
        let farthest = expected.last().map_or(0.0, |p| (*p - target).length());
        assert_eq!(nearest.radius, farthest);
        linked_results.push(positions(&out));
    }

    tree.pack().unwrap();
    let mut search = tree.search().unwrap();
    let mut out = Vec::new();
    let mut searched = Vec::new();
    for (&(target, k, max_radius), linked) in queries.iter().zip(&linked_results) {
        tree.nearest(target, k, max_radius, |p| p.is_caustic(), &mut out);
        assert_eq!(&positions(&out), linked);

        search.nearest(target, k, max_radius, |p| p.is_caustic(), &mut searched);
        assert_eq!(&positions(&searched), linked);
    }
}

#[test]
fn test_in_radius_matches_brute_force() {
    let mut rng = StdRng::seed_from_u64(3);
    let photons = random_photons(&mut rng, 1500);
    let mut tree = KdTreeBuilder::default().build(photons.clone()).unwrap();

    for round in 0..2 {
        for _ in 0..50 {
            let target = Vec3::new(
                rng.gen_range(-10.0..10.0),
                rng.gen_range(-10.0..10.0),
                rng.gen_range(-10.0..10.0),
            );
            let radius = rng.gen_range(0.5..3.0);
            let expected: Vec<Vec3> = photons
                .iter()
                .filter(|p| !p.is_caustic() && (p.position - target).length() < radius)
                .map(|p| p.position)
                .collect();

            let mut out = Vec::new();
            tree.in_radius(target, radius, |p| !p.is_caustic(), &mut out);
            assert_eq!(sorted(positions(&out)), sorted(expected));
        }
        if round == 0 {
            tree.pack().unwrap();
        }
    }
}

#[test]
fn test_radius_is_strict() {
    let points = vec![Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0), Vec3::new(3.0, 0.0, 0.0)];
    let tree = KdTreeBuilder::default().build(points).unwrap();
    let mut out = Vec::new();

    tree.in_radius(Vec3::ZERO, 2.0, |_| true, &mut out);
    assert_eq!(out.len(), 1);

    let nearest = tree.nearest(Vec3::ZERO, 3, 2.0, |_| true, &mut out);
    assert_eq!(nearest.found, 1);
    assert_eq!(nearest.radius, 1.0);
}

#[test]
fn test_three_points() {
    let points = vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(-5.0, 0.0, 0.0), Vec3::new(5.0, 0.0, 0.0)];
    let tree = KdTreeBuilder::default().build(points).unwrap();

    // Presorted by x, then split on y: the median by y is the middle element.
    let root = tree.root().unwrap();
    assert_eq!(root.axis, Axis::Y);
    assert!(root.child(0).is_some() && root.child(1).is_some());

    let mut out = Vec::new();
    let nearest = tree.nearest_all(Vec3::new(-4.0, 0.0, 0.0), 2, &mut out);
    assert_eq!(nearest.found, 2);
    assert_eq!(*out[0], Vec3::new(-5.0, 0.0, 0.0));
    assert_eq!(*out[1], Vec3::new(0.0, 0.0, 0.0));
    assert_eq!(nearest.radius, 4.0);
}

#[test]
fn test_parallel_build_matches_sequential() {
    let mut rng = StdRng::seed_from_u64(4);
    let photons = random_photons(&mut rng, 5000);

    let mut sequential = KdTreeBuilder::new(BuildSettings {
        parallel_threshold: usize::MAX,
        parallel_sort_threshold: usize::MAX,
        ..Default::default()
    })
    .build(photons.clone())
    .unwrap();
    let mut parallel = KdTreeBuilder::new(BuildSettings {
        parallel_threshold: 8,
        parallel_sort_threshold: 32,
        ..Default::default()
    })
    .build(photons)
    .unwrap();

    sequential.pack().unwrap();
    parallel.pack().unwrap();
    assert_eq!(sequential.packed_nodes(), parallel.packed_nodes());
}

#[test]
fn test_save_load_roundtrip() {
    let mut rng = StdRng::seed_from_u64(5);
    let list = PhotonList::new();
    list.push_batch(random_photons(&mut rng, 700));
    list.push_batch(random_photons(&mut rng, 300));

    let mut map = list.build_map(&BuildSettings::default()).unwrap();
    assert!(matches!(map.save("/nonexistent/never.kdt"), Err(Error::NotPacked)));
    map.pack().unwrap();

    let temp = NamedTempFile::new().expect("Failed to create temp file");
    map.save(temp.path()).unwrap();
    let expected_len = lumen::kdtree::HEADER_SIZE + 1000 * PhotonMap::node_byte_size();
    assert_eq!(std::fs::metadata(temp.path()).unwrap().len() as usize, expected_len);

    let loaded = PhotonMap::load(temp.path()).unwrap();
    assert!(loaded.is_packed());
    assert_eq!(loaded.size(), 1000);
    assert_eq!(loaded.packed_nodes(), map.packed_nodes());
    assert_eq!(loaded.stats(), map.stats());

    let target = Vec3::new(1.0, 2.0, 3.0);
    let mut a = Vec::new();
    let mut b = Vec::new();
    map.nearest(target, 10, f32::INFINITY, |p| p.is_caustic(), &mut a);
    loaded.nearest(target, 10, f32::INFINITY, |p| p.is_caustic(), &mut b);
    assert_eq!(positions(&a), positions(&b));
}

#[test]
fn test_load_missing_file() {
    let err = PhotonMap::load("/nonexistent/photons.kdt").unwrap_err();
    assert!(matches!(err, Error::FileNotFound(_)));
}

#[test]
fn test_load_rejects_other_layout() {
    // A Vec3 tree has smaller nodes than a photon tree.
    let mut tree = KdTreeBuilder::default()
        .build(vec![Vec3::ZERO, Vec3::ONE, Vec3::X])
        .unwrap();
    tree.pack().unwrap();
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    tree.save(temp.path()).unwrap();

    let err = PhotonMap::load(temp.path()).unwrap_err();
    assert!(matches!(err, Error::NodeSizeMismatch { expected: 64, found: 24 }));
}
