//! Tests for the spatial module (k-d tree).

use super::*;

/// Brute-force reference for nearest-neighbour queries.
fn brute_force_nearest(points: &[DVec2], query: DVec2) -> Neighbor {
    let mut best = Neighbor {
        index: usize::MAX,
        dist_sq: f64::INFINITY,
    };
    for (index, p) in points.iter().enumerate() {
        let dist_sq = query.distance_squared(*p);
        if dist_sq < best.dist_sq {
            best = Neighbor { index, dist_sq };
        }
    }
    best
}

/// Deterministic pseudo-random points (LCG) so the test needs no RNG setup.
fn scattered_points(n: usize, seed: u64) -> Vec<DVec2> {
    let mut state = seed;
    let mut next = || {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((state >> 33) as f64 / (1u64 << 31) as f64) * 500.0
    };
    (0..n).map(|_| DVec2::new(next(), next())).collect()
}

#[test]
fn test_kdtree_build_empty() {
    assert!(KdTree::build(&[]).is_none());
}

#[test]
fn test_kdtree_build_single_point() {
    let tree = KdTree::build(&[DVec2::new(1.0, 2.0)]).unwrap();
    assert_eq!(tree.len(), 1);
    let n = tree.nearest(DVec2::new(4.0, 6.0)).unwrap();
    assert_eq!(n.index, 0);
    assert!((n.dist_sq - 25.0).abs() < 1e-12);
}

#[test]
fn test_kdtree_nearest_finds_exact_point() {
    let points = vec![
        DVec2::new(0.0, 0.0),
        DVec2::new(10.0, 10.0),
        DVec2::new(5.0, 5.0),
    ];
    let tree = KdTree::build(&points).unwrap();

    let n = tree.nearest(DVec2::new(5.0, 5.0)).unwrap();
    assert_eq!(n.index, 2);
    assert!(n.dist_sq < 1e-12);
}

#[test]
fn test_kdtree_nearest_matches_brute_force() {
    let points = scattered_points(300, 7);
    let queries = scattered_points(200, 99);
    let tree = KdTree::build(&points).unwrap();

    for q in queries {
        let expected = brute_force_nearest(&points, q);
        let got = tree.nearest(q).unwrap();
        assert!(
            (got.dist_sq - expected.dist_sq).abs() < 1e-9,
            "Query {:?}: tree found {:?}, brute force {:?}",
            q,
            got,
            expected
        );
    }
}

#[test]
fn test_kdtree_duplicate_points_prefer_lower_index() {
    let points = vec![
        DVec2::new(3.0, 3.0),
        DVec2::new(1.0, 1.0),
        DVec2::new(1.0, 1.0),
        DVec2::new(1.0, 1.0),
    ];
    let tree = KdTree::build(&points).unwrap();
    let n = tree.nearest(DVec2::new(1.0, 1.2)).unwrap();
    assert_eq!(n.index, 1);
}

#[test]
fn test_kdtree_collinear_points() {
    let points: Vec<DVec2> = (0..20).map(|i| DVec2::new(i as f64 * 10.0, 0.0)).collect();
    let tree = KdTree::build(&points).unwrap();
    let n = tree.nearest(DVec2::new(73.0, 4.0)).unwrap();
    assert_eq!(n.index, 7);
}
