//! Engine-level tests: landmarks in, registered pixels out.

use super::*;
use common::Buffer2;
use glam::DVec2;

fn square() -> Vec<DVec2> {
    // (y, x) = (10,10), (10,50), (50,10), (50,50)
    vec![
        DVec2::new(10.0, 10.0),
        DVec2::new(50.0, 10.0),
        DVec2::new(10.0, 50.0),
        DVec2::new(50.0, 50.0),
    ]
}

#[test]
fn test_translation_recovered_and_applied() {
    let fixed = square();
    // Moving is displaced by (+5 rows, +3 columns).
    let moving: Vec<DVec2> = fixed.iter().map(|p| *p + DVec2::new(3.0, 5.0)).collect();

    let matches = match_landmarks(&fixed, &moving, &MatchConfig::default()).unwrap();
    assert_eq!(matches.len(), 4);
    let estimate = estimate(&matches, &EstimatorConfig::default()).unwrap();
    let transform = estimate.transform;

    let displacement = transform.inverse().translation_components();
    assert!((displacement.x - 3.0).abs() < 1e-9);
    assert!((displacement.y - 5.0).abs() < 1e-9);
    assert!((transform.determinant() - 1.0).abs() < 1e-9);

    let mut image = Buffer2::new_filled(64, 64, 0.0f32);
    image[(13, 15)] = 1.0;
    let registered = warp_image(&image, &transform, (64, 64), &WarpConfig::default());
    assert!((registered[(10, 10)] - 1.0).abs() < 1e-6);

    let mask = validity_mask((64, 64), &transform, (64, 64));
    assert!(mask[(0, 0)]);
    assert!(!mask[(63, 63)]);
    // Padding: 3 columns and 5 rows of the 64x64 grid.
    let expected = (64.0 * 64.0 - 61.0 * 59.0) / (64.0 * 64.0);
    assert!((padding_fraction(&mask) - expected).abs() < 1e-12);
}

#[test]
fn test_ransac_and_least_squares_agree_on_clean_data() {
    let fixed: Vec<DVec2> = (0..30)
        .map(|i| DVec2::new((i % 6) as f64 * 40.0 + 7.0, (i / 6) as f64 * 45.0 + 3.0))
        .collect();
    let truth = Transform::similarity(DVec2::new(-4.0, 2.5), 0.02, 1.0);
    let moving: Vec<DVec2> = fixed.iter().map(|&p| truth.inverse().apply(p)).collect();

    let matches = match_landmarks(&fixed, &moving, &MatchConfig::default()).unwrap();
    let lsq = estimate(&matches, &EstimatorConfig::default()).unwrap();
    let robust = estimate(
        &matches,
        &EstimatorConfig {
            kind: EstimatorKind::Ransac,
            ransac: RansacConfig {
                seed: Some(17),
                ..Default::default()
            },
        },
    )
    .unwrap();

    for (a, b) in lsq.transform.params().iter().zip(robust.transform.params().iter()) {
        assert!((a - b).abs() < 1e-6, "{} vs {}", a, b);
    }
    assert_eq!(robust.inliers, Some(30));
}

#[test]
fn test_quality_rewards_alignment() {
    let fixed_points = square();
    let blob = |centers: &[DVec2]| {
        Buffer2::from_fn(64, 64, |x, y| {
            let p = DVec2::new(x as f64, y as f64);
            if centers.iter().any(|c| c.distance(p) <= 3.0) { 1.0f32 } else { 0.0 }
        })
    };
    let moving_points: Vec<DVec2> = fixed_points
        .iter()
        .map(|p| *p + DVec2::new(3.0, 5.0))
        .collect();
    let fixed = blob(&fixed_points);
    let moving = blob(&moving_points);

    let matches = match_landmarks(&fixed_points, &moving_points, &MatchConfig::default()).unwrap();
    let transform = estimate(&matches, &EstimatorConfig::default()).unwrap().transform;
    let registered = warp_image(&moving, &transform, (64, 64), &WarpConfig::default());

    let before = registration_quality(&fixed, &moving);
    let after = registration_quality(&fixed, &registered);
    assert!((after - 1.0).abs() < 1e-9, "after {}", after);
    assert!(before < after);
}
