use super::*;
use crate::tile::SampleFormat;
use common::Buffer2;

fn disk_tile(width: usize, height: usize, centers: &[(usize, usize)], radius: i64) -> TileImage {
    let pixels = Buffer2::from_fn(width, height, |x, y| {
        let inside = centers.iter().any(|&(cx, cy)| {
            let dx = x as i64 - cx as i64;
            let dy = y as i64 - cy as i64;
            dx * dx + dy * dy <= radius * radius
        });
        if inside { 0.8 } else { 0.05 }
    });
    TileImage::new(pixels, SampleFormat::U16)
}

#[test]
fn test_centroids_of_disks() {
    let centers = [(10, 10), (40, 10), (25, 40)];
    let tile = disk_tile(60, 60, &centers, 3);
    let landmarks = ThresholdExtractor::default().extract(&tile);

    assert_eq!(landmarks.len(), 3);
    // Label order follows the raster position of each component's first pixel.
    for (found, &(cx, cy)) in landmarks.iter().zip(centers.iter()) {
        assert!(
            (found.x - cx as f64).abs() < 1e-9 && (found.y - cy as f64).abs() < 1e-9,
            "expected ({}, {}), got {:?}",
            cx,
            cy,
            found
        );
    }
}

#[test]
fn test_small_components_removed() {
    let mut pixels = disk_tile(50, 50, &[(25, 25)], 4).into_pixels();
    // Isolated specks: removed by opening and by min_area.
    pixels[(3, 3)] = 0.8;
    pixels[(45, 5)] = 0.8;
    pixels[(46, 5)] = 0.8;
    let tile = TileImage::new(pixels, SampleFormat::U8);

    let landmarks = ThresholdExtractor::default().extract(&tile);
    assert_eq!(landmarks.len(), 1);
    assert!((landmarks[0] - DVec2::new(25.0, 25.0)).length() < 1e-9);

    let no_opening = ThresholdExtractor::new(ThresholdConfig {
        min_area: 1,
        opening_radius: 0,
    });
    assert_eq!(no_opening.extract(&tile).len(), 3);
}

#[test]
fn test_min_area_filter() {
    let tile = disk_tile(40, 40, &[(10, 10), (30, 30)], 2);
    // Radius-2 disks have 13 pixels; opening with a 3x3 square keeps 9.
    let strict = ThresholdExtractor::new(ThresholdConfig {
        min_area: 50,
        opening_radius: 0,
    });
    assert!(strict.extract(&tile).is_empty());

    let loose = ThresholdExtractor::new(ThresholdConfig {
        min_area: 5,
        opening_radius: 0,
    });
    assert_eq!(loose.extract(&tile).len(), 2);
}

#[test]
fn test_constant_image_has_no_landmarks() {
    let tile = TileImage::new(Buffer2::new_filled(20, 20, 0.4f32), SampleFormat::U8);
    assert!(ThresholdExtractor::default().extract(&tile).is_empty());
}

#[test]
fn test_closure_extractor() {
    let fixed_points = vec![DVec2::new(1.0, 2.0), DVec2::new(3.0, 4.0)];
    let extractor = |_: &TileImage| fixed_points.clone();
    let tile = TileImage::new(Buffer2::new_filled(4, 4, 0.0f32), SampleFormat::U8);
    assert_eq!(extractor.extract(&tile), fixed_points);
}

#[test]
fn test_threshold_config_validation() {
    ThresholdConfig::default().validate().unwrap();
    let bad = ThresholdConfig {
        min_area: 0,
        ..Default::default()
    };
    assert!(bad.validate().is_err());
}
