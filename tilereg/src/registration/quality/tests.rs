use super::*;

fn blob_image(
    width: usize,
    height: usize,
    centers: &[(usize, usize)],
    radius: usize,
) -> Buffer2<f32> {
    blob_image_with_levels(width, height, centers, radius, 0.9, 0.1)
}

fn blob_image_with_levels(
    width: usize,
    height: usize,
    centers: &[(usize, usize)],
    radius: usize,
    foreground: f32,
    background: f32,
) -> Buffer2<f32> {
    Buffer2::from_fn(width, height, |x, y| {
        let inside = centers.iter().any(|&(cx, cy)| {
            let dx = x as i64 - cx as i64;
            let dy = y as i64 - cy as i64;
            dx * dx + dy * dy <= (radius * radius) as i64
        });
        if inside { foreground } else { background }
    })
}

fn mask_from(bits: &[u8], width: usize) -> Buffer2<bool> {
    Buffer2::new(width, bits.len() / width, bits.iter().map(|&b| b != 0).collect())
}

#[test]
fn test_otsu_mask_separates_blobs() {
    let image = blob_image(40, 40, &[(10, 10), (30, 25)], 4);
    let mask = otsu_mask(&image);
    assert!(mask[(10, 10)]);
    assert!(mask[(30, 25)]);
    assert!(!mask[(0, 0)]);
    assert!(!mask[(20, 35)]);
}

#[test]
fn test_identical_images_score_one() {
    let image = blob_image(32, 32, &[(8, 8), (20, 22)], 3);
    let score = registration_quality(&image, &image);
    assert!((score - 1.0).abs() < 1e-12, "score {}", score);
}

#[test]
fn test_inverted_masks_score_minus_one() {
    let a = mask_from(&[1, 1, 0, 0, 1, 0], 3);
    let b = mask_from(&[0, 0, 1, 1, 0, 1], 3);
    assert!((binary_correlation(&a, &b) + 1.0).abs() < 1e-12);
}

#[test]
fn test_partial_overlap() {
    // a = [1,1,0,0], b = [1,0,1,0]: independent -> 0
    let a = mask_from(&[1, 1, 0, 0], 2);
    let b = mask_from(&[1, 0, 1, 0], 2);
    assert!(binary_correlation(&a, &b).abs() < 1e-12);
}

#[test]
fn test_constant_mask_scores_zero() {
    let a = mask_from(&[1, 1, 1, 1], 2);
    let b = mask_from(&[1, 0, 1, 0], 2);
    assert_eq!(binary_correlation(&a, &b), 0.0);
    assert_eq!(binary_correlation(&b, &a), 0.0);

    let flat = Buffer2::new_filled(16, 16, 0.3f32);
    let blobs = blob_image(16, 16, &[(8, 8)], 3);
    assert_eq!(registration_quality(&flat, &blobs), 0.0);
}

#[test]
fn test_misaligned_scores_lower() {
    let fixed = blob_image(64, 64, &[(16, 16), (40, 44), (50, 12)], 4);
    let aligned = fixed.clone();
    let shifted = blob_image(64, 64, &[(22, 19), (46, 47), (56, 15)], 4);

    let good = registration_quality(&fixed, &aligned);
    let bad = registration_quality(&fixed, &shifted);
    assert!(good > bad, "aligned {} should beat shifted {}", good, bad);
}

#[test]
fn test_dim_u16_intensities_keep_their_masks() {
    // Counts of 120 over 30 in a 16-bit tile all fall in the lowest 8-bit bin
    // of the absolute range.
    let fg = 120.0 / 65535.0;
    let bg = 30.0 / 65535.0;
    let fixed = blob_image_with_levels(64, 64, &[(16, 16), (40, 44), (50, 12)], 4, fg, bg);
    let shifted = blob_image_with_levels(64, 64, &[(22, 19), (46, 47), (56, 15)], 4, fg, bg);

    let mask = otsu_mask(&fixed);
    assert!(mask[(16, 16)]);
    assert!(!mask[(0, 0)]);

    let same = registration_quality(&fixed, &fixed);
    assert!((same - 1.0).abs() < 1e-12, "score {}", same);

    let bad = registration_quality(&fixed, &shifted);
    assert!(same > bad, "aligned {} should beat shifted {}", same, bad);
}

#[test]
fn test_constant_image_has_no_foreground() {
    let flat = Buffer2::new_filled(8, 8, 0.5f32);
    let mask = otsu_mask(&flat);
    assert_eq!(mask.len(), 64);
    assert!(mask.iter().all(|&m| !m));
}
