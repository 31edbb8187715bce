//! Registration quality metric.
//!
//! Both images are stretched over their own intensity range, binarised with
//! Otsu's threshold, and the Pearson correlation of the two binary masks is
//! reported. The score is purely informational and never decides whether a
//! round succeeded.

use common::Buffer2;
use imageproc::contrast::otsu_level;

use crate::tile::{normalize_min_max, quantize_u8};

#[cfg(test)]
mod tests;

/// Foreground mask: pixels strictly above the Otsu level of the image.
///
/// The level is computed on the image's own min..max range, so dim 16-bit
/// data keeps its full 256-bin histogram. A constant image has no
/// foreground.
pub fn otsu_mask(pixels: &Buffer2<f32>) -> Buffer2<bool> {
    let Some(normalized) = normalize_min_max(pixels) else {
        return Buffer2::new(pixels.width(), pixels.height(), vec![false; pixels.len()]);
    };
    let gray = quantize_u8(&normalized);
    let level = otsu_level(&gray);
    let mask = gray.pixels().map(|p| p.0[0] > level).collect();
    Buffer2::new(pixels.width(), pixels.height(), mask)
}

/// Pearson correlation between two equally sized binary masks.
///
/// Returns `0.0` when either mask is constant, where the correlation is
/// undefined.
pub fn binary_correlation(a: &Buffer2<bool>, b: &Buffer2<bool>) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }

    let mut sum_a = 0usize;
    let mut sum_b = 0usize;
    let mut sum_ab = 0usize;
    for (&x, &y) in a.iter().zip(b.iter()) {
        sum_a += x as usize;
        sum_b += y as usize;
        sum_ab += (x && y) as usize;
    }

    let n = n as f64;
    let (sa, sb, sab) = (sum_a as f64, sum_b as f64, sum_ab as f64);
    let cov = sab - sa * sb / n;
    let var_a = sa - sa * sa / n;
    let var_b = sb - sb * sb / n;

    let denom = (var_a * var_b).sqrt();
    if denom <= 0.0 || !denom.is_finite() {
        return 0.0;
    }
    (cov / denom).clamp(-1.0, 1.0)
}

/// Otsu-binarise both images and correlate the masks.
pub fn registration_quality(fixed: &Buffer2<f32>, registered: &Buffer2<f32>) -> f64 {
    binary_correlation(&otsu_mask(fixed), &otsu_mask(registered))
}
