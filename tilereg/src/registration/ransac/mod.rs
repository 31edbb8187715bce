//! Affine transform estimation from landmark correspondences.
//!
//! Two estimators are provided:
//! - direct least squares over every pair ([`estimate_affine`])
//! - RANSAC ([`RansacEstimator`]): repeatedly fit minimal 3-pair samples,
//!   keep the candidate with the most inliers and refit on its inlier set
//!
//! Transforms map MOVING points onto FIXED points.


use glam::DVec2;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::registration::config::{EstimatorConfig, EstimatorKind, RansacConfig};
use crate::registration::matching::Correspondences;
use crate::registration::result::{MIN_POINTS, RegistrationError};
use crate::registration::transform::Transform;

/// Relative tolerance for the normal-equation determinant.
const DEGENERATE_TOLERANCE: f64 = 1e-9;

/// Result of RANSAC estimation.
#[derive(Debug, Clone)]
pub struct RansacResult {
    /// Refined transformation.
    pub transform: Transform,
    /// Inlier flag per (possibly subsampled) input pair.
    pub inliers: Vec<bool>,
    /// Number of trials performed.
    pub trials: usize,
    /// Indices into the input pairs that were considered.
    pub sample_indices: Vec<usize>,
}

impl RansacResult {
    pub fn inlier_count(&self) -> usize {
        self.inliers.iter().filter(|&&b| b).count()
    }
}

/// RANSAC estimator for robust affine fitting.
pub struct RansacEstimator {
    config: RansacConfig,
}

impl RansacEstimator {
    pub fn new(config: RansacConfig) -> Self {
        Self { config }
    }

    /// Estimate the transform taking `moving` onto `fixed`.
    ///
    /// The inputs must be index-aligned. When more than `max_samples` pairs
    /// are supplied, a uniform subset without replacement is used and the
    /// returned inlier mask refers to that subset.
    pub fn estimate(
        &self,
        moving: &[DVec2],
        fixed: &[DVec2],
    ) -> Result<RansacResult, RegistrationError> {
        debug_assert_eq!(moving.len(), fixed.len());
        let n_total = moving.len();
        if n_total < MIN_POINTS {
            return Err(RegistrationError::InsufficientCorrespondence {
                found: n_total,
                required: MIN_POINTS,
            });
        }

        let mut rng: ChaCha8Rng = match self.config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_os_rng(),
        };

        let sample_indices: Vec<usize> = if n_total > self.config.max_samples {
            let mut picked =
                rand::seq::index::sample(&mut rng, n_total, self.config.max_samples).into_vec();
            picked.sort_unstable();
            picked
        } else {
            (0..n_total).collect()
        };
        let moving: Vec<DVec2> = sample_indices.iter().map(|&i| moving[i]).collect();
        let fixed: Vec<DVec2> = sample_indices.iter().map(|&i| fixed[i]).collect();
        let n = moving.len();

        let mut best: Option<(Transform, Vec<bool>, usize)> = None;
        let mut minimal: Vec<usize> = Vec::with_capacity(MIN_POINTS);
        let mut sample_moving = [DVec2::ZERO; MIN_POINTS];
        let mut sample_fixed = [DVec2::ZERO; MIN_POINTS];

        let mut trials = 0;
        while trials < self.config.max_trials {
            trials += 1;

            random_sample_into(&mut rng, n, MIN_POINTS, &mut minimal);
            for (slot, &i) in minimal.iter().enumerate() {
                sample_moving[slot] = moving[i];
                sample_fixed[slot] = fixed[i];
            }

            let Some(candidate) = estimate_affine(&sample_moving, &sample_fixed) else {
                continue;
            };

            let (mask, count) = mark_inliers(
                &moving,
                &fixed,
                &candidate,
                self.config.residual_threshold,
            );

            let improves = best.as_ref().is_none_or(|(_, _, c)| count > *c);
            if improves {
                best = Some((candidate, mask, count));
                if count == n {
                    break;
                }
            }
        }

        let Some((candidate, mask, count)) = best else {
            return Err(RegistrationError::TransformEstimationFailed { trials });
        };

        let transform = if count >= MIN_POINTS {
            let inlier_moving: Vec<DVec2> = select(&moving, &mask);
            let inlier_fixed: Vec<DVec2> = select(&fixed, &mask);
            estimate_affine(&inlier_moving, &inlier_fixed).unwrap_or(candidate)
        } else {
            candidate
        };

        tracing::debug!(
            trials,
            considered = n,
            inliers = count,
            "RANSAC finished"
        );

        Ok(RansacResult {
            transform,
            inliers: mask,
            trials,
            sample_indices,
        })
    }
}

/// Randomly sample k unique indices from 0..n into a pre-allocated buffer.
///
/// Floyd's algorithm; k is tiny compared to n here.
fn random_sample_into<R: Rng>(rng: &mut R, n: usize, k: usize, buffer: &mut Vec<usize>) {
    debug_assert!(k <= n, "Cannot sample {} indices from {}", k, n);
    buffer.clear();
    for j in (n - k)..n {
        let t = rng.random_range(0..=j);
        if buffer.contains(&t) {
            buffer.push(j);
        } else {
            buffer.push(t);
        }
    }
}

fn mark_inliers(
    moving: &[DVec2],
    fixed: &[DVec2],
    transform: &Transform,
    threshold: f64,
) -> (Vec<bool>, usize) {
    let mut count = 0;
    let mask = moving
        .iter()
        .zip(fixed)
        .map(|(&m, &f)| {
            let inlier = transform.residual(m, f) < threshold;
            count += inlier as usize;
            inlier
        })
        .collect();
    (mask, count)
}

fn select(points: &[DVec2], mask: &[bool]) -> Vec<DVec2> {
    points
        .iter()
        .zip(mask)
        .filter(|(_, keep)| **keep)
        .map(|(p, _)| *p)
        .collect()
}

/// Least-squares affine fit mapping `moving` onto `fixed`.
///
/// Solves the normal equations on centred coordinates, which decouples the
/// translation from the 2x2 linear part. Returns `None` for fewer than three
/// pairs or when the moving points are (near) collinear.
pub fn estimate_affine(moving: &[DVec2], fixed: &[DVec2]) -> Option<Transform> {
    if moving.len() < MIN_POINTS || moving.len() != fixed.len() {
        return None;
    }

    let n = moving.len() as f64;
    let moving_center = moving.iter().copied().sum::<DVec2>() / n;
    let fixed_center = fixed.iter().copied().sum::<DVec2>() / n;

    // Scatter of the moving points and cross terms with the fixed points.
    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    let mut sx_u = 0.0;
    let mut sy_u = 0.0;
    let mut sx_v = 0.0;
    let mut sy_v = 0.0;

    for (m, f) in moving.iter().zip(fixed) {
        let p = *m - moving_center;
        let q = *f - fixed_center;
        sxx += p.x * p.x;
        sxy += p.x * p.y;
        syy += p.y * p.y;
        sx_u += p.x * q.x;
        sy_u += p.y * q.x;
        sx_v += p.x * q.y;
        sy_v += p.y * q.y;
    }

    let det = sxx * syy - sxy * sxy;
    let scale = sxx * syy;
    if !det.is_finite() || scale <= 0.0 || det <= DEGENERATE_TOLERANCE * scale {
        return None;
    }

    let inv_det = 1.0 / det;
    // [a b] solves [sxx sxy; sxy syy] [a; b] = [sx_u; sy_u]
    let a = (syy * sx_u - sxy * sy_u) * inv_det;
    let b = (sxx * sy_u - sxy * sx_u) * inv_det;
    let c = (syy * sx_v - sxy * sy_v) * inv_det;
    let d = (sxx * sy_v - sxy * sx_v) * inv_det;

    let tx = fixed_center.x - (a * moving_center.x + b * moving_center.y);
    let ty = fixed_center.y - (c * moving_center.x + d * moving_center.y);

    let transform = Transform::affine([a, b, tx, c, d, ty]);
    transform.is_valid().then_some(transform)
}

/// Root-mean-square residual of `transform` over the pairs.
pub fn rms_residual(transform: &Transform, moving: &[DVec2], fixed: &[DVec2]) -> f64 {
    if moving.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = moving
        .iter()
        .zip(fixed)
        .map(|(&m, &f)| {
            let r = transform.residual(m, f);
            r * r
        })
        .sum();
    (sum_sq / moving.len() as f64).sqrt()
}

/// Outcome of transform estimation.
#[derive(Debug, Clone)]
pub struct Estimate {
    pub transform: Transform,
    /// Inlier count, only reported by RANSAC.
    pub inliers: Option<usize>,
    /// RMS residual over the pairs used for the final fit.
    pub rms_residual: f64,
}

/// Estimate the moving-to-fixed transform with the configured estimator.
pub fn estimate(
    matches: &Correspondences,
    config: &EstimatorConfig,
) -> Result<Estimate, RegistrationError> {
    match config.kind {
        EstimatorKind::LeastSquares => {
            if matches.len() < MIN_POINTS {
                return Err(RegistrationError::InsufficientCorrespondence {
                    found: matches.len(),
                    required: MIN_POINTS,
                });
            }
            let transform = estimate_affine(&matches.moving, &matches.fixed)
                .ok_or(RegistrationError::TransformEstimationFailed { trials: 1 })?;
            Ok(Estimate {
                rms_residual: rms_residual(&transform, &matches.moving, &matches.fixed),
                transform,
                inliers: None,
            })
        }
        EstimatorKind::Ransac => {
            let result = RansacEstimator::new(config.ransac.clone())
                .estimate(&matches.moving, &matches.fixed)?;

            let (moving, fixed): (Vec<DVec2>, Vec<DVec2>) = result
                .sample_indices
                .iter()
                .zip(&result.inliers)
                .filter(|(_, inlier)| **inlier)
                .map(|(&i, _)| (matches.moving[i], matches.fixed[i]))
                .unzip();

            Ok(Estimate {
                rms_residual: rms_residual(&result.transform, &moving, &fixed),
                inliers: Some(result.inlier_count()),
                transform: result.transform,
            })
        }
    }
}
