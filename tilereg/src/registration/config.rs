//! Configuration types for the registration engine.
//!
//! All configuration structs and related enums for matching, estimation and
//! resampling are consolidated here. They deserialize from the run config
//! with every field optional.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to read config '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yml::Error,
    },
}

macro_rules! ensure_config {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err(ConfigError::Invalid(format!($($arg)+)));
        }
    };
}
pub(crate) use ensure_config;

// =============================================================================
// Correspondence matching configuration
// =============================================================================

/// Nearest-neighbour correspondence matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Pairs at or beyond this distance (pixels) are rejected.
    pub max_distance: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self { max_distance: 50.0 }
    }
}

impl MatchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_config!(
            self.max_distance > 0.0 && self.max_distance.is_finite(),
            "matching.max_distance must be positive, got {}",
            self.max_distance
        );
        Ok(())
    }
}

// =============================================================================
// Transform estimation configuration
// =============================================================================

/// Which estimator turns correspondences into a transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimatorKind {
    /// Direct least squares over all pairs.
    #[default]
    LeastSquares,
    /// Random-sample consensus followed by a least-squares refit on inliers.
    Ransac,
}

/// RANSAC configuration.
///
/// Defaults: residual threshold 5 px, 1000 trials, at most 200 pairs
/// considered per estimation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacConfig {
    /// Maximum number of minimal-sample trials.
    pub max_trials: usize,
    /// A pair is an inlier when its residual is below this (pixels).
    pub residual_threshold: f64,
    /// Pairs are uniformly subsampled to this count before estimation.
    pub max_samples: usize,
    /// Random seed for reproducibility (None for OS entropy).
    pub seed: Option<u64>,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            max_trials: 1000,
            residual_threshold: 5.0,
            max_samples: 200,
            seed: None,
        }
    }
}

impl RansacConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_config!(
            self.max_trials > 0,
            "ransac.max_trials must be positive, got {}",
            self.max_trials
        );
        ensure_config!(
            self.residual_threshold > 0.0 && self.residual_threshold.is_finite(),
            "ransac.residual_threshold must be positive, got {}",
            self.residual_threshold
        );
        ensure_config!(
            self.max_samples >= 3,
            "ransac.max_samples must be >= 3 for an affine fit, got {}",
            self.max_samples
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    pub kind: EstimatorKind,
    pub ransac: RansacConfig,
}

impl EstimatorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ransac.validate()
    }
}

// =============================================================================
// Resampling configuration
// =============================================================================

/// Interpolation method for image resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationMethod {
    /// Nearest neighbor - exact sample values, blocky
    Nearest,
    /// Bilinear interpolation - default, no overshoot
    #[default]
    Bilinear,
    /// Bicubic (Catmull-Rom) - sharper, may ring slightly
    Bicubic,
    /// Lanczos-3 (6x6 kernel) - highest quality, slowest
    Lanczos3,
}

/// Configuration for image warping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WarpConfig {
    /// Interpolation method to use
    pub method: InterpolationMethod,
    /// Value for output pixels whose source falls outside the image, in the
    /// `[0, 1]` working range
    pub fill_value: f32,
}

impl Default for WarpConfig {
    fn default() -> Self {
        Self {
            method: InterpolationMethod::default(),
            fill_value: 0.0,
        }
    }
}

impl WarpConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_config!(
            (0.0..=1.0).contains(&self.fill_value),
            "warp.fill_value must be in [0, 1], got {}",
            self.fill_value
        );
        Ok(())
    }
}
