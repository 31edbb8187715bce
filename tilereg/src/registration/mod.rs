//! Landmark-based registration engine.
//!
//! - **Matching**: nearest-neighbour correspondences through a k-d tree
//! - **Estimation**: affine fit by direct least squares or RANSAC
//! - **Resampling**: moving image onto the fixed grid plus a validity mask
//! - **Quality**: Otsu masks correlated with Pearson's coefficient
//!
//! Transforms always map MOVING coordinates to FIXED coordinates.

pub mod config;
pub mod interpolation;
pub mod matching;
pub mod quality;
pub mod ransac;
pub mod result;
pub mod spatial;
pub mod transform;

#[cfg(test)]
mod tests;

pub use config::{
    ConfigError, EstimatorConfig, EstimatorKind, InterpolationMethod, MatchConfig, RansacConfig,
    WarpConfig,
};
pub use interpolation::{padding_fraction, validity_mask, warp_image};
pub use matching::{Correspondences, match_landmarks};
pub use quality::registration_quality;
pub use ransac::{Estimate, RansacEstimator, RansacResult, estimate, estimate_affine};
pub use result::{MIN_POINTS, RegistrationError};
pub use transform::Transform;
