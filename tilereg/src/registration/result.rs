//! Registration errors and skip reasons.

use std::path::PathBuf;

use thiserror::Error;

/// Minimum landmarks / correspondences needed for an affine fit.
pub const MIN_POINTS: usize = 3;

/// Per-unit registration failure.
///
/// Every variant is recoverable at the run level: the orchestrator logs it and
/// moves on to the next round or tile.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("Input image '{path}' does not exist")]
    MissingInput { path: PathBuf },

    #[error("Insufficient landmarks: found {found}, need {required}")]
    InsufficientLandmarks { found: usize, required: usize },

    #[error("Insufficient correspondences: found {found}, need {required}")]
    InsufficientCorrespondence { found: usize, required: usize },

    #[error("Transform estimation failed after {trials} trial(s)")]
    TransformEstimationFailed { trials: usize },

    #[error("Failed to read image '{path}': {source}")]
    ImageRead {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to write image '{path}': {source}")]
    ImageWrite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

impl RegistrationError {
    /// Short machine-friendly tag used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RegistrationError::MissingInput { .. } => "missing_input",
            RegistrationError::InsufficientLandmarks { .. } => "insufficient_landmarks",
            RegistrationError::InsufficientCorrespondence { .. } => "insufficient_correspondence",
            RegistrationError::TransformEstimationFailed { .. } => "transform_estimation_failed",
            RegistrationError::ImageRead { .. } => "image_read",
            RegistrationError::ImageWrite { .. } => "image_write",
        }
    }
}
