//! Multi-round registration of tiled microscopy images.
//!
//! Each tile's fixed reference image is aligned with the same tile in every
//! other imaging round through segmented landmarks, and the round's
//! auxiliary channels are resampled with the estimated transform.

pub mod landmarks;
pub mod pipeline;
pub mod registration;
pub mod tile;

pub use landmarks::{LandmarkExtractor, ThresholdConfig, ThresholdExtractor};
pub use pipeline::{PipelineConfig, RoundOutcome, RunError, RunSummary, TileRegistrator, TileReport};
pub use registration::{RegistrationError, Transform};
pub use tile::{SampleFormat, TileImage};
