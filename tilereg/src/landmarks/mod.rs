//! Landmark extraction: image in, ordered centroids out.
//!
//! Segmentation is a capability behind [`LandmarkExtractor`]. A classical
//! threshold-and-label pipeline ships as [`ThresholdExtractor`]; any
//! `Fn(&TileImage) -> Vec<DVec2> + Sync` closure works as well, which is how
//! external detectors are plugged in.

use glam::DVec2;
use image::{GrayImage, Luma};
use imageproc::contrast::otsu_level;
use imageproc::distance_transform::Norm;
use imageproc::morphology::open;
use imageproc::region_labelling::{Connectivity, connected_components};
use serde::{Deserialize, Serialize};

use crate::registration::config::{ConfigError, ensure_config};
use crate::tile::{TileImage, normalize_min_max, quantize_u8};

#[cfg(test)]
mod tests;

/// Turns an image into landmark points (`x` = column, `y` = row), one per
/// segmented object, in the same pixel frame as the image.
pub trait LandmarkExtractor: Sync {
    fn extract(&self, image: &TileImage) -> Vec<DVec2>;
}

impl<F> LandmarkExtractor for F
where
    F: Fn(&TileImage) -> Vec<DVec2> + Sync,
{
    fn extract(&self, image: &TileImage) -> Vec<DVec2> {
        self(image)
    }
}

/// Parameters of the threshold extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Components with fewer pixels are discarded.
    pub min_area: usize,
    /// Radius of the square opening applied to the binary mask. 0 disables it.
    pub opening_radius: u8,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            min_area: 10,
            opening_radius: 1,
        }
    }
}

impl ThresholdConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_config!(
            self.min_area >= 1,
            "landmarks.min_area must be at least 1, got {}",
            self.min_area
        );
        Ok(())
    }
}

/// Classical segmentation: min-max normalise, Otsu threshold, optional
/// opening, 8-connected labelling and per-component centroids.
#[derive(Debug, Clone, Default)]
pub struct ThresholdExtractor {
    config: ThresholdConfig,
}

impl ThresholdExtractor {
    pub fn new(config: ThresholdConfig) -> Self {
        Self { config }
    }

    /// Foreground mask (255 = object) of a tile.
    fn binarize(&self, image: &TileImage) -> Option<GrayImage> {
        let normalized = normalize_min_max(image.pixels())?;
        let mut gray = quantize_u8(&normalized);
        let level = otsu_level(&gray);
        for p in gray.pixels_mut() {
            *p = Luma([if p.0[0] > level { 255 } else { 0 }]);
        }

        if self.config.opening_radius > 0 {
            gray = open(&gray, Norm::LInf, self.config.opening_radius);
        }
        Some(gray)
    }
}

impl LandmarkExtractor for ThresholdExtractor {
    fn extract(&self, image: &TileImage) -> Vec<DVec2> {
        let Some(binary) = self.binarize(image) else {
            return Vec::new();
        };

        let labels = connected_components(&binary, Connectivity::Eight, Luma([0u8]));

        // label -> (pixel count, coordinate sum); label 0 is background
        let mut stats: Vec<(usize, DVec2)> = Vec::new();
        for (x, y, label) in labels.enumerate_pixels() {
            let label = label.0[0] as usize;
            if label == 0 {
                continue;
            }
            if stats.len() < label {
                stats.resize(label, (0, DVec2::ZERO));
            }
            let entry = &mut stats[label - 1];
            entry.0 += 1;
            entry.1 += DVec2::new(x as f64, y as f64);
        }

        let min_area = self.config.min_area;
        let centroids: Vec<DVec2> = stats
            .into_iter()
            .filter(|(count, _)| *count >= min_area)
            .map(|(count, sum)| sum / count as f64)
            .collect();

        tracing::debug!(
            width = image.width(),
            height = image.height(),
            landmarks = centroids.len(),
            "Extracted landmarks"
        );

        centroids
    }
}
