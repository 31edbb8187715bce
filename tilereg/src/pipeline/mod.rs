//! Registration orchestrator.
//!
//! Per tile:
//! 1. load the fixed reference and extract its landmarks (skip the tile if
//!    the file is missing or fewer than three landmarks are found)
//! 2. for every moving round: load, resize to the fixed shape if needed,
//!    extract, match, estimate, resample the reference channel, score the
//!    alignment, resample the auxiliary channels and persist everything
//!
//! Every per-unit failure is logged and turned into a skip of the smallest
//! affected unit (tile, round or channel). Tiles run on a worker pool; rounds
//! within a tile run sequentially and share the fixed landmarks.

pub mod config;
pub mod naming;
pub mod record;


use std::path::{Path, PathBuf};

use glam::DVec2;
use thiserror::Error;

use crate::landmarks::LandmarkExtractor;
use crate::registration::interpolation::{padding_fraction, validity_mask, warp_image};
use crate::registration::matching::match_landmarks;
use crate::registration::quality::registration_quality;
use crate::registration::ransac::estimate;
use crate::registration::result::{MIN_POINTS, RegistrationError};
use crate::registration::transform::Transform;
use crate::tile::TileImage;

pub use config::{ChannelSpec, PipelineConfig, RoundSpec};
pub use naming::{ImageKey, NamingConfig};
pub use record::{CSV_HEADER, RegistrationRecord, write_quality_log};

/// Fatal run-level failures.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("No round was registered across {tiles} tile(s)")]
    NothingRegistered { tiles: usize },

    #[error("Failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Failed to write quality log '{path}': {source}")]
    LogWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of one moving round.
#[derive(Debug)]
pub enum RoundOutcome {
    Registered(RegistrationRecord),
    Skipped {
        round: String,
        reason: RegistrationError,
    },
}

impl RoundOutcome {
    pub fn record(&self) -> Option<&RegistrationRecord> {
        match self {
            RoundOutcome::Registered(record) => Some(record),
            RoundOutcome::Skipped { .. } => None,
        }
    }
}

/// Outcome of one tile.
#[derive(Debug)]
pub struct TileReport {
    pub tile: u32,
    /// Set when the whole tile was skipped; `rounds` is then empty.
    pub skipped: Option<RegistrationError>,
    pub rounds: Vec<RoundOutcome>,
}

impl TileReport {
    fn skipped(tile: u32, reason: RegistrationError) -> Self {
        Self {
            tile,
            skipped: Some(reason),
            rounds: Vec::new(),
        }
    }

    pub fn records(&self) -> impl Iterator<Item = &RegistrationRecord> {
        self.rounds.iter().filter_map(RoundOutcome::record)
    }
}

/// Totals of a completed run.
#[derive(Debug)]
pub struct RunSummary {
    pub tiles_processed: usize,
    pub tiles_skipped: usize,
    pub rounds_registered: usize,
    pub rounds_skipped: usize,
    pub records: Vec<RegistrationRecord>,
    pub quality_log: PathBuf,
}

/// Fixed-round data shared by every round of a tile.
struct FixedTile {
    path: PathBuf,
    image: TileImage,
    landmarks: Vec<DVec2>,
}

/// Registers tiles according to an immutable [`PipelineConfig`].
pub struct TileRegistrator<E: LandmarkExtractor> {
    config: PipelineConfig,
    extractor: E,
}

impl<E: LandmarkExtractor> TileRegistrator<E> {
    pub fn new(config: PipelineConfig, extractor: E) -> Self {
        Self { config, extractor }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn input_path(&self, key: ImageKey<'_>) -> (PathBuf, PathBuf) {
        let relative = self.config.naming.relative_path(key);
        (self.config.input_dir.join(&relative), relative)
    }

    fn output_path(&self, relative: &Path) -> PathBuf {
        self.config
            .output_dir
            .join(self.config.naming.output_relative(relative))
    }

    /// Register every configured round of `tile`.
    pub fn register_tile(&self, tile: u32) -> TileReport {
        let (path, _) = self.input_path(ImageKey::Fixed { tile });
        let image = match TileImage::load(&path) {
            Ok(image) => image,
            Err(reason) => {
                tracing::warn!(tile, reason = reason.kind(), "Skipping tile: {}", reason);
                return TileReport::skipped(tile, reason);
            }
        };

        let landmarks = self.extractor.extract(&image);
        if landmarks.len() < MIN_POINTS {
            let reason = RegistrationError::InsufficientLandmarks {
                found: landmarks.len(),
                required: MIN_POINTS,
            };
            tracing::warn!(tile, reason = reason.kind(), "Skipping tile: {}", reason);
            return TileReport::skipped(tile, reason);
        }

        tracing::info!(
            tile,
            width = image.width(),
            height = image.height(),
            landmarks = landmarks.len(),
            "Fixed image loaded"
        );

        let fixed = FixedTile {
            path,
            image,
            landmarks,
        };

        let rounds = self
            .config
            .rounds
            .iter()
            .map(|round| match self.register_round(tile, &fixed, round) {
                Ok(record) => RoundOutcome::Registered(record),
                Err(reason) => {
                    tracing::warn!(
                        tile,
                        round = %round.id,
                        reason = reason.kind(),
                        "Skipping round: {}",
                        reason
                    );
                    RoundOutcome::Skipped {
                        round: round.id.clone(),
                        reason,
                    }
                }
            })
            .collect();

        TileReport {
            tile,
            skipped: None,
            rounds,
        }
    }

    fn register_round(
        &self,
        tile: u32,
        fixed: &FixedTile,
        round: &RoundSpec,
    ) -> Result<RegistrationRecord, RegistrationError> {
        let target = fixed.image.size();
        let (moving_path, moving_relative) = self.input_path(ImageKey::Moving {
            tile,
            round: &round.id,
        });

        let mut moving = TileImage::load(&moving_path)?;
        if moving.size() != target {
            tracing::info!(
                tile,
                round = %round.id,
                from = ?moving.size(),
                to = ?target,
                "Resizing moving image to fixed shape"
            );
            moving = moving.resized(target.0, target.1);
        }

        let moving_landmarks = self.extractor.extract(&moving);
        if moving_landmarks.len() < MIN_POINTS {
            return Err(RegistrationError::InsufficientLandmarks {
                found: moving_landmarks.len(),
                required: MIN_POINTS,
            });
        }

        let matches = match_landmarks(&fixed.landmarks, &moving_landmarks, &self.config.matching)?;
        let estimate = estimate(&matches, &self.config.estimator)?;
        let transform = estimate.transform;

        tracing::info!(
            tile,
            round = %round.id,
            matches = matches.len(),
            inliers = ?estimate.inliers,
            rms = estimate.rms_residual,
            "Estimated {}",
            transform
        );

        let registered = warp_image(moving.pixels(), &transform, target, &self.config.warp);
        let mask = validity_mask(moving.size(), &transform, target);
        tracing::debug!(
            tile,
            round = %round.id,
            padding_percent = padding_fraction(&mask) * 100.0,
            "Reference channel resampled"
        );

        let quality = registration_quality(fixed.image.pixels(), &registered);
        let record = RegistrationRecord {
            tile,
            round: round.id.clone(),
            fixed_path: fixed.path.clone(),
            moving_path: moving_path.clone(),
            quality,
            matches: matches.len(),
            inliers: estimate.inliers,
        };

        for channel in &round.channels {
            self.register_channel(tile, round, channel, &transform, target);
        }

        self.persist(
            tile,
            &round.id,
            &moving.with_pixels(registered),
            &moving_relative,
        );

        tracing::info!(tile, round = %round.id, quality, "Round registered");
        Ok(record)
    }

    /// Resample one auxiliary channel. A missing or unreadable channel only
    /// skips that channel.
    fn register_channel(
        &self,
        tile: u32,
        round: &RoundSpec,
        channel: &ChannelSpec,
        transform: &Transform,
        target: (usize, usize),
    ) {
        let (path, relative) = self.input_path(ImageKey::Channel {
            tile,
            round: &round.id,
            channel,
        });

        let mut image = match TileImage::load(&path) {
            Ok(image) => image,
            Err(reason) => {
                tracing::warn!(
                    tile,
                    round = %round.id,
                    channel = channel.index,
                    label = %channel.label,
                    reason = reason.kind(),
                    "Skipping channel: {}",
                    reason
                );
                return;
            }
        };
        if image.size() != target {
            image = image.resized(target.0, target.1);
        }

        let registered = warp_image(image.pixels(), transform, target, &self.config.warp);
        self.persist(tile, &round.id, &image.with_pixels(registered), &relative);
    }

    /// Write a registered image; a failed write is logged and does not
    /// affect the round's record.
    fn persist(&self, tile: u32, round: &str, image: &TileImage, relative: &Path) {
        let path = self.output_path(relative);
        match image.save_fixed_point(&path) {
            Ok(()) => {
                tracing::debug!(tile, round, path = %path.display(), "Saved registered image")
            }
            Err(reason) => tracing::warn!(
                tile,
                round,
                reason = reason.kind(),
                "Failed to persist registered image: {}",
                reason
            ),
        }
    }

    /// Register all configured tiles and write the quality log.
    pub fn run(&self) -> Result<RunSummary, RunError> {
        let tiles = &self.config.tiles;
        tracing::info!(
            tiles = tiles.len(),
            rounds = self.config.rounds.len(),
            workers = self.config.workers,
            "Starting registration run"
        );

        let reports =
            common::parallel::par_map_pooled(tiles, self.config.workers, |&tile| {
                self.register_tile(tile)
            })?;

        let mut summary = RunSummary {
            tiles_processed: 0,
            tiles_skipped: 0,
            rounds_registered: 0,
            rounds_skipped: 0,
            records: Vec::new(),
            quality_log: self.config.quality_log_path(),
        };

        for report in reports {
            if report.skipped.is_some() {
                summary.tiles_skipped += 1;
                continue;
            }
            summary.tiles_processed += 1;
            for outcome in report.rounds {
                match outcome {
                    RoundOutcome::Registered(record) => {
                        summary.rounds_registered += 1;
                        summary.records.push(record);
                    }
                    RoundOutcome::Skipped { .. } => summary.rounds_skipped += 1,
                }
            }
        }

        if summary.records.is_empty() {
            return Err(RunError::NothingRegistered { tiles: tiles.len() });
        }

        write_quality_log(&summary.quality_log, &summary.records).map_err(|source| {
            RunError::LogWrite {
                path: summary.quality_log.clone(),
                source,
            }
        })?;

        tracing::info!(
            tiles_processed = summary.tiles_processed,
            tiles_skipped = summary.tiles_skipped,
            rounds_registered = summary.rounds_registered,
            rounds_skipped = summary.rounds_skipped,
            log = %summary.quality_log.display(),
            "Registration run finished"
        );

        Ok(summary)
    }
}
