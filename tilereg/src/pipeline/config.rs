//! Run configuration.
//!
//! Loaded once from YAML before the run starts and shared by reference with
//! every worker afterwards.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::landmarks::ThresholdConfig;
use crate::pipeline::naming::NamingConfig;
use crate::registration::config::{
    ConfigError, EstimatorConfig, MatchConfig, WarpConfig, ensure_config,
};

/// One auxiliary channel of a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub index: u32,
    pub label: String,
}

/// A moving round and the auxiliary channels resampled with its transform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSpec {
    pub id: String,
    #[serde(default)]
    pub channels: Vec<ChannelSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root the naming templates are resolved against.
    pub input_dir: PathBuf,
    /// Registered images mirror their input path under this directory.
    pub output_dir: PathBuf,
    pub tiles: Vec<u32>,
    pub rounds: Vec<RoundSpec>,
    pub naming: NamingConfig,
    pub matching: MatchConfig,
    pub estimator: EstimatorConfig,
    pub warp: WarpConfig,
    pub landmarks: ThresholdConfig,
    /// Tiles processed concurrently. 1 runs sequentially.
    pub workers: usize,
    /// Quality log file name, written under `output_dir`.
    pub log_name: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            output_dir: PathBuf::from("registered"),
            tiles: Vec::new(),
            rounds: Vec::new(),
            naming: NamingConfig::default(),
            matching: MatchConfig::default(),
            estimator: EstimatorConfig::default(),
            warp: WarpConfig::default(),
            landmarks: ThresholdConfig::default(),
            workers: 1,
            log_name: "registration_quality.csv".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Read, parse and validate a YAML config file.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_yml::from_str(&yaml).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.naming.validate()?;
        self.matching.validate()?;
        self.estimator.validate()?;
        self.warp.validate()?;
        self.landmarks.validate()?;

        ensure_config!(
            self.workers >= 1,
            "workers must be at least 1, got {}",
            self.workers
        );
        ensure_config!(!self.log_name.is_empty(), "log_name must not be empty");

        let mut seen = HashSet::new();
        for round in &self.rounds {
            ensure_config!(!round.id.is_empty(), "round id must not be empty");
            ensure_config!(
                seen.insert(round.id.as_str()),
                "round '{}' is listed twice",
                round.id
            );
        }
        Ok(())
    }

    /// Path of the quality log.
    pub fn quality_log_path(&self) -> PathBuf {
        self.output_dir.join(&self.log_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::config::{EstimatorKind, InterpolationMethod};
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
input_dir: /data/experiment
output_dir: /data/experiment/registered
tiles: [1, 2, 17]
workers: 4
rounds:
  - id: r2
    channels:
      - { index: 1, label: cy3 }
      - { index: 2, label: cy5 }
  - id: r3
matching:
  max_distance: 30.0
estimator:
  kind: ransac
  ransac:
    seed: 7
warp:
  method: bicubic
naming:
  tile_width: 4
"#;

    #[test]
    fn test_parse_yaml() {
        let config: PipelineConfig = serde_yml::from_str(SAMPLE).unwrap();
        config.validate().unwrap();

        assert_eq!(config.tiles, vec![1, 2, 17]);
        assert_eq!(config.workers, 4);
        assert_eq!(config.rounds.len(), 2);
        assert_eq!(config.rounds[0].channels[1].label, "cy5");
        assert!(config.rounds[1].channels.is_empty());
        assert!((config.matching.max_distance - 30.0).abs() < 1e-12);
        assert_eq!(config.estimator.kind, EstimatorKind::Ransac);
        assert_eq!(config.estimator.ransac.seed, Some(7));
        assert_eq!(config.estimator.ransac.max_trials, 1000);
        assert_eq!(config.warp.method, InterpolationMethod::Bicubic);
        assert_eq!(config.naming.tile_width, 4);
        assert_eq!(config.naming.output_suffix, "_registered");
        assert_eq!(config.log_name, "registration_quality.csv");
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config: PipelineConfig = serde_yml::from_str("{}").unwrap();
        config.validate().unwrap();
        assert_eq!(config.workers, 1);
        assert_eq!(config.estimator.kind, EstimatorKind::LeastSquares);
        assert_eq!(config.warp.method, InterpolationMethod::Bilinear);
    }

    #[test]
    fn test_from_yaml_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.yaml");
        std::fs::write(&path, SAMPLE).unwrap();
        let config = PipelineConfig::from_yaml_file(&path).unwrap();
        assert_eq!(
            config.quality_log_path(),
            PathBuf::from("/data/experiment/registered/registration_quality.csv")
        );

        let missing = PipelineConfig::from_yaml_file(&dir.path().join("nope.yaml"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));

        let broken = dir.path().join("broken.yaml");
        std::fs::write(&broken, "tiles: [1, 2").unwrap();
        assert!(matches!(
            PipelineConfig::from_yaml_file(&broken),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_validation_errors() {
        let config = PipelineConfig {
            workers: 0,
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().to_string().contains("workers"));

        let round = RoundSpec {
            id: "r2".into(),
            channels: Vec::new(),
        };
        let config = PipelineConfig {
            rounds: vec![round.clone(), round],
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().to_string().contains("twice"));
    }
}
