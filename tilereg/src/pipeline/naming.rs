//! File naming templates.
//!
//! Templates are relative to the input directory and may contain
//! `{tile}`, `{round}`, `{channel}` and `{label}` placeholders.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::pipeline::config::ChannelSpec;
use crate::registration::config::{ConfigError, ensure_config};

/// Identity of one input image.
#[derive(Debug, Clone, Copy)]
pub enum ImageKey<'a> {
    /// Reference image of the fixed round.
    Fixed { tile: u32 },
    /// Reference image of a moving round.
    Moving { tile: u32, round: &'a str },
    /// Auxiliary channel of a moving round.
    Channel {
        tile: u32,
        round: &'a str,
        channel: &'a ChannelSpec,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    pub fixed_template: String,
    pub moving_template: String,
    pub channel_template: String,
    /// `{tile}` is zero-padded to this many digits.
    pub tile_width: usize,
    /// Inserted before the extension of registered outputs.
    pub output_suffix: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            fixed_template: "tile{tile}_fixed.tif".to_string(),
            moving_template: "{round}/tile{tile}_dapi.tif".to_string(),
            channel_template: "{round}/tile{tile}_c{channel}_{label}.tif".to_string(),
            tile_width: 3,
            output_suffix: "_registered".to_string(),
        }
    }
}

impl NamingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, template) in [
            ("fixed_template", &self.fixed_template),
            ("moving_template", &self.moving_template),
            ("channel_template", &self.channel_template),
        ] {
            ensure_config!(
                template.contains("{tile}"),
                "naming.{} must contain {{tile}}, got '{}'",
                name,
                template
            );
        }
        ensure_config!(
            self.moving_template.contains("{round}") && self.channel_template.contains("{round}"),
            "naming.moving_template and naming.channel_template must contain {{round}}"
        );
        ensure_config!(
            self.channel_template.contains("{channel}")
                || self.channel_template.contains("{label}"),
            "naming.channel_template must contain {{channel}} or {{label}}"
        );
        ensure_config!(
            !self.output_suffix.is_empty(),
            "naming.output_suffix must not be empty"
        );
        Ok(())
    }

    /// Input path of `key`, relative to the input directory.
    pub fn relative_path(&self, key: ImageKey<'_>) -> PathBuf {
        let tile = |tile: u32| format!("{:0width$}", tile, width = self.tile_width);
        let rendered = match key {
            ImageKey::Fixed { tile: t } => self.fixed_template.replace("{tile}", &tile(t)),
            ImageKey::Moving { tile: t, round } => self
                .moving_template
                .replace("{tile}", &tile(t))
                .replace("{round}", round),
            ImageKey::Channel {
                tile: t,
                round,
                channel,
            } => self
                .channel_template
                .replace("{tile}", &tile(t))
                .replace("{round}", round)
                .replace("{channel}", &channel.index.to_string())
                .replace("{label}", &channel.label),
        };
        PathBuf::from(rendered)
    }

    /// Registered-output path for an input at `relative`: same location with
    /// the suffix inserted before the extension.
    pub fn output_relative(&self, relative: &Path) -> PathBuf {
        let stem = relative
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = match relative.extension() {
            Some(ext) => format!("{}{}.{}", stem, self.output_suffix, ext.to_string_lossy()),
            None => format!("{}{}", stem, self.output_suffix),
        };
        relative.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_templates() {
        let naming = NamingConfig::default();
        assert_eq!(
            naming.relative_path(ImageKey::Fixed { tile: 7 }),
            PathBuf::from("tile007_fixed.tif")
        );
        assert_eq!(
            naming.relative_path(ImageKey::Moving {
                tile: 42,
                round: "r2"
            }),
            PathBuf::from("r2/tile042_dapi.tif")
        );
        let channel = ChannelSpec {
            index: 3,
            label: "cy5".to_string(),
        };
        assert_eq!(
            naming.relative_path(ImageKey::Channel {
                tile: 1234,
                round: "r4",
                channel: &channel
            }),
            PathBuf::from("r4/tile1234_c3_cy5.tif")
        );
    }

    #[test]
    fn test_output_relative_inserts_suffix() {
        let naming = NamingConfig::default();
        assert_eq!(
            naming.output_relative(Path::new("r2/tile007_dapi.tif")),
            PathBuf::from("r2/tile007_dapi_registered.tif")
        );
        assert_eq!(
            naming.output_relative(Path::new("plain")),
            PathBuf::from("plain_registered")
        );
    }

    #[test]
    fn test_validation() {
        NamingConfig::default().validate().unwrap();
        let naming = NamingConfig {
            moving_template: "tile{tile}.tif".to_string(),
            ..Default::default()
        };
        assert!(naming.validate().is_err());
    }
}
