//! Single-band tile images in the `[0, 1]` working range.
//!
//! Integer samples are stored as `f32` divided by the maximum of the source
//! sample type. Float samples are divided by their observed maximum when it
//! exceeds 1. On save the values are scaled back to an unsigned fixed-point
//! TIFF.

use std::path::Path;

use common::Buffer2;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, GrayImage, ImageBuffer, ImageError, ImageFormat, Luma};

use crate::registration::result::RegistrationError;


/// Sample type of the file an image was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    U8,
    U16,
    F32,
}

impl SampleFormat {
    /// Divisor mapping raw samples into `[0, 1]`.
    pub fn max_value(self) -> f32 {
        match self {
            SampleFormat::U8 => u8::MAX as f32,
            SampleFormat::U16 => u16::MAX as f32,
            SampleFormat::F32 => 1.0,
        }
    }

    fn from_color(color: ColorType) -> Self {
        match color {
            ColorType::L8 | ColorType::La8 | ColorType::Rgb8 | ColorType::Rgba8 => {
                SampleFormat::U8
            }
            ColorType::L16 | ColorType::La16 | ColorType::Rgb16 | ColorType::Rgba16 => {
                SampleFormat::U16
            }
            _ => SampleFormat::F32,
        }
    }
}

/// A tile image: `f32` samples in `[0, 1]` plus the source sample format.
///
/// `scale` is the raw sample value that maps to 1.0. Integer formats use the
/// type maximum; float data uses its observed maximum when that exceeds 1, so
/// raw float counts keep their relative intensities.
#[derive(Debug, Clone, PartialEq)]
pub struct TileImage {
    pixels: Buffer2<f32>,
    format: SampleFormat,
    scale: f32,
}

impl TileImage {
    /// Wrap working-range samples, using the format's default scale.
    pub fn new(pixels: Buffer2<f32>, format: SampleFormat) -> Self {
        Self {
            pixels,
            format,
            scale: format.max_value(),
        }
    }

    /// Read an image file, reducing multi-band data to luminance.
    pub fn load(path: &Path) -> Result<Self, RegistrationError> {
        if !path.exists() {
            return Err(RegistrationError::MissingInput {
                path: path.to_path_buf(),
            });
        }

        let decoded = image::open(path).map_err(|source| RegistrationError::ImageRead {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self::from_dynamic(decoded))
    }

    pub fn from_dynamic(decoded: DynamicImage) -> Self {
        let format = SampleFormat::from_color(decoded.color());
        let (width, height) = (decoded.width() as usize, decoded.height() as usize);

        let (samples, scale): (Vec<f32>, f32) = match format {
            SampleFormat::U8 => {
                let max = format.max_value();
                let samples = decoded
                    .to_luma8()
                    .into_raw()
                    .into_iter()
                    .map(|v| v as f32 / max)
                    .collect();
                (samples, max)
            }
            SampleFormat::U16 => {
                let max = format.max_value();
                let samples = decoded
                    .to_luma16()
                    .into_raw()
                    .into_iter()
                    .map(|v| v as f32 / max)
                    .collect();
                (samples, max)
            }
            SampleFormat::F32 => {
                let raw: Vec<f32> = decoded
                    .to_luma32f()
                    .into_raw()
                    .into_iter()
                    .map(|v| if v.is_finite() { v.max(0.0) } else { 0.0 })
                    .collect();
                let observed = raw.iter().copied().fold(0.0f32, f32::max);
                let scale = observed.max(format.max_value());
                (raw.into_iter().map(|v| v / scale).collect(), scale)
            }
        };

        Self {
            pixels: Buffer2::new(width, height, samples),
            format,
            scale,
        }
    }

    pub fn pixels(&self) -> &Buffer2<f32> {
        &self.pixels
    }

    pub fn into_pixels(self) -> Buffer2<f32> {
        self.pixels
    }

    pub fn format(&self) -> SampleFormat {
        self.format
    }

    pub fn width(&self) -> usize {
        self.pixels.width()
    }

    pub fn height(&self) -> usize {
        self.pixels.height()
    }

    /// `(width, height)`.
    pub fn size(&self) -> (usize, usize) {
        (self.pixels.width(), self.pixels.height())
    }

    /// Raw sample value corresponding to 1.0 in the working range.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Same format and scale with a different pixel grid.
    pub fn with_pixels(&self, pixels: Buffer2<f32>) -> Self {
        Self {
            pixels,
            format: self.format,
            scale: self.scale,
        }
    }

    /// Antialiased resize, range preserving.
    pub fn resized(&self, width: usize, height: usize) -> Self {
        if self.size() == (width, height) {
            return self.clone();
        }

        let src: ImageBuffer<Luma<f32>, Vec<f32>> =
            ImageBuffer::from_fn(self.width() as u32, self.height() as u32, |x, y| {
                Luma([self.pixels[(x as usize, y as usize)]])
            });
        let scaled =
            image::imageops::resize(&src, width as u32, height as u32, FilterType::Triangle);
        let samples = scaled
            .into_raw()
            .into_iter()
            .map(|v| v.clamp(0.0, 1.0))
            .collect();

        self.with_pixels(Buffer2::new(width, height, samples))
    }

    /// Write as a single-band unsigned TIFF scaled to the source range.
    ///
    /// `U8` images are written with 8 bits per sample, `U16` and `F32`
    /// with 16. Float data with a scale above 1 is written back as raw
    /// counts, saturating at the 16-bit maximum; float data within `[0, 1]`
    /// spans the full 16-bit range. Parent directories are created as needed.
    pub fn save_fixed_point(&self, path: &Path) -> Result<(), RegistrationError> {
        let write_err = |source: ImageError| RegistrationError::ImageWrite {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| write_err(ImageError::IoError(e)))?;
        }

        let (width, height) = (self.width() as u32, self.height() as u32);
        match self.format {
            SampleFormat::U8 => {
                let raw: Vec<u8> = self
                    .pixels
                    .iter()
                    .map(|&v| (v.clamp(0.0, 1.0) * u8::MAX as f32).round() as u8)
                    .collect();
                let img: GrayImage = ImageBuffer::from_vec(width, height, raw)
                    .ok_or_else(|| write_err(size_mismatch()))?;
                img.save_with_format(path, ImageFormat::Tiff)
                    .map_err(write_err)
            }
            SampleFormat::U16 | SampleFormat::F32 => {
                let max = self.fixed_point_max();
                let raw: Vec<u16> = self
                    .pixels
                    .iter()
                    .map(|&v| (v.clamp(0.0, 1.0) * max).round().min(u16::MAX as f32) as u16)
                    .collect();
                let img: ImageBuffer<Luma<u16>, Vec<u16>> =
                    ImageBuffer::from_vec(width, height, raw)
                        .ok_or_else(|| write_err(size_mismatch()))?;
                img.save_with_format(path, ImageFormat::Tiff)
                    .map_err(write_err)
            }
        }
    }

    /// 16-bit value that 1.0 maps to on save.
    fn fixed_point_max(&self) -> f32 {
        match self.format {
            SampleFormat::F32 if self.scale > 1.0 => self.scale.min(u16::MAX as f32),
            _ => u16::MAX as f32,
        }
    }
}

fn size_mismatch() -> ImageError {
    ImageError::Parameter(image::error::ParameterError::from_kind(
        image::error::ParameterErrorKind::DimensionMismatch,
    ))
}

/// Quantise a `[0, 1]` buffer to an 8-bit grey image.
pub fn quantize_u8(pixels: &Buffer2<f32>) -> GrayImage {
    GrayImage::from_fn(pixels.width() as u32, pixels.height() as u32, |x, y| {
        let v = pixels[(x as usize, y as usize)];
        Luma([(v.clamp(0.0, 1.0) * 255.0).round() as u8])
    })
}

/// Stretch a buffer to `[0, 1]` over its own min..max.
///
/// Returns `None` when the buffer is empty or constant.
pub fn normalize_min_max(pixels: &Buffer2<f32>) -> Option<Buffer2<f32>> {
    let (min, max) = pixels
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;
    if !range.is_finite() || range <= f32::EPSILON {
        return None;
    }
    Some(pixels.map(|&v| (v - min) / range))
}
