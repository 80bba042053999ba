//! Image bytes → model input tensor.
//!
//! A straight sequence of steps, no graph object:
//!
//! | Step | Crate / function |
//! |---|---|
//! | Decode | `image::guess_format` + `image::load_from_memory_with_format` |
//! | Channel fixup | `DynamicImage::to_luma32f` / `to_rgb32f` / `to_rgba32f` |
//! | Resize | `image::imageops::resize` with `FilterType::Triangle` (bilinear) |
//! | Normalize | back to `0..=255`, then `(value - mean) / scale` in `f64`, stored as `f32` |
//! | Layout | `ndarray::Array4` shaped `[1, height, width, channels]` (NHWC) |
//!
//! Resizing happens on float samples, so interpolated values keep their
//! fractional part instead of being rounded back to 8 bits.
//!
//! The transform is pure: the same bytes and parameters always give the same
//! tensor. Nothing checks that the parameters match what the model was
//! trained with; a mismatch degrades accuracy silently.

use image::imageops::{self, FilterType};
use image::DynamicImage;
use ndarray::Array4;
use thiserror::Error;

/// NHWC `f32` tensor holding a single image.
pub type ImageTensor = Array4<f32>;

#[derive(Error, Debug)]
pub enum PreprocessError {
    #[error("unsupported or malformed image data: {0}")]
    Decode(#[from] image::ImageError),
    #[error("invalid preprocessing parameters: {0}")]
    InvalidParams(String),
}

/// Channel layout of the decoded pixel grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channels {
    Luma,
    Rgb,
    Rgba,
}

impl Channels {
    pub fn count(self) -> usize {
        match self {
            Channels::Luma => 1,
            Channels::Rgb => 3,
            Channels::Rgba => 4,
        }
    }
}

/// Fixed numeric transform a backend applies before inference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreprocessParams {
    pub target_width: u32,
    pub target_height: u32,
    pub channels: Channels,
    pub mean: f64,
    pub scale: f64,
}

impl PreprocessParams {
    /// Tensor shape produced by [`preprocess`]: `[1, height, width, channels]`.
    pub fn shape(&self) -> [usize; 4] {
        [
            1,
            self.target_height as usize,
            self.target_width as usize,
            self.channels.count(),
        ]
    }

    pub fn validate(&self) -> Result<(), PreprocessError> {
        if self.target_width == 0 || self.target_height == 0 {
            return Err(PreprocessError::InvalidParams(format!(
                "target size must be non-zero, got {}x{}",
                self.target_width, self.target_height
            )));
        }
        if !self.mean.is_finite() {
            return Err(PreprocessError::InvalidParams(format!(
                "mean must be finite, got {}",
                self.mean
            )));
        }
        if !self.scale.is_finite() || self.scale == 0.0 {
            return Err(PreprocessError::InvalidParams(format!(
                "scale must be finite and non-zero, got {}",
                self.scale
            )));
        }
        Ok(())
    }
}

/// Decode, resize, and normalize `bytes` into a `[1, H, W, C]` tensor.
pub fn preprocess(bytes: &[u8], params: &PreprocessParams) -> Result<ImageTensor, PreprocessError> {
    params.validate()?;

    let image = decode(bytes)?;
    let samples = resize_samples(&image, params);

    let values: Vec<f32> = samples
        .into_iter()
        .map(|v| ((f64::from(v) * 255.0 - params.mean) / params.scale) as f32)
        .collect();

    let [n, h, w, c] = params.shape();
    Array4::from_shape_vec((n, h, w, c), values)
        .map_err(|e| PreprocessError::InvalidParams(e.to_string()))
}

fn decode(bytes: &[u8]) -> Result<DynamicImage, PreprocessError> {
    let format = image::guess_format(bytes)?;
    Ok(image::load_from_memory_with_format(bytes, format)?)
}

/// Interleaved samples of the resized image in `0.0..=1.0`, row-major.
fn resize_samples(image: &DynamicImage, params: &PreprocessParams) -> Vec<f32> {
    let (w, h) = (params.target_width, params.target_height);
    match params.channels {
        Channels::Luma => {
            imageops::resize(&image.to_luma32f(), w, h, FilterType::Triangle).into_raw()
        }
        Channels::Rgb => imageops::resize(&image.to_rgb32f(), w, h, FilterType::Triangle).into_raw(),
        Channels::Rgba => {
            imageops::resize(&image.to_rgba32f(), w, h, FilterType::Triangle).into_raw()
        }
    }
}
