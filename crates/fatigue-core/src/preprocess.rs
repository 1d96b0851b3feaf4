//! Image preprocessing into network input tensors.
//!
//! Pipeline: decode, convert to RGB, resize exactly to a square, scale to
//! `[0, 1]`, lay out channels-first and add a batch dimension.

// Allow common ML/image code patterns
#![allow(clippy::cast_possible_truncation)]

use anyhow::{bail, Context, Result};
use candle_core::{Device, Tensor};
use image::{imageops::FilterType, DynamicImage, RgbImage};

/// Spatial resolution the served network expects.
pub const INPUT_SIZE: u32 = 256;
/// Colour channels of the network input.
pub const INPUT_CHANNELS: usize = 3;

/// Converts decoded images into normalized CHW tensors.
#[derive(Debug, Clone, Copy)]
pub struct Preprocessor {
    size: u32,
    filter: FilterType,
}

impl Preprocessor {
    #[must_use]
    pub const fn new(size: u32, filter: FilterType) -> Self {
        Self { size, filter }
    }

    /// Preprocessor used by the HTTP service (bicubic resampling).
    #[must_use]
    pub const fn serving(size: u32) -> Self {
        Self::new(size, FilterType::CatmullRom)
    }

    /// Preprocessor used when loading training data (nearest-neighbour).
    #[must_use]
    pub const fn training(size: u32) -> Self {
        Self::new(size, FilterType::Nearest)
    }

    /// Target edge length in pixels.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Number of `f32` values in one preprocessed image.
    #[must_use]
    pub const fn sample_len(&self) -> usize {
        INPUT_CHANNELS * self.size as usize * self.size as usize
    }

    /// Decodes an uploaded image, guessing the format from its content.
    pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
        if bytes.is_empty() {
            bail!("uploaded file is empty");
        }
        image::load_from_memory(bytes).context("Failed to decode image")
    }

    /// Converts to RGB and resizes exactly to the target square.
    #[must_use]
    pub fn resize(&self, image: &DynamicImage) -> RgbImage {
        image
            .resize_exact(self.size, self.size, self.filter)
            .to_rgb8()
    }

    /// Scales an RGB image to `[0, 1]` in channels-first order.
    #[must_use]
    pub fn normalize(image: &RgbImage) -> Vec<f32> {
        let plane = image.width() as usize * image.height() as usize;
        let mut data = vec![0.0f32; INPUT_CHANNELS * plane];

        for (i, pixel) in image.pixels().enumerate() {
            for (c, &value) in pixel.0.iter().enumerate() {
                data[c * plane + i] = f32::from(value) / 255.0;
            }
        }

        data
    }

    /// Resizes and normalizes one image into a flat CHW buffer.
    #[must_use]
    pub fn to_chw(&self, image: &DynamicImage) -> Vec<f32> {
        Self::normalize(&self.resize(image))
    }

    /// Builds a `(1, 3, size, size)` tensor from one image.
    pub fn to_tensor(&self, image: &DynamicImage, device: &Device) -> Result<Tensor> {
        self.batch_to_tensor(vec![self.to_chw(image)], device)
    }

    /// Stacks flat CHW buffers into an `(N, 3, size, size)` tensor.
    pub fn batch_to_tensor(&self, samples: Vec<Vec<f32>>, device: &Device) -> Result<Tensor> {
        let n = samples.len();
        let expected = self.sample_len();
        if let Some(bad) = samples.iter().find(|s| s.len() != expected) {
            bail!(
                "sample has {} values, expected {expected} for {}x{} input",
                bad.len(),
                self.size,
                self.size
            );
        }

        let data: Vec<f32> = samples.into_iter().flatten().collect();
        let size = self.size as usize;
        Tensor::from_vec(data, (n, INPUT_CHANNELS, size, size), device)
            .context("Failed to create input tensor")
    }
}
