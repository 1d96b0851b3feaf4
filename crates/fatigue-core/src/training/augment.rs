//! Random geometric augmentation of training images.
//!
//! Shear, per-axis zoom and horizontal flip, composed into one affine map
//! from output to input coordinates around the image centre. Sampling is
//! nearest-neighbour and out-of-range coordinates clamp to the edge.

// Allow common ML/image code patterns
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]

use image::{imageops, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Augmentation ranges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AugmentConfig {
    /// Maximum shear angle in degrees (sampled in `[-range, range]`).
    pub shear_range: f32,
    /// Zoom factors are sampled per axis in `[1 - range, 1 + range]`.
    pub zoom_range: f32,
    /// Flip horizontally with probability 0.5.
    pub horizontal_flip: bool,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            shear_range: 0.2,
            zoom_range: 0.2,
            horizontal_flip: true,
        }
    }
}

impl AugmentConfig {
    /// Configuration that leaves images untouched.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            shear_range: 0.0,
            zoom_range: 0.0,
            horizontal_flip: false,
        }
    }

    fn is_identity(&self) -> bool {
        self.shear_range == 0.0 && self.zoom_range == 0.0 && !self.horizontal_flip
    }
}

/// Applies random transforms drawn from its own RNG.
pub struct Augmenter {
    config: AugmentConfig,
    rng: StdRng,
}

impl Augmenter {
    #[must_use]
    pub fn new(config: AugmentConfig, seed: Option<u64>) -> Self {
        let rng = seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        Self { config, rng }
    }

    /// Returns a randomly transformed copy of `image`.
    pub fn apply(&mut self, image: &RgbImage) -> RgbImage {
        if self.config.is_identity() {
            return image.clone();
        }

        let shear = symmetric(&mut self.rng, self.config.shear_range).to_radians();
        let zx = 1.0 + symmetric(&mut self.rng, self.config.zoom_range);
        let zy = 1.0 + symmetric(&mut self.rng, self.config.zoom_range);

        let mut out = affine(image, shear, zx, zy);
        if self.config.horizontal_flip && self.rng.random_bool(0.5) {
            imageops::flip_horizontal_in_place(&mut out);
        }
        out
    }
}

fn symmetric(rng: &mut StdRng, range: f32) -> f32 {
    if range > 0.0 {
        rng.random_range(-range..=range)
    } else {
        0.0
    }
}

/// Output pixel `d` (relative to centre) samples input `S * Z * d`, where
/// `S = [[1, -sin s], [0, cos s]]` and `Z = diag(zx, zy)`.
fn affine(image: &RgbImage, shear: f32, zx: f32, zy: f32) -> RgbImage {
    let (w, h) = image.dimensions();
    let cx = (w as f32 - 1.0) / 2.0;
    let cy = (h as f32 - 1.0) / 2.0;
    let (sin, cos) = shear.sin_cos();

    RgbImage::from_fn(w, h, |x, y| {
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        let sx = zx * dx - sin * zy * dy + cx;
        let sy = cos * zy * dy + cy;

        let px = sx.round().clamp(0.0, w as f32 - 1.0) as u32;
        let py = sy.round().clamp(0.0, h as f32 - 1.0) as u32;
        *image.get_pixel(px, py)
    })
}
