//! Classifier port used by the HTTP layer.

use std::path::Path;

use image::DynamicImage;

/// A loaded model able to score a single decoded image.
pub trait FatigueClassifier: Send + Sync {
    /// Path the model was loaded from.
    fn model_path(&self) -> &Path;

    /// Input shape with an unspecified batch dimension, e.g. `[None, 3, 256, 256]`.
    fn input_shape(&self) -> [Option<usize>; 4];

    /// Runs the model and returns the raw output row for the image.
    ///
    /// # Errors
    ///
    /// Returns an error if preprocessing or inference fails.
    fn predict(&self, image: &DynamicImage) -> anyhow::Result<Vec<f32>>;
}
