//! Labelled image source for training.

use image::DynamicImage;

/// One decoded training example.
#[derive(Debug, Clone)]
pub struct LabeledImage {
    pub image: DynamicImage,
    /// 1.0 for fatigue, 0.0 otherwise.
    pub label: f32,
}

/// Port for random access to a labelled image collection.
pub trait DatasetSource: Send + Sync {
    /// Number of examples.
    fn len(&self) -> usize;

    /// Returns true if the source has no examples.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Class names in label order (index 0 has label 0.0).
    fn classes(&self) -> &[String];

    /// Loads the example at `index`.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be read or decoded.
    fn get(&self, index: usize) -> anyhow::Result<LabeledImage>;
}
