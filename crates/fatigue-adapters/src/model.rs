//! Candle-backed classifier loaded from the model artifact.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use candle_core::Device;
use fatigue_core::inference::{get_device, load_fatigue_cnn, FatigueCnn};
use fatigue_core::{FatigueClassifier, Preprocessor, INPUT_CHANNELS};
use image::DynamicImage;
use tracing::{info, warn};

/// Where training writes the artifact and serving looks for it.
pub const DEFAULT_MODEL_PATH: &str = "Model/fatigue_model.safetensors";

/// The fatigue CNN bound to a device and its serving preprocessor.
pub struct CandleClassifier {
    path: PathBuf,
    model: FatigueCnn,
    preprocessor: Preprocessor,
    device: Device,
}

impl CandleClassifier {
    /// Loads weights from `path` for a square input of `input_size` pixels.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, is not a fatigue model, or
    /// its weights do not match `input_size`.
    pub fn load(path: impl AsRef<Path>, input_size: u32) -> Result<Self> {
        let path = path.as_ref();
        let device = get_device();
        let model = load_fatigue_cnn(path, &device, input_size)?;

        Ok(Self {
            path: path.to_path_buf(),
            model,
            preprocessor: Preprocessor::serving(input_size),
            device,
        })
    }
}

impl FatigueClassifier for CandleClassifier {
    fn model_path(&self) -> &Path {
        &self.path
    }

    fn input_shape(&self) -> [Option<usize>; 4] {
        let size = self.preprocessor.size() as usize;
        [None, Some(INPUT_CHANNELS), Some(size), Some(size)]
    }

    fn predict(&self, image: &DynamicImage) -> Result<Vec<f32>> {
        let input = self.preprocessor.to_tensor(image, &self.device)?;
        let probs = self
            .model
            .probabilities(&input)
            .context("Model inference failed")?;
        // First (and only) batch row.
        Ok(probs.get(0)?.to_vec1::<f32>()?)
    }
}

/// Loads the classifier, or logs why it could not be loaded.
///
/// The service keeps running without a model when this returns `None`.
#[must_use]
pub fn load_classifier(path: impl AsRef<Path>, input_size: u32) -> Option<CandleClassifier> {
    let path = path.as_ref();
    match CandleClassifier::load(path, input_size) {
        Ok(classifier) => {
            info!("Model loaded from {}", path.display());
            Some(classifier)
        }
        Err(e) => {
            warn!("Failed to load model from {}: {e:#}", path.display());
            None
        }
    }
}
