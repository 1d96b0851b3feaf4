//! Training loop producing the fatigue model artifact.

mod augment;
mod trainer;

use serde::Serialize;

pub use augment::{AugmentConfig, Augmenter};
pub use trainer::{TrainedModel, Trainer};

/// Hyperparameters of a training run.
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    /// Square input edge in pixels.
    pub image_size: u32,
    /// Examples per batch.
    pub batch_size: usize,
    /// Passes over the training set.
    pub epochs: usize,
    /// Adam learning rate.
    pub learning_rate: f64,
    /// Seed for shuffling, augmentation and weight init.
    pub seed: Option<u64>,
    /// Random transforms applied to training images.
    pub augment: AugmentConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            image_size: crate::INPUT_SIZE,
            batch_size: 32,
            epochs: 4,
            learning_rate: 0.001,
            seed: None,
            augment: AugmentConfig::default(),
        }
    }
}

impl TrainingConfig {
    /// Parameters recorded by the experiment tracker.
    #[must_use]
    pub fn tracked_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("img_size", format!("({}, {})", self.image_size, self.image_size)),
            ("batch_size", self.batch_size.to_string()),
            ("epochs", self.epochs.to_string()),
            ("learning_rate", self.learning_rate.to_string()),
            ("optimizer", "Adam".to_string()),
        ];
        if let Some(seed) = self.seed {
            params.push(("seed", seed.to_string()));
        }
        params
    }
}

/// Loss and accuracy over a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Evaluation {
    pub loss: f64,
    pub accuracy: f64,
}

/// Metrics recorded after each epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EpochMetrics {
    /// 1-based epoch number.
    pub epoch: usize,
    pub train: Evaluation,
    /// `None` when there is no validation data.
    pub validation: Option<Evaluation>,
}

/// Outcome of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrainingSummary {
    pub epochs: usize,
    pub final_train: Evaluation,
    pub validation: Option<Evaluation>,
    /// Fatigue probability predicted for the first validation image.
    pub sample_prediction: Option<f32>,
}
