//! Mini-batch training with Adam and binary cross-entropy.

// Allow common ML code patterns
#![allow(clippy::cast_precision_loss)]

use std::path::Path;

use anyhow::{ensure, Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::optim::{AdamW, Optimizer, ParamsAdamW};
use candle_nn::{VarBuilder, VarMap};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use super::{Augmenter, EpochMetrics, Evaluation, TrainingConfig, TrainingSummary};
use crate::inference::FatigueCnn;
use crate::ports::{DatasetSource, ExperimentTracker, ProgressSink, TrainingEvent};
use crate::preprocess::Preprocessor;

const RUN_TAGS: [(&str, &str); 3] = [
    ("task", "fatigue_detection"),
    ("model_type", "CNN"),
    ("input", "face_image"),
];

/// Drives a training run and reports to a tracker and a progress sink.
pub struct Trainer<'a> {
    config: TrainingConfig,
    device: Device,
    tracker: &'a dyn ExperimentTracker,
    progress: &'a dyn ProgressSink,
}

/// Trained weights together with the run summary.
pub struct TrainedModel {
    varmap: VarMap,
    summary: TrainingSummary,
}

impl TrainedModel {
    #[must_use]
    pub const fn summary(&self) -> &TrainingSummary {
        &self.summary
    }

    /// Writes the weights as safetensors, creating the parent directory.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        self.varmap
            .save(path)
            .with_context(|| format!("Failed to save model to {}", path.display()))?;
        info!("Model saved to {}", path.display());
        Ok(())
    }
}

struct Batch {
    inputs: Tensor,
    targets: Tensor,
    labels: Vec<f32>,
}

impl<'a> Trainer<'a> {
    #[must_use]
    pub fn new(
        config: TrainingConfig,
        device: Device,
        tracker: &'a dyn ExperimentTracker,
        progress: &'a dyn ProgressSink,
    ) -> Self {
        Self {
            config,
            device,
            tracker,
            progress,
        }
    }

    /// Trains a fresh network on `train`, validating on `val` after each epoch.
    ///
    /// # Errors
    ///
    /// Fails on an empty training set, invalid hyperparameters, unreadable
    /// images, tensor errors, or tracker write failures.
    pub fn train(&self, train: &dyn DatasetSource, val: &dyn DatasetSource) -> Result<TrainedModel> {
        let cfg = &self.config;
        ensure!(!train.is_empty(), "training set is empty");
        ensure!(cfg.batch_size > 0, "batch size must be positive");
        ensure!(cfg.epochs > 0, "epochs must be positive");
        ensure!(cfg.learning_rate > 0.0, "learning rate must be positive");
        if val.is_empty() {
            warn!("Validation set is empty; validation metrics will be skipped");
        }

        if let Some(seed) = cfg.seed {
            if let Err(e) = self.device.set_seed(seed) {
                debug!("Device does not support seeding: {e}");
            }
        }

        self.tracker.log_params(&cfg.tracked_params())?;

        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &self.device);
        let model = FatigueCnn::new(vb, cfg.image_size)?;
        let mut optimizer = AdamW::new(
            varmap.all_vars(),
            ParamsAdamW {
                lr: cfg.learning_rate,
                beta1: 0.9,
                beta2: 0.999,
                eps: 1e-7,
                weight_decay: 0.0,
            },
        )?;

        let preprocessor = Preprocessor::training(cfg.image_size);
        let mut rng = cfg
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        let mut augmenter = Augmenter::new(cfg.augment, cfg.seed.map(|s| s.wrapping_add(1)));
        let mut order: Vec<usize> = (0..train.len()).collect();

        info!(
            "Training on {} images ({} validation) for {} epochs",
            train.len(),
            val.len(),
            cfg.epochs
        );

        let mut last_train = None;
        let mut last_validation = None;

        for epoch in 1..=cfg.epochs {
            order.shuffle(&mut rng);
            self.progress.on_event(TrainingEvent::EpochStarted {
                epoch,
                epochs: cfg.epochs,
                batches: order.len().div_ceil(cfg.batch_size),
            });

            let mut loss_sum = 0.0f64;
            let mut correct = 0usize;

            for (i, chunk) in order.chunks(cfg.batch_size).enumerate() {
                let batch = self.load_batch(train, chunk, &preprocessor, Some(&mut augmenter))?;

                let logits = model.forward_t(&batch.inputs, true)?;
                let loss = bce_with_logits(&logits, &batch.targets)?;
                optimizer.backward_step(&loss)?;

                let batch_loss = loss.to_scalar::<f32>()?;
                loss_sum += f64::from(batch_loss) * chunk.len() as f64;
                correct += count_correct(&logits, &batch.labels)?;

                self.progress.on_event(TrainingEvent::BatchCompleted {
                    batch: i + 1,
                    loss: batch_loss,
                });
            }

            let train_eval = Evaluation {
                loss: loss_sum / order.len() as f64,
                accuracy: correct as f64 / order.len() as f64,
            };
            let validation = self.evaluate(&model, val, &preprocessor)?;
            let metrics = EpochMetrics {
                epoch,
                train: train_eval,
                validation,
            };
            self.log_epoch(&metrics)?;
            self.progress
                .on_event(TrainingEvent::EpochCompleted { metrics });

            last_train = Some(train_eval);
            last_validation = validation;
        }

        // Evaluation is deterministic, so the last epoch's validation is the final one.
        if let Some(v) = last_validation {
            self.tracker.log_metric("val_loss", v.loss, None)?;
            self.tracker.log_metric("val_accuracy", v.accuracy, None)?;
        }

        let sample_prediction = self.sample_prediction(&model, val, &preprocessor)?;
        if let Some(p) = sample_prediction {
            self.tracker
                .log_metric("sample_prediction", f64::from(p), None)?;
        }
        self.tracker.set_tags(&RUN_TAGS)?;

        let summary = TrainingSummary {
            epochs: cfg.epochs,
            final_train: last_train.context("no epoch completed")?,
            validation: last_validation,
            sample_prediction,
        };
        self.progress
            .on_event(TrainingEvent::Finished { summary });

        Ok(TrainedModel { varmap, summary })
    }

    /// Mean loss and accuracy over a dataset with dropout disabled.
    fn evaluate(
        &self,
        model: &FatigueCnn,
        dataset: &dyn DatasetSource,
        preprocessor: &Preprocessor,
    ) -> Result<Option<Evaluation>> {
        if dataset.is_empty() {
            return Ok(None);
        }

        let indices: Vec<usize> = (0..dataset.len()).collect();
        let mut loss_sum = 0.0f64;
        let mut correct = 0usize;

        for chunk in indices.chunks(self.config.batch_size) {
            let batch = self.load_batch(dataset, chunk, preprocessor, None)?;
            let logits = model.forward_t(&batch.inputs, false)?;
            let loss = bce_with_logits(&logits, &batch.targets)?;
            loss_sum += f64::from(loss.to_scalar::<f32>()?) * chunk.len() as f64;
            correct += count_correct(&logits, &batch.labels)?;
        }

        Ok(Some(Evaluation {
            loss: loss_sum / indices.len() as f64,
            accuracy: correct as f64 / indices.len() as f64,
        }))
    }

    fn sample_prediction(
        &self,
        model: &FatigueCnn,
        dataset: &dyn DatasetSource,
        preprocessor: &Preprocessor,
    ) -> Result<Option<f32>> {
        if dataset.is_empty() {
            return Ok(None);
        }
        let batch = self.load_batch(dataset, &[0], preprocessor, None)?;
        let probs = model.probabilities(&batch.inputs)?.flatten_all()?;
        Ok(probs.to_vec1::<f32>()?.first().copied())
    }

    fn load_batch(
        &self,
        dataset: &dyn DatasetSource,
        indices: &[usize],
        preprocessor: &Preprocessor,
        mut augmenter: Option<&mut Augmenter>,
    ) -> Result<Batch> {
        let mut samples = Vec::with_capacity(indices.len());
        let mut labels = Vec::with_capacity(indices.len());

        for &index in indices {
            let example = dataset.get(index)?;
            let mut rgb = preprocessor.resize(&example.image);
            if let Some(aug) = augmenter.as_deref_mut() {
                rgb = aug.apply(&rgb);
            }
            samples.push(Preprocessor::normalize(&rgb));
            labels.push(example.label);
        }

        let inputs = preprocessor.batch_to_tensor(samples, &self.device)?;
        let targets = Tensor::from_vec(labels.clone(), (labels.len(), 1), &self.device)?;
        Ok(Batch {
            inputs,
            targets,
            labels,
        })
    }

    fn log_epoch(&self, metrics: &EpochMetrics) -> Result<()> {
        let step = Some(metrics.epoch);
        self.tracker
            .log_metric("train_loss", metrics.train.loss, step)?;
        self.tracker
            .log_metric("train_accuracy", metrics.train.accuracy, step)?;
        if let Some(v) = metrics.validation {
            self.tracker.log_metric("val_loss", v.loss, step)?;
            self.tracker.log_metric("val_accuracy", v.accuracy, step)?;
        }
        Ok(())
    }
}

/// Mean binary cross-entropy on raw logits, in the form
/// `relu(x) - x*t + ln(1 + exp(-|x|))` that stays finite for saturated logits.
fn bce_with_logits(logits: &Tensor, targets: &Tensor) -> candle_core::Result<Tensor> {
    let softplus = logits.abs()?.neg()?.exp()?.affine(1.0, 1.0)?.log()?;
    ((logits.relu()? - (logits * targets)?)? + softplus)?.mean_all()
}

/// Counts predictions on the correct side of 0.5.
fn count_correct(logits: &Tensor, labels: &[f32]) -> Result<usize> {
    let logits: Vec<f32> = logits.flatten_all()?.to_vec1()?;
    Ok(logits
        .iter()
        .zip(labels)
        .filter(|&(&logit, &label)| (logit >= 0.0) == (label >= 0.5))
        .count())
}
