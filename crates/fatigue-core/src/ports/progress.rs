//! Progress reporting port for training UIs.

use crate::training::{EpochMetrics, TrainingSummary};

/// Events emitted while training.
#[derive(Debug, Clone)]
pub enum TrainingEvent {
    /// An epoch is about to start.
    EpochStarted {
        /// 1-based epoch number.
        epoch: usize,
        /// Total epochs in the run.
        epochs: usize,
        /// Number of training batches in this epoch.
        batches: usize,
    },
    /// A training batch finished.
    BatchCompleted {
        /// 1-based batch number within the epoch.
        batch: usize,
        /// Mean loss of the batch.
        loss: f32,
    },
    /// An epoch finished, including validation when available.
    EpochCompleted {
        /// Metrics for the epoch.
        metrics: EpochMetrics,
    },
    /// Training and final evaluation are complete.
    Finished {
        /// Run summary.
        summary: TrainingSummary,
    },
}

/// Port for receiving training events.
pub trait ProgressSink: Send + Sync {
    /// Called when a training event occurs.
    fn on_event(&self, event: TrainingEvent);
}
