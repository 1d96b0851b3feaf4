//! Port definitions for hexagonal architecture.
//!
//! These traits define the boundaries between the domain core and external adapters.

mod classifier;
mod dataset;
mod progress;
mod tracker;

pub use classifier::FatigueClassifier;
pub use dataset::{DatasetSource, LabeledImage};
pub use progress::{ProgressSink, TrainingEvent};
pub use tracker::ExperimentTracker;
