//! Fatigue Detect Core - Domain logic, preprocessing and the CNN classifier
//!
//! This crate contains the prediction domain types, the image preprocessing
//! pipeline, the convolutional network, the ports implemented by adapters,
//! and the training loop that produces the model artifact.

pub mod domain;
pub mod inference;
pub mod ports;
pub mod preprocess;
pub mod training;

pub use domain::{FatigueLabel, Prediction, Probabilities, DECISION_THRESHOLD};
pub use ports::{DatasetSource, ExperimentTracker, FatigueClassifier, ProgressSink, TrainingEvent};
pub use preprocess::{Preprocessor, INPUT_CHANNELS, INPUT_SIZE};
