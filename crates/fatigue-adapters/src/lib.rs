//! Fatigue Detect Adapters - External adapters for fatigue-detect.
//!
//! This crate provides adapters for:
//! - Class-per-directory image datasets
//! - Loading the model artifact into a classifier
//! - File-based experiment tracking

pub mod fs;
pub mod model;
pub mod tracking;

pub use fs::{DirectoryDataset, TRAIN_DIR, VAL_DIR};
pub use model::{load_classifier, CandleClassifier, DEFAULT_MODEL_PATH};
pub use tracking::{FileRun, RunStatus};
