//! Core domain types for fatigue prediction.

mod prediction;

pub use prediction::{format_percent, FatigueLabel, Prediction, Probabilities, DECISION_THRESHOLD};
