//! Interpretation of raw classifier output.
//!
//! Model versions differ in their output head: older artifacts emit a pair
//! `[fatigue, non_fatigue]`, the current network emits a single sigmoid
//! probability of fatigue. Both are mapped to the same percentages here.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Fatigue percentage at or above which an image is labelled fatigued.
pub const DECISION_THRESHOLD: f64 = 60.0;

/// User-facing decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FatigueLabel {
    /// Fatigue probability reached the threshold.
    #[serde(rename = "Fatigué")]
    Fatigued,
    /// Fatigue probability stayed below the threshold.
    #[serde(rename = "Non Fatigué")]
    NotFatigued,
}

impl FatigueLabel {
    /// Applies the fixed decision threshold to a fatigue percentage.
    #[must_use]
    pub fn from_percent(fatigue: f64) -> Self {
        if fatigue >= DECISION_THRESHOLD {
            Self::Fatigued
        } else {
            Self::NotFatigued
        }
    }

    /// Display string, identical to the serialized form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fatigued => "Fatigué",
            Self::NotFatigued => "Non Fatigué",
        }
    }
}

/// Class probabilities in percent, rounded to two decimals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Probabilities {
    /// Probability of fatigue (0-100).
    pub fatigue: f64,
    /// Probability of no fatigue (0-100).
    pub non_fatigue: f64,
}

impl Probabilities {
    /// Maps a raw output row to percentages.
    ///
    /// Two elements are read as `[fatigue, non_fatigue]`. Any other
    /// non-empty row uses its first element as the fatigue probability
    /// and derives the complement.
    pub fn from_model_output(output: &[f32]) -> Result<Self> {
        let Some(&first) = output.first() else {
            bail!("empty model output");
        };

        let fatigue = round2(f64::from(first) * 100.0);
        let non_fatigue = match output {
            [_, second] => round2(f64::from(*second) * 100.0),
            _ => round2(100.0 - fatigue),
        };

        Ok(Self {
            fatigue,
            non_fatigue,
        })
    }
}

/// A complete prediction for one image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub label: FatigueLabel,
    pub probabilities: Probabilities,
}

impl Prediction {
    /// Builds a prediction from the model's output row for one image.
    pub fn from_model_output(output: &[f32]) -> Result<Self> {
        let probabilities = Probabilities::from_model_output(output)?;
        Ok(Self {
            label: FatigueLabel::from_percent(probabilities.fatigue),
            probabilities,
        })
    }
}

/// Rounds half away from zero to two decimals.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Renders a percentage as `70.0%` / `33.33%`.
#[must_use]
pub fn format_percent(value: f64) -> String {
    let mut s = value.to_string();
    if !s.contains('.') && value.is_finite() {
        s.push_str(".0");
    }
    s.push('%');
    s
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_two_element_output() {
        let p = Probabilities::from_model_output(&[0.7, 0.3]).unwrap();
        assert_eq!(p.fatigue, 70.0);
        assert_eq!(p.non_fatigue, 30.0);
    }

    #[test]
    fn test_single_element_output_derives_complement() {
        let p = Probabilities::from_model_output(&[0.25]).unwrap();
        assert_eq!(p.fatigue, 25.0);
        assert_eq!(p.non_fatigue, 75.0);
    }

    #[test]
    fn test_wider_output_uses_first_element() {
        let p = Probabilities::from_model_output(&[0.9, 0.05, 0.05]).unwrap();
        assert_eq!(p.fatigue, 90.0);
        assert_eq!(p.non_fatigue, 10.0);
    }

    #[test]
    fn test_empty_output_is_error() {
        let err = Probabilities::from_model_output(&[]).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_rounding_to_two_decimals() {
        let p = Probabilities::from_model_output(&[0.333_333]).unwrap();
        assert_eq!(p.fatigue, 33.33);
        assert_eq!(p.non_fatigue, 66.67);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        assert_eq!(FatigueLabel::from_percent(60.0), FatigueLabel::Fatigued);
        assert_eq!(FatigueLabel::from_percent(59.99), FatigueLabel::NotFatigued);
        assert_eq!(FatigueLabel::from_percent(100.0), FatigueLabel::Fatigued);
        assert_eq!(FatigueLabel::from_percent(0.0), FatigueLabel::NotFatigued);
    }

    #[test]
    fn test_prediction_threshold_from_output() {
        let at = Prediction::from_model_output(&[0.6]).unwrap();
        assert_eq!(at.label, FatigueLabel::Fatigued);

        let below = Prediction::from_model_output(&[0.5999]).unwrap();
        assert_eq!(below.label, FatigueLabel::NotFatigued);
        assert_eq!(below.probabilities.fatigue, 59.99);
    }

    #[test]
    fn test_two_element_decision_ignores_second_value() {
        // Only the fatigue value drives the label, even if the pair is not normalized.
        let p = Prediction::from_model_output(&[0.65, 0.9]).unwrap();
        assert_eq!(p.label, FatigueLabel::Fatigued);
        assert_eq!(p.probabilities.non_fatigue, 90.0);
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(70.0), "70.0%");
        assert_eq!(format_percent(33.33), "33.33%");
        assert_eq!(format_percent(100.0), "100.0%");
        assert_eq!(format_percent(0.5), "0.5%");
    }

    #[test]
    fn test_label_serialization() {
        let json = serde_json::to_string(&FatigueLabel::Fatigued).unwrap();
        assert_eq!(json, "\"Fatigué\"");
        let json = serde_json::to_string(&FatigueLabel::NotFatigued).unwrap();
        assert_eq!(json, "\"Non Fatigué\"");
        assert_eq!(FatigueLabel::NotFatigued.as_str(), "Non Fatigué");
    }
}
