//! Route handlers and response bodies.

use anyhow::Context;
use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use fatigue_core::domain::format_percent;
use fatigue_core::{FatigueLabel, Prediction, Preprocessor, DECISION_THRESHOLD};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{ApiError, AppState};

const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelHealthResponse {
    pub model_loaded: bool,
    pub model_path: String,
    /// Batch-first, with `null` for the batch dimension.
    pub input_shape: [Option<usize>; 4],
}

/// Percentages rendered as strings, e.g. `"70.0%"`.
#[derive(Debug, Serialize, Deserialize)]
pub struct PercentPair {
    pub fatigue: String,
    pub non_fatigue: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub prediction: FatigueLabel,
    pub probabilities: PercentPair,
    pub threshold_used: String,
}

impl From<Prediction> for PredictResponse {
    fn from(prediction: Prediction) -> Self {
        Self {
            prediction: prediction.label,
            probabilities: PercentPair {
                fatigue: format_percent(prediction.probabilities.fatigue),
                non_fatigue: format_percent(prediction.probabilities.non_fatigue),
            },
            threshold_used: format!("{DECISION_THRESHOLD:.0}%"),
        }
    }
}

#[allow(clippy::unused_async)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

pub async fn model_health(
    State(state): State<AppState>,
) -> Result<Json<ModelHealthResponse>, ApiError> {
    let classifier = state.classifier()?;
    Ok(Json(ModelHealthResponse {
        model_loaded: true,
        model_path: classifier.model_path().display().to_string(),
        input_shape: classifier.input_shape(),
    }))
}

/// Scores one uploaded face image.
///
/// The `file` field is read before the model check, so a malformed upload
/// gets 422 even when no model is loaded.
pub async fn predict(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let mut multipart = multipart?;
    let bytes = read_upload(&mut multipart).await?;
    debug!("Received upload of {} bytes", bytes.len());
    let classifier = state.classifier()?;

    let output = tokio::task::spawn_blocking(move || {
        let image = Preprocessor::decode(&bytes)?;
        classifier.predict(&image)
    })
    .await
    .context("Inference task failed")??;
    debug!(?output, "Raw model output");

    let prediction = Prediction::from_model_output(&output)?;
    info!(
        "Prediction: {} ({:.2}% fatigue)",
        prediction.label.as_str(),
        prediction.probabilities.fatigue
    );
    Ok(Json(prediction.into()))
}

async fn read_upload(multipart: &mut Multipart) -> Result<Bytes, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(UPLOAD_FIELD) {
            return Ok(field.bytes().await?);
        }
    }
    Err(ApiError::missing_file())
}
