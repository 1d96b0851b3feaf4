//! Error type for route handlers.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, warn};

/// Failures a handler can report to the client.
#[derive(Debug)]
pub enum ApiError {
    /// No model was loaded at startup (503).
    ModelUnavailable,
    /// The request body was not an acceptable upload (422, or 413 when too large).
    Upload { status: StatusCode, detail: String },
    /// Decoding, inference or postprocessing failed (500).
    Internal(anyhow::Error),
}

impl ApiError {
    /// The multipart body carried no `file` field.
    #[must_use]
    pub fn missing_file() -> Self {
        Self::Upload {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            detail: "Missing required form field: file".to_string(),
        }
    }

    fn upload(status: StatusCode, detail: String) -> Self {
        let status = if status == StatusCode::PAYLOAD_TOO_LARGE {
            status
        } else {
            StatusCode::UNPROCESSABLE_ENTITY
        };
        Self::Upload { status, detail }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::upload(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::upload(err.status(), err.body_text())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::ModelUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "detail": "Model not loaded" })),
            )
                .into_response(),
            Self::Upload { status, detail } => {
                warn!("Rejected upload ({status}): {detail}");
                (status, Json(json!({ "detail": detail }))).into_response()
            }
            Self::Internal(err) => {
                error!("Prediction failed: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": format!("{err:#}") })),
                )
                    .into_response()
            }
        }
    }
}
