//! Fatigue Detect HTTP - JSON API over the fatigue classifier
//!
//! Routes:
//! - `GET /health`: liveness, independent of the model
//! - `GET /health/model`: model path and input shape, 503 when no model is loaded
//! - `POST /predict`: multipart upload with a `file` field

mod error;
mod routes;
mod state;

use std::net::SocketAddr;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use error::ApiError;
pub use routes::{HealthResponse, ModelHealthResponse, PercentPair, PredictResponse};
pub use state::AppState;

/// Default maximum request body size (10 MiB).
pub const DEFAULT_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Builds the application router.
pub fn router(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/health/model", get(routes::model_health))
        .route("/predict", post(routes::predict))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds `addr` and serves the API until the process exits.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(addr: SocketAddr, state: AppState, body_limit: usize) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state, body_limit))
        .await
        .context("HTTP server error")?;
    Ok(())
}
