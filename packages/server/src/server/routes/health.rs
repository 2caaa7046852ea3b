use axum::{extract::Extension, Json};
use serde::Serialize;

use crate::server::app::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    rewriter: bool,
}

/// Health check endpoint
///
/// Always 200 while the process is serving. `rewriter` reports whether
/// `useAi` requests will reach the model.
pub async fn health_handler(Extension(state): Extension<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        rewriter: state.pipeline.rewriter_enabled(),
    })
}
