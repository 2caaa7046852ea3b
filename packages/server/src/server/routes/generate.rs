use axum::{extract::Extension, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use site_pipeline::{GenerateOutput, PipelineError};

use crate::server::app::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub url: String,
    #[serde(default)]
    pub use_ai: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Run the pipeline for one URL
///
/// Returns 200 with `{slug, artifactPath}` on success. Failures map to:
/// - 400 for a URL that is not absolute http(s)
/// - 502 when the source site could not be fetched
/// - 422 when the page could not be turned into a site record
/// - 500 when the artifact could not be written
pub async fn generate_handler(
    Extension(state): Extension<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateOutput>, (StatusCode, Json<ErrorResponse>)> {
    tracing::info!(url = %request.url, use_ai = request.use_ai, "Generate requested");

    match state.pipeline.generate(&request.url, request.use_ai).await {
        Ok(output) => Ok(Json(output)),
        Err(e) => {
            let status = status_for(&e);
            if status.is_server_error() {
                tracing::error!(url = %request.url, error = %e, "Generate failed");
            } else {
                tracing::warn!(url = %request.url, error = %e, "Generate rejected");
            }
            Err((
                status,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            ))
        }
    }
}

pub fn status_for(error: &PipelineError) -> StatusCode {
    match error {
        PipelineError::InvalidUrl { .. } => StatusCode::BAD_REQUEST,
        PipelineError::Fetch(_) => StatusCode::BAD_GATEWAY,
        PipelineError::Extraction(_) | PipelineError::Normalization(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        PipelineError::Persist(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
