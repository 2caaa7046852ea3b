use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use site_pipeline::{PersistError, PipelineError, Site};

use crate::server::app::AppState;
use crate::server::routes::ErrorResponse;

/// Read back a generated site record by slug
pub async fn site_handler(
    Extension(state): Extension<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Site>, (StatusCode, Json<ErrorResponse>)> {
    let error = |status: StatusCode, message: String| (status, Json(ErrorResponse { error: message }));

    match state.pipeline.load(&slug).await {
        Ok(Some(site)) => Ok(Json(site)),
        Ok(None) => Err(error(
            StatusCode::NOT_FOUND,
            format!("no site generated for {:?}", slug),
        )),
        Err(PipelineError::Persist(PersistError::InvalidSlug(_))) => Err(error(
            StatusCode::NOT_FOUND,
            format!("no site generated for {:?}", slug),
        )),
        Err(e) => {
            tracing::error!(slug = %slug, error = %e, "Failed to load site");
            Err(error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}
