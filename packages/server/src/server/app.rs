//! Application setup and server configuration.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};
use site_pipeline::Pipeline;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::server::routes::{generate_handler, health_handler, site_handler};

/// A full run (page, model, images) can take minutes.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

/// Build the Axum application router
pub fn build_app(pipeline: Pipeline) -> Router {
    let app_state = AppState::new(pipeline);

    Router::new()
        .route("/generate", post(generate_handler))
        .route("/sites/:slug", get(site_handler))
        .route("/health", get(health_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(Extension(app_state))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
