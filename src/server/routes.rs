//! Router configuration for the web server.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Intake pipeline
        .route("/api/process/ocr-zip", post(handlers::process_ocr_zip))
        // Upload and preview
        .route("/api/documents/upload-zip", post(handlers::upload_zip))
        .route("/api/documents/preview", get(handlers::preview_document))
        // Registry access
        .route("/api/documents", get(handlers::list_documents))
        .route(
            "/api/documents/:id",
            get(handlers::get_document).delete(handlers::delete_document),
        )
        .route("/api/jobs/:request_id", get(handlers::get_job))
        // Maintenance
        .route("/api/cleanup", get(handlers::cleanup_sweep))
        .route("/health", get(handlers::health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
