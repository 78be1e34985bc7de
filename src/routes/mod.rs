//! API Routes
//!
//! - `/create-file`, `/update-file`, `/read-file`, `/delete-file` - JSON documents
//! - `/list-files`, `/list-folders` - prefix listings
//! - `/duplicate-folder`, `/rename-folder` - folder copy and move
//! - `/upload-files` - multipart bulk upload
//! - `/get-file-urls` - presigned download URLs
//! - `/health` - liveness

pub mod files;
pub mod folders;
pub mod health;

use axum::{extract::DefaultBodyLimit, Router};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::cors_layer;
use crate::models::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let cors = cors_layer(&state.config.server.cors_allowed_origins);
    let body_limit = state.config.server.max_upload_bytes;

    Router::new()
        .merge(files::router(state.clone()))
        .merge(folders::router(state.clone()))
        .merge(health::router(state))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
