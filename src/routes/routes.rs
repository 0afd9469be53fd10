//! Defines the routes of the upload relay.
//!
//! ## Structure
//! - `POST /upload`  — relay one multipart `file` field into the bucket
//!   (any other method answers 405)
//! - `GET  /healthz` — liveness
//! - `GET  /readyz`  — readiness, checks the bucket

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        upload_handlers::{method_not_allowed, upload_file},
    },
    services::storage_service::StorageService,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

/// Build and return the router.
///
/// `body_limit` caps the whole request body of `/upload`; the file itself is
/// checked against the tighter ceiling held by `StorageService`.
pub fn routes(body_limit: usize) -> Router<StorageService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route(
            "/upload",
            post(upload_file)
                .fallback(method_not_allowed)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .layer(TraceLayer::new_for_http())
}
