//! HTTP route handlers.
//!
//! - `health`: the `/ping` liveness check
//! - `admin`: server-rendered admin panel for the registered models

pub mod admin;
pub mod health;

use axum::extract::DefaultBodyLimit;
use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// Builds the complete application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(health::ping))
        .merge(admin::router())
        .with_state(state)
        // Admin forms are tiny; 1 MB is generous
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
