use axum::{response::IntoResponse, Json};
use serde_json::json;

// Liveness check - no database access
pub async fn ping() -> impl IntoResponse {
    Json(json!({ "message": "pong" }))
}
