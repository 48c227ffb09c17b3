use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Liveness of the status server (always `healthy` if it answers).
    pub status: &'static str,
    /// Current server time, RFC 3339.
    pub time: String,
}

/// GET /health -- liveness of the status server itself, independent of
/// how far the bootstrap has progressed.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        time: chrono::Utc::now().to_rfc3339(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
