use axum::http::StatusCode;
use axum::{routing::post, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct RestartResponse {
    pub status: &'static str,
}

/// POST /restart -- acknowledge a restart request.
///
/// Restarts are carried out by an external supervisor watching the
/// log; this handler only records that one was asked for.
async fn request_restart() -> (StatusCode, Json<RestartResponse>) {
    tracing::info!("Restart requested via API");

    (
        StatusCode::ACCEPTED,
        Json(RestartResponse {
            status: "restart requested",
        }),
    )
}

pub fn router() -> Router<AppState> {
    Router::new().route("/restart", post(request_restart))
}
