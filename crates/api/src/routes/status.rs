use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use forgeup_bootstrap::StatusSnapshot;

use crate::state::AppState;

/// Per-service bootstrap status payload.
#[derive(Serialize)]
pub struct StatusResponse {
    /// Last published state of every managed service.
    pub services: StatusSnapshot,
    /// Root data directory the services were provisioned under.
    pub data_dir: String,
}

/// GET /status -- the last published snapshot. Reads are lock-free
/// against the sequencer; a snapshot is always internally consistent.
async fn service_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let services = state.status_rx.borrow().clone();

    Json(StatusResponse {
        services,
        data_dir: state.settings.data_dir.display().to_string(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/status", get(service_status))
}
