use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use forgeup_bootstrap::StatusSnapshot;
use forgeup_core::state::BootstrapState;

use crate::state::AppState;

/// Root summary payload.
#[derive(Serialize)]
pub struct SummaryResponse {
    pub message: &'static str,
    /// `running` once every service is up, `degraded` after any
    /// failure, `starting` while the bootstrap is still in flight.
    pub status: &'static str,
    pub gitea_url: String,
    pub drone_url: String,
}

/// GET / -- one-line answer to "is the forge up".
async fn summary(State(state): State<AppState>) -> Json<SummaryResponse> {
    let snapshot = state.status_rx.borrow().clone();

    Json(SummaryResponse {
        message: "Gitea with Drone CI/CD",
        status: overall_status(&snapshot),
        gitea_url: state.settings.gitea_url(),
        drone_url: state.settings.drone_url(),
    })
}

fn overall_status(snapshot: &StatusSnapshot) -> &'static str {
    if snapshot
        .values()
        .any(|s| matches!(s, BootstrapState::Failed { .. }))
    {
        "degraded"
    } else if !snapshot.is_empty()
        && snapshot.values().all(|s| *s == BootstrapState::Running)
    {
        "running"
    } else {
        "starting"
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(summary))
}
