use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tokio::sync::watch;
use tower::ServiceExt;

use forgeup_api::router::build_app_router;
use forgeup_api::state::AppState;
use forgeup_bootstrap::StatusSnapshot;
use forgeup_core::config::Settings;

/// Build test `Settings` without touching process environment.
pub fn test_settings() -> Settings {
    Settings::from_lookup(|key| match key {
        "DRONE_SECRET" => Some("test-secret".to_string()),
        "DATA_DIR" => Some("/tmp/forgeup-test".to_string()),
        _ => None,
    })
    .unwrap()
}

/// Build the full application router over a fixed status snapshot.
///
/// Returns the `watch` sender so tests can publish follow-up snapshots
/// the way the sequencer would. This mirrors the router construction
/// in `main.rs` so tests exercise the same middleware stack.
pub fn build_test_app(snapshot: StatusSnapshot) -> (Router, watch::Sender<StatusSnapshot>) {
    let (status_tx, status_rx) = watch::channel(snapshot);
    let settings = test_settings();

    let state = AppState {
        settings: Arc::new(settings.clone()),
        status_rx,
    };

    (build_app_router(state, &settings), status_tx)
}

pub async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn post(app: Router, uri: &str) -> Response {
    app.oneshot(
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
