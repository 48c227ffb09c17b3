pub mod health;
pub mod restart;
pub mod status;
pub mod summary;

use axum::Router;

use crate::state::AppState;

/// Build the route tree.
///
/// ```text
/// /           bootstrap summary and service endpoint URLs
/// /health     liveness of the status server itself
/// /status     per-service bootstrap states
/// /restart    restart acknowledgment (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(summary::router())
        .merge(health::router())
        .merge(status::router())
        .merge(restart::router())
}
