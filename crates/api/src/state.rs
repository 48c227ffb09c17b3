use std::sync::Arc;

use tokio::sync::watch;

use forgeup_bootstrap::StatusSnapshot;
use forgeup_core::config::Settings;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Resolved settings, also used to build service endpoint URLs.
    pub settings: Arc<Settings>,
    /// Feed of bootstrap snapshots. Handlers only ever read the last
    /// published value; they never wait on in-flight work.
    pub status_rx: watch::Receiver<StatusSnapshot>,
}
