use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use forgeup_api::router::build_app_router;
use forgeup_api::state::AppState;
use forgeup_bootstrap::provision::provision_directories;
use forgeup_bootstrap::services::{service_catalog, webhook_url, SERVICE_DIRS};
use forgeup_bootstrap::{HttpFetcher, ProbeConfig, Sequencer, TokioLauncher};
use forgeup_core::config::Settings;
use forgeup_core::layout::DirectoryLayout;
use forgeup_core::state::BootstrapState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "forgeup=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let settings = Settings::from_env().expect("Invalid configuration");
    tracing::info!(
        host = %settings.host,
        port = settings.port,
        data_dir = %settings.data_dir.display(),
        "Loaded configuration"
    );

    // --- Data directories ---
    let layout = DirectoryLayout::new(&settings.data_dir);
    provision_directories(&layout, SERVICE_DIRS)
        .await
        .expect("Failed to provision data directories");
    tracing::info!(root = %settings.data_dir.display(), "Data directories provisioned");

    // --- Bootstrap sequencer ---
    let probe_config = ProbeConfig {
        interval: Duration::from_millis(settings.ready_interval_ms),
        deadline: Duration::from_secs(settings.ready_timeout_secs),
    };
    let sequencer = Sequencer::new(
        service_catalog(&settings),
        Arc::new(HttpFetcher::new()),
        Arc::new(TokioLauncher),
        probe_config,
    )
    .expect("Invalid service catalog");

    let status_rx = sequencer.subscribe();

    // Run the bootstrap in the background; the HTTP surface serves
    // snapshots of its progress from the first request on.
    let webhook = webhook_url(&settings);
    let bootstrap = sequencer.clone();
    let run_handle = tokio::spawn(async move {
        let final_state = bootstrap.run().await;
        if final_state.values().all(|s| *s == BootstrapState::Running) {
            tracing::info!(webhook_url = %webhook, "Bootstrap complete, all services running");
        } else {
            for (name, state) in &final_state {
                if let BootstrapState::Failed { kind, message } = state {
                    tracing::error!(service = %name, kind = ?kind, message = %message, "Service failed to bootstrap");
                }
            }
        }
    });

    // --- App state ---
    let state = AppState {
        settings: Arc::new(settings.clone()),
        status_rx,
    };

    // --- Router ---
    let app = build_app_router(state, &settings);

    // --- Start server ---
    let addr = SocketAddr::new(
        settings.host.parse().expect("Invalid HOST address"),
        settings.port,
    );
    tracing::info!(%addr, "Starting status server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    sequencer.shutdown().await;
    let _ = tokio::time::timeout(Duration::from_secs(5), run_handle).await;

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
