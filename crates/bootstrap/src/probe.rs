//! Readiness probes.
//!
//! A launched process is not a running service until it accepts
//! connections. [`await_ready`] polls the service's declared probe at
//! a fixed interval until success, the deadline, or cancellation --
//! this replaces the fixed post-launch sleeps the system previously
//! relied on for ordering.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use forgeup_core::error::BootstrapError;
use forgeup_core::spec::Probe;

/// Poll timing shared by all probes in one run.
#[derive(Debug, Clone, Copy)]
pub struct ProbeConfig {
    /// Delay between connect attempts.
    pub interval: Duration,
    /// Total budget before the service is declared `Failed(Timeout)`.
    pub deadline: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            deadline: Duration::from_secs(30),
        }
    }
}

/// Wait until `probe` reports ready.
///
/// `Probe::None` is immediately ready. TCP probes attempt a connect
/// each interval; each attempt is itself bounded by the interval so a
/// black-holed port cannot eat the whole budget in one call.
pub async fn await_ready(
    probe: &Probe,
    config: &ProbeConfig,
    cancel: &CancellationToken,
) -> Result<(), BootstrapError> {
    let addr = match probe {
        Probe::None => return Ok(()),
        Probe::Tcp { host, port } => format!("{host}:{port}"),
    };

    let deadline = Instant::now() + config.deadline;

    loop {
        if cancel.is_cancelled() {
            return Err(BootstrapError::Cancelled);
        }

        let attempt = tokio::time::timeout(config.interval, tokio::net::TcpStream::connect(&addr));
        if let Ok(Ok(_stream)) = attempt.await {
            return Ok(());
        }

        if Instant::now() >= deadline {
            return Err(BootstrapError::Timeout {
                deadline_secs: config.deadline.as_secs(),
            });
        }

        tokio::select! {
            () = tokio::time::sleep(config.interval) => {}
            () = cancel.cancelled() => return Err(BootstrapError::Cancelled),
        }
    }
}
