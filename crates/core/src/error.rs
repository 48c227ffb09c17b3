//! Bootstrap error taxonomy.
//!
//! Every failure during a bootstrap run is attributed to exactly one
//! service and recorded in its `Failed` state via [`FailureKind`].
//! Errors never crash the process; only invalid settings or an
//! unprovisionable root data directory are fatal at startup.

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// A bad or missing configuration input (env var, parameter set).
    #[error("Configuration error: {0}")]
    Config(String),

    /// A template placeholder had no corresponding parameter.
    #[error("Missing template parameter '{key}'")]
    MissingKey { key: String },

    /// Artifact retrieval failed (network, HTTP status, write).
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// Filesystem permission or exec-bit failure.
    #[error("Permission error: {0}")]
    Permission(String),

    /// The service process could not be started.
    #[error("Launch failed: {0}")]
    Launch(String),

    /// The readiness probe did not succeed before its deadline.
    #[error("Readiness not reached within {deadline_secs}s")]
    Timeout { deadline_secs: u64 },

    /// An upstream service this one depends on failed.
    #[error("Dependency '{dependency}' failed")]
    DependencyFailed { dependency: String },

    /// The bootstrap run was cancelled before this service finished.
    #[error("Bootstrap cancelled")]
    Cancelled,

    /// A filesystem operation outside the classes above failed.
    #[error("I/O error: {0}")]
    Io(String),
}

impl BootstrapError {
    /// The failure class recorded in a service's `Failed` state.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Config(_) | Self::MissingKey { .. } => FailureKind::Config,
            Self::Fetch(_) => FailureKind::Fetch,
            Self::Permission(_) => FailureKind::Permission,
            Self::Launch(_) => FailureKind::Launch,
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::DependencyFailed { .. } => FailureKind::DependencyFailed,
            Self::Cancelled => FailureKind::Cancelled,
            Self::Io(_) => FailureKind::Io,
        }
    }
}

/// Failure classification exposed in `/status` snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Config,
    Fetch,
    Permission,
    Launch,
    Timeout,
    DependencyFailed,
    Cancelled,
    Io,
}
