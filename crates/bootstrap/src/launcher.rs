//! Process launcher.
//!
//! Spawns a service's [`StartCommand`] as a detached child. Children
//! are created with `kill_on_drop(true)` so an aborted bootstrap never
//! leaks processes; the sequencer keeps the handles and kills them on
//! shutdown.

use std::collections::BTreeMap;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use forgeup_core::error::BootstrapError;
use forgeup_core::spec::StartCommand;

/// Handle to a launched service process.
///
/// Fake launchers in tests return an empty handle; the production
/// launcher wraps a real [`tokio::process::Child`].
pub struct ServiceHandle {
    child: Option<tokio::process::Child>,
}

impl ServiceHandle {
    /// Handle with no underlying process (test doubles).
    pub fn detached() -> Self {
        Self { child: None }
    }

    pub fn from_child(child: tokio::process::Child) -> Self {
        Self { child: Some(child) }
    }

    /// OS pid, if a real process is attached and still identifiable.
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(|c| c.id())
    }

    /// Best-effort kill; errors (already exited) are discarded.
    pub async fn kill(&mut self) {
        if let Some(child) = self.child.as_mut() {
            let _ = child.kill().await;
        }
    }
}

/// Seam between the sequencer and process creation.
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Start the process described by `cmd` with `extra_env` merged
    /// into its environment. Must not wait for the process to exit.
    async fn launch(
        &self,
        name: &str,
        cmd: &StartCommand,
        extra_env: &BTreeMap<String, String>,
    ) -> Result<ServiceHandle, BootstrapError>;
}

/// Production launcher backed by [`tokio::process::Command`].
pub struct TokioLauncher;

#[async_trait]
impl ProcessLauncher for TokioLauncher {
    async fn launch(
        &self,
        name: &str,
        cmd: &StartCommand,
        extra_env: &BTreeMap<String, String>,
    ) -> Result<ServiceHandle, BootstrapError> {
        let mut command = Command::new(&cmd.program);
        command
            .args(&cmd.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        if let Some(dir) = &cmd.current_dir {
            command.current_dir(dir);
        }
        for (key, value) in &cmd.env {
            command.env(key, value);
        }
        for (key, value) in extra_env {
            command.env(key, value);
        }

        let child = command.spawn().map_err(|e| {
            BootstrapError::Launch(format!("Cannot start {}: {e}", cmd.program.display()))
        })?;

        tracing::info!(service = name, pid = child.id(), program = %cmd.program.display(), "Process launched");
        Ok(ServiceHandle::from_child(child))
    }
}
