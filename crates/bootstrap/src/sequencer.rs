//! Bootstrap sequencer.
//!
//! Owns the per-service state table and drives every [`ServiceSpec`]
//! through install -> configure -> start -> readiness. One task runs
//! per service; services without a dependency relation proceed
//! concurrently, and a dependent task does not enter its `Installing`
//! phase until its dependency is `Running`. Every state mutation
//! publishes a complete [`StatusSnapshot`] over a `watch` channel, so
//! readers never observe a torn record.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use forgeup_core::error::BootstrapError;
use forgeup_core::render;
use forgeup_core::spec::{ConfigFormat, ConfigSpec, ServiceSpec};
use forgeup_core::state::BootstrapState;

use crate::installer::{install, ArtifactFetcher};
use crate::launcher::{ProcessLauncher, ServiceHandle};
use crate::probe::{await_ready, ProbeConfig};

/// Complete last-known state of every managed service.
pub type StatusSnapshot = BTreeMap<String, BootstrapState>;

/// Orchestrates one bootstrap run over a set of service specs.
///
/// Created once at startup; the returned handle is cheap to clone into
/// Axum state. [`Sequencer::run`] drives every service to a terminal
/// state.
#[derive(Clone)]
pub struct Sequencer {
    inner: Arc<Inner>,
}

struct Inner {
    specs: Vec<ServiceSpec>,
    fetcher: Arc<dyn ArtifactFetcher>,
    launcher: Arc<dyn ProcessLauncher>,
    probe_config: ProbeConfig,
    /// Single-writer state table; tasks update their own record only.
    table: Mutex<StatusSnapshot>,
    status_tx: watch::Sender<StatusSnapshot>,
    /// Launched children, killed on shutdown.
    children: tokio::sync::Mutex<Vec<(String, ServiceHandle)>>,
    /// Master cancellation token -- cancelled during shutdown.
    cancel: CancellationToken,
}

impl Sequencer {
    /// Validate the specs and build a sequencer with every service
    /// `Pending`.
    ///
    /// Rejects duplicate names, dependencies on unknown services, and
    /// dependency cycles -- all of which would otherwise stall a run
    /// forever.
    pub fn new(
        specs: Vec<ServiceSpec>,
        fetcher: Arc<dyn ArtifactFetcher>,
        launcher: Arc<dyn ProcessLauncher>,
        probe_config: ProbeConfig,
    ) -> Result<Self, BootstrapError> {
        let mut initial = StatusSnapshot::new();
        for spec in &specs {
            spec.validate()?;
            if initial
                .insert(spec.name.clone(), BootstrapState::Pending)
                .is_some()
            {
                return Err(BootstrapError::Config(format!(
                    "Duplicate service name '{}'",
                    spec.name
                )));
            }
        }
        for spec in &specs {
            if let Some(dep) = &spec.depends_on {
                if !initial.contains_key(dep) {
                    return Err(BootstrapError::Config(format!(
                        "Service '{}' depends on unknown service '{dep}'",
                        spec.name
                    )));
                }
            }
        }
        check_acyclic(&specs)?;

        let (status_tx, _) = watch::channel(initial.clone());

        Ok(Self {
            inner: Arc::new(Inner {
                specs,
                fetcher,
                launcher,
                probe_config,
                table: Mutex::new(initial),
                status_tx,
                children: tokio::sync::Mutex::new(Vec::new()),
                cancel: CancellationToken::new(),
            }),
        })
    }

    /// Subscribe to published snapshots (the health reporter's feed).
    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.inner.status_tx.subscribe()
    }

    /// The last published snapshot. Never blocks on in-flight work.
    pub fn snapshot(&self) -> StatusSnapshot {
        self.inner.status_tx.borrow().clone()
    }

    /// Token cancelling the whole run.
    pub fn cancel_token(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    /// Run the bootstrap to completion: every service ends `Running`
    /// or `Failed`. Returns the final snapshot.
    pub async fn run(&self) -> StatusSnapshot {
        let mut handles = Vec::with_capacity(self.inner.specs.len());
        for spec in self.inner.specs.clone() {
            let inner = Arc::clone(&self.inner);
            handles.push(tokio::spawn(run_service(inner, spec)));
        }
        for handle in handles {
            // Service tasks record their own failures; a join error
            // here would mean the task itself panicked.
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Bootstrap task panicked");
            }
        }
        self.snapshot()
    }

    /// Cancel the run and kill every launched child.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down bootstrap sequencer");
        self.inner.cancel.cancel();

        let mut children = self.inner.children.lock().await;
        for (name, handle) in children.iter_mut() {
            tracing::info!(service = %name, pid = handle.pid(), "Stopping service process");
            handle.kill().await;
        }
        children.clear();
    }
}

impl Inner {
    /// Advance one service's state and publish a fresh snapshot.
    ///
    /// Transitions that violate the monotonic table are dropped with a
    /// warning; this can only happen if a cancellation races a
    /// service's own terminal transition.
    fn set_state(&self, name: &str, next: BootstrapState) {
        let mut table = self.table.lock().expect("state table poisoned");
        let current = table
            .get(name)
            .cloned()
            .unwrap_or(BootstrapState::Pending);

        if !current.can_transition_to(&next) {
            tracing::warn!(
                service = name,
                from = current.label(),
                to = next.label(),
                "Dropping invalid state transition",
            );
            return;
        }

        tracing::info!(service = name, from = current.label(), to = next.label(), "State transition");
        table.insert(name.to_string(), next);
        self.status_tx.send_replace(table.clone());
    }

    fn set_failed(&self, name: &str, error: &BootstrapError) {
        self.set_state(
            name,
            BootstrapState::Failed {
                kind: error.kind(),
                message: error.to_string(),
            },
        );
    }
}

/// Reject dependency cycles by walking each spec's dependency chain;
/// any chain longer than the spec count must repeat a node.
fn check_acyclic(specs: &[ServiceSpec]) -> Result<(), BootstrapError> {
    let deps: BTreeMap<&str, Option<&str>> = specs
        .iter()
        .map(|s| (s.name.as_str(), s.depends_on.as_deref()))
        .collect();

    for spec in specs {
        let mut cursor = spec.depends_on.as_deref();
        let mut steps = 0;
        while let Some(dep) = cursor {
            steps += 1;
            if steps > specs.len() {
                return Err(BootstrapError::Config(format!(
                    "Dependency cycle involving service '{}'",
                    spec.name
                )));
            }
            cursor = deps.get(dep).copied().flatten();
        }
    }
    Ok(())
}

/// One service's complete bootstrap, recording any failure in its
/// state record.
async fn run_service(inner: Arc<Inner>, spec: ServiceSpec) {
    if let Err(error) = bootstrap_service(&inner, &spec).await {
        tracing::warn!(service = %spec.name, error = %error, "Service bootstrap failed");
        inner.set_failed(&spec.name, &error);
    }
}

async fn bootstrap_service(inner: &Inner, spec: &ServiceSpec) -> Result<(), BootstrapError> {
    // Dependency gate: stay `Pending` until the dependency is
    // `Running`. If it fails instead, fail without attempting install.
    if let Some(dep) = &spec.depends_on {
        wait_for_dependency(inner, dep).await?;
    }

    if inner.cancel.is_cancelled() {
        return Err(BootstrapError::Cancelled);
    }

    inner.set_state(&spec.name, BootstrapState::Installing);
    tokio::select! {
        result = install(&spec.artifact, inner.fetcher.as_ref()) => { result?; }
        () = inner.cancel.cancelled() => {
            // The dropped install may have left a half-written download.
            let _ =
                tokio::fs::remove_file(crate::installer::partial_path(&spec.artifact.install_path))
                    .await;
            return Err(BootstrapError::Cancelled);
        }
    }

    inner.set_state(&spec.name, BootstrapState::Configuring);
    let env_overlay = match &spec.config {
        Some(config) => {
            tokio::select! {
                result = write_config(&spec.name, config) => result?,
                () = inner.cancel.cancelled() => return Err(BootstrapError::Cancelled),
            }
        }
        None => BTreeMap::new(),
    };

    inner.set_state(&spec.name, BootstrapState::Starting);
    let handle = inner
        .launcher
        .launch(&spec.name, &spec.command, &env_overlay)
        .await?;
    inner.children.lock().await.push((spec.name.clone(), handle));

    await_ready(&spec.probe, &inner.probe_config, &inner.cancel).await?;

    inner.set_state(&spec.name, BootstrapState::Running);
    Ok(())
}

/// Block until `dep` reaches `Running` (the declared readiness
/// threshold), propagating its failure or run cancellation.
async fn wait_for_dependency(inner: &Inner, dep: &str) -> Result<(), BootstrapError> {
    let mut rx = inner.status_tx.subscribe();
    loop {
        let dep_state = rx.borrow_and_update().get(dep).cloned();
        match dep_state {
            Some(BootstrapState::Running) => return Ok(()),
            Some(BootstrapState::Failed { .. }) => {
                return Err(BootstrapError::DependencyFailed {
                    dependency: dep.to_string(),
                })
            }
            _ => {}
        }

        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    // Sender dropped mid-run; treat as cancellation.
                    return Err(BootstrapError::Cancelled);
                }
            }
            () = inner.cancel.cancelled() => return Err(BootstrapError::Cancelled),
        }
    }
}

/// Render a service's config and write it atomically.
///
/// Returns the environment overlay for `EnvFile` configs (applied to
/// the child process at launch), empty otherwise. The write is
/// skipped entirely when the existing file is byte-identical, so
/// re-running bootstrap does not touch configs a racing process may
/// already be reading.
async fn write_config(
    name: &str,
    config: &ConfigSpec,
) -> Result<BTreeMap<String, String>, BootstrapError> {
    let rendered = render::render(&config.template, &config.params)?;

    let existing = tokio::fs::read(&config.dest).await.ok();
    if existing.as_deref() == Some(rendered.as_bytes()) {
        tracing::info!(service = name, path = %config.dest.display(), "Config unchanged, skipping write");
    } else {
        atomic_write(&config.dest, rendered.as_bytes()).await?;
        tracing::info!(service = name, path = %config.dest.display(), "Config written");
    }

    Ok(match config.format {
        ConfigFormat::EnvFile => render::parse_env_file(&rendered),
        ConfigFormat::Ini => BTreeMap::new(),
    })
}

/// Write-temp-then-rename so a racing process start never reads a
/// partially written config.
async fn atomic_write(dest: &std::path::Path, bytes: &[u8]) -> Result<(), BootstrapError> {
    let mut tmp_name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "config".into());
    tmp_name.push(".tmp");
    let tmp = dest.with_file_name(tmp_name);

    let staged = async {
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| BootstrapError::Io(format!("Cannot write {}: {e}", tmp.display())))?;

        set_config_mode(&tmp).await?;

        tokio::fs::rename(&tmp, dest).await.map_err(|e| {
            BootstrapError::Permission(format!("Cannot move {} into place: {e}", dest.display()))
        })
    }
    .await;

    if staged.is_err() {
        // Leave no orphaned temp file behind.
        let _ = tokio::fs::remove_file(&tmp).await;
    }
    staged
}

#[cfg(unix)]
async fn set_config_mode(path: &std::path::Path) -> Result<(), BootstrapError> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o644))
        .await
        .map_err(|e| BootstrapError::Permission(format!("Cannot chmod {}: {e}", path.display())))
}

#[cfg(not(unix))]
async fn set_config_mode(_path: &std::path::Path) -> Result<(), BootstrapError> {
    Ok(())
}
