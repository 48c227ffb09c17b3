//! Declarative description of one managed external service.
//!
//! A [`ServiceSpec`] is immutable once built: where its binary comes
//! from, what config it gets, how it is started, how readiness is
//! confirmed, and which service (if any) must be running first. The
//! sequencer consumes these; nothing here performs I/O.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::BootstrapError;

/// A binary artifact to fetch and place at a target path.
#[derive(Debug, Clone)]
pub struct ArtifactSpec {
    /// Download URL (http/https).
    pub url: String,
    /// Final location of the executable. The parent directory must be
    /// provisioned before install runs.
    pub install_path: PathBuf,
}

/// On-disk format of a rendered config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// INI-style sections (Gitea's `app.ini`).
    Ini,
    /// `KEY=VALUE` lines. Applied to the child process environment at
    /// launch (Drone's configuration surface).
    EnvFile,
}

/// Config file derivation for one service.
#[derive(Debug, Clone)]
pub struct ConfigSpec {
    /// Template with `{{key}}` placeholders.
    pub template: String,
    /// Closed parameter set; every placeholder must resolve.
    pub params: BTreeMap<String, String>,
    /// Where the rendered file is written (atomically).
    pub dest: PathBuf,
    pub format: ConfigFormat,
}

/// How a launched service proves it is accepting connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    /// Poll a TCP connect against `host:port` until it succeeds.
    Tcp { host: String, port: u16 },
    /// No probe; the service counts as running once launched.
    None,
}

/// Process start description.
#[derive(Debug, Clone)]
pub struct StartCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Working directory, if the service cares (Gitea does).
    pub current_dir: Option<PathBuf>,
    /// Extra environment, merged with any rendered env-file config.
    pub env: BTreeMap<String, String>,
}

impl StartCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            env: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }
}

/// Immutable description of one service in the bootstrap run.
#[derive(Debug, Clone)]
pub struct ServiceSpec {
    /// Unique name; also the key in the status snapshot.
    pub name: String,
    pub artifact: ArtifactSpec,
    /// Optional config file; services configured purely through
    /// command arguments have none.
    pub config: Option<ConfigSpec>,
    pub command: StartCommand,
    pub probe: Probe,
    /// Name of the service that must be `Running` before this one
    /// enters its `Installing` phase.
    pub depends_on: Option<String>,
}

impl ServiceSpec {
    /// Check invariants the sequencer relies on: a safe name, a
    /// fetchable artifact URL, and no self-dependency.
    pub fn validate(&self) -> Result<(), BootstrapError> {
        validate_service_name(&self.name)?;
        validate_artifact_url(&self.artifact.url)?;
        if self.depends_on.as_deref() == Some(self.name.as_str()) {
            return Err(BootstrapError::Config(format!(
                "Service '{}' cannot depend on itself",
                self.name
            )));
        }
        Ok(())
    }
}

/// Allowed service name characters: alphanumeric, hyphen, underscore.
/// Service names become path components and log fields, so anything
/// fancier is rejected.
pub fn validate_service_name(name: &str) -> Result<(), BootstrapError> {
    let ok = !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(BootstrapError::Config(format!(
            "Invalid service name '{name}'"
        )))
    }
}

/// Validate that an artifact URL is non-empty and http(s).
pub fn validate_artifact_url(url: &str) -> Result<(), BootstrapError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(BootstrapError::Config("Artifact URL must not be empty".into()));
    }
    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        return Err(BootstrapError::Config(format!(
            "Artifact URL must start with http:// or https://, got '{trimmed}'"
        )));
    }
    Ok(())
}
