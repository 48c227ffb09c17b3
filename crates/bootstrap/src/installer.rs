//! Artifact installer.
//!
//! [`install`] brings one binary artifact into place: presence check,
//! fetch to a `.partial` sibling, set the executable bit, atomic
//! rename. The fetch transport sits behind [`ArtifactFetcher`] so
//! tests inject mocks and the sequencer never cares whether bytes came
//! from the network or a fixture.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;

use forgeup_core::error::BootstrapError;
use forgeup_core::spec::ArtifactSpec;

/// Opaque fetch-to-file transport.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// Retrieve `url` and write the bytes to `dest`, replacing any
    /// existing file.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<(), BootstrapError>;
}

/// Production fetcher: streams the response body to disk via reqwest.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArtifactFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<(), BootstrapError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BootstrapError::Fetch(format!("GET {url}: {e}")))?
            .error_for_status()
            .map_err(|e| BootstrapError::Fetch(format!("GET {url}: {e}")))?;

        let mut file = tokio::fs::File::create(dest).await.map_err(|e| {
            BootstrapError::Fetch(format!("Cannot create {}: {e}", dest.display()))
        })?;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| BootstrapError::Fetch(format!("GET {url}: {e}")))?;
            file.write_all(&chunk).await.map_err(|e| {
                BootstrapError::Fetch(format!("Write to {}: {e}", dest.display()))
            })?;
        }

        file.flush()
            .await
            .map_err(|e| BootstrapError::Fetch(format!("Flush {}: {e}", dest.display())))?;
        Ok(())
    }
}

/// Install one artifact, returning the final executable path.
///
/// Idempotent: if the destination already exists the fetch is skipped
/// entirely, so a second bootstrap run performs no network calls for
/// artifacts already in place.
pub async fn install(
    artifact: &ArtifactSpec,
    fetcher: &dyn ArtifactFetcher,
) -> Result<PathBuf, BootstrapError> {
    let dest = &artifact.install_path;

    let present = tokio::fs::try_exists(dest)
        .await
        .map_err(|e| BootstrapError::Io(format!("Cannot stat {}: {e}", dest.display())))?;
    if present {
        tracing::info!(path = %dest.display(), "Artifact already installed, skipping fetch");
        return Ok(dest.clone());
    }

    let partial = partial_path(dest);
    let staged = async {
        fetcher.fetch(&artifact.url, &partial).await?;
        set_executable(&partial).await?;
        tokio::fs::rename(&partial, dest).await.map_err(|e| {
            BootstrapError::Permission(format!(
                "Cannot move {} into place: {e}",
                dest.display()
            ))
        })
    }
    .await;

    if staged.is_err() {
        // Leave no half-written download behind.
        let _ = tokio::fs::remove_file(&partial).await;
    }
    staged?;

    tracing::info!(url = %artifact.url, path = %dest.display(), "Artifact installed");
    Ok(dest.clone())
}

/// Temporary download path next to the destination, so the final
/// rename stays on one filesystem.
pub(crate) fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "artifact".into());
    name.push(".partial");
    dest.with_file_name(name)
}

#[cfg(unix)]
async fn set_executable(path: &Path) -> Result<(), BootstrapError> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .await
        .map_err(|e| {
            BootstrapError::Permission(format!("Cannot chmod {}: {e}", path.display()))
        })
}

#[cfg(not(unix))]
async fn set_executable(_path: &Path) -> Result<(), BootstrapError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Fetcher that writes fixed bytes and counts invocations.
    pub struct CountingFetcher {
        pub calls: AtomicUsize,
        pub payload: Vec<u8>,
    }

    impl CountingFetcher {
        fn new(payload: &[u8]) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                payload: payload.to_vec(),
            }
        }
    }

    #[async_trait]
    impl ArtifactFetcher for CountingFetcher {
        async fn fetch(&self, _url: &str, dest: &Path) -> Result<(), BootstrapError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::fs::write(dest, &self.payload)
                .await
                .map_err(|e| BootstrapError::Fetch(e.to_string()))
        }
    }

    fn artifact(dir: &Path) -> ArtifactSpec {
        ArtifactSpec {
            url: "https://example.org/gitea".to_string(),
            install_path: dir.join("gitea"),
        }
    }

    #[tokio::test]
    async fn installs_and_makes_executable() {
        let tmp = tempfile::tempdir().unwrap();
        let spec = artifact(tmp.path());
        let fetcher = CountingFetcher::new(b"#!binary");

        let path = install(&spec, &fetcher).await.unwrap();

        assert_eq!(path, spec.install_path);
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"#!binary");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = tokio::fs::metadata(&path).await.unwrap().permissions().mode();
            assert_eq!(mode & 0o111, 0o111, "exec bits not set");
        }
    }

    #[tokio::test]
    async fn existing_artifact_short_circuits_fetch() {
        let tmp = tempfile::tempdir().unwrap();
        let spec = artifact(tmp.path());
        tokio::fs::write(&spec.install_path, b"already-here").await.unwrap();

        let fetcher = CountingFetcher::new(b"new-bytes");
        install(&spec, &fetcher).await.unwrap();

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
        // Existing content untouched.
        assert_eq!(
            tokio::fs::read(&spec.install_path).await.unwrap(),
            b"already-here"
        );
    }

    #[tokio::test]
    async fn no_partial_file_left_after_install() {
        let tmp = tempfile::tempdir().unwrap();
        let spec = artifact(tmp.path());
        let fetcher = CountingFetcher::new(b"bytes");

        install(&spec, &fetcher).await.unwrap();

        assert!(!partial_path(&spec.install_path).exists());
    }

    #[tokio::test]
    async fn fetch_failure_propagates_and_leaves_no_destination() {
        struct FailingFetcher;

        #[async_trait]
        impl ArtifactFetcher for FailingFetcher {
            async fn fetch(&self, url: &str, _dest: &Path) -> Result<(), BootstrapError> {
                Err(BootstrapError::Fetch(format!("GET {url}: connection refused")))
            }
        }

        let tmp = tempfile::tempdir().unwrap();
        let spec = artifact(tmp.path());

        let result = install(&spec, &FailingFetcher).await;
        assert!(matches!(result, Err(BootstrapError::Fetch(_))));
        assert!(!spec.install_path.exists());
    }

    #[tokio::test]
    async fn aborted_fetch_cleans_up_partial_file() {
        /// Writes half the payload, then fails.
        struct TruncatingFetcher;

        #[async_trait]
        impl ArtifactFetcher for TruncatingFetcher {
            async fn fetch(&self, url: &str, dest: &Path) -> Result<(), BootstrapError> {
                tokio::fs::write(dest, b"half-of-the").await.unwrap();
                Err(BootstrapError::Fetch(format!("GET {url}: connection reset")))
            }
        }

        let tmp = tempfile::tempdir().unwrap();
        let spec = artifact(tmp.path());

        let result = install(&spec, &TruncatingFetcher).await;
        assert!(result.is_err());
        assert!(!partial_path(&spec.install_path).exists());
        assert!(!spec.install_path.exists());
    }

    #[test]
    fn partial_path_appends_suffix() {
        assert_eq!(
            partial_path(Path::new("/d/gitea")),
            PathBuf::from("/d/gitea.partial")
        );
        // Does not clobber a real extension.
        assert_eq!(
            partial_path(Path::new("/d/drone_linux_amd64")),
            PathBuf::from("/d/drone_linux_amd64.partial")
        );
    }
}
