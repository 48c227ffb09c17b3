//! Directory provisioner.
//!
//! Creates the fixed tree computed by [`DirectoryLayout`] before any
//! install runs. Failure here makes the whole run impossible, so the
//! caller treats it as fatal rather than attributing it to a service.

use forgeup_core::error::BootstrapError;
use forgeup_core::layout::DirectoryLayout;

/// Create every directory in the layout for the given services.
///
/// `create_dir_all` is idempotent, so re-running bootstrap against an
/// existing tree is a no-op.
pub async fn provision_directories(
    layout: &DirectoryLayout,
    services: &[&str],
) -> Result<(), BootstrapError> {
    for dir in layout.all_dirs(services) {
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            BootstrapError::Io(format!("Failed to create directory {}: {e}", dir.display()))
        })?;
        tracing::debug!(dir = %dir.display(), "Directory provisioned");
    }
    Ok(())
}
