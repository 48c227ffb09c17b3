//! Fixed directory layout under the data root.
//!
//! Pure path computation; the provisioner in `forgeup-bootstrap`
//! creates the directories. Layout (matching what the managed services
//! expect):
//!
//! ```text
//! <data_dir>/
//!   gitea/        binary + data/ + config/
//!   drone/        binaries + data/ + config/
//! ```

use std::path::{Path, PathBuf};

/// Computed directory tree for one bootstrap run.
#[derive(Debug, Clone)]
pub struct DirectoryLayout {
    root: PathBuf,
}

impl DirectoryLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root data directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Home directory of one managed service (`<root>/<service>`).
    pub fn service_dir(&self, service: &str) -> PathBuf {
        self.root.join(service)
    }

    /// Mutable state directory of one service (`<root>/<service>/data`).
    pub fn data_dir(&self, service: &str) -> PathBuf {
        self.service_dir(service).join("data")
    }

    /// Config directory of one service (`<root>/<service>/config`).
    pub fn config_dir(&self, service: &str) -> PathBuf {
        self.service_dir(service).join("config")
    }

    /// Every directory the provisioner must create, parents first.
    pub fn all_dirs(&self, services: &[&str]) -> Vec<PathBuf> {
        let mut dirs = vec![self.root.clone()];
        for service in services {
            dirs.push(self.service_dir(service));
            dirs.push(self.data_dir(service));
            dirs.push(self.config_dir(service));
        }
        dirs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_nest_under_root() {
        let layout = DirectoryLayout::new("/tmp/forge");
        assert_eq!(layout.service_dir("gitea"), PathBuf::from("/tmp/forge/gitea"));
        assert_eq!(layout.data_dir("gitea"), PathBuf::from("/tmp/forge/gitea/data"));
        assert_eq!(
            layout.config_dir("drone"),
            PathBuf::from("/tmp/forge/drone/config")
        );
    }

    #[test]
    fn all_dirs_lists_parents_before_children() {
        let layout = DirectoryLayout::new("/d");
        let dirs = layout.all_dirs(&["gitea", "drone"]);

        assert_eq!(dirs[0], PathBuf::from("/d"));
        // 1 root + 3 per service.
        assert_eq!(dirs.len(), 7);
        for (i, dir) in dirs.iter().enumerate() {
            if let Some(parent) = dir.parent() {
                let parent_pos = dirs.iter().position(|d| d == parent);
                if let Some(pos) = parent_pos {
                    assert!(pos < i, "{dir:?} listed before its parent");
                }
            }
        }
    }
}
