//! Temporary files produced while serving one request.
//!
//! Chart images and the stored upload only need to live until the report is
//! written. [`ArtifactManager`] and [`SessionWorkspace`] remove them again,
//! explicitly or on drop, so nothing outlives a request on success or
//! failure.

use crate::error::Result;
use crate::types::ChartArtifact;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

/// Delete the files backing `artifacts`.
///
/// Files that are already gone are ignored and other failures are only
/// logged, so calling this repeatedly is safe. Returns how many files were
/// actually removed.
pub fn cleanup(artifacts: &[ChartArtifact]) -> usize {
    artifacts
        .iter()
        .filter(|artifact| remove_file_quietly(artifact.path()))
        .count()
}

fn remove_file_quietly(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed {}", path.display());
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            warn!("Failed to remove {}: {}", path.display(), e);
            false
        }
    }
}

/// Tracks the chart artifacts of one session.
#[derive(Debug, Default)]
pub struct ArtifactManager {
    tracked: Vec<ChartArtifact>,
}

impl ArtifactManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, artifacts: impl IntoIterator<Item = ChartArtifact>) {
        self.tracked.extend(artifacts);
    }

    pub fn artifacts(&self) -> &[ChartArtifact] {
        &self.tracked
    }

    /// Delete every tracked file and forget them.
    pub fn cleanup(&mut self) -> usize {
        let removed = cleanup(&self.tracked);
        self.tracked.clear();
        removed
    }
}

impl Drop for ArtifactManager {
    fn drop(&mut self) {
        if !self.tracked.is_empty() {
            self.cleanup();
        }
    }
}

/// A private directory for one request, laid out as
///
/// ```text
/// {root}/session-XXXXXX/
///     upload/   stored copy of the uploaded file
///     charts/   rendered chart images
/// ```
///
/// The directory and everything in it is removed when the workspace is
/// closed or dropped.
#[derive(Debug)]
pub struct SessionWorkspace {
    dir: TempDir,
}

impl SessionWorkspace {
    /// Create a fresh session directory under `root` (created if absent).
    pub fn create(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix("session-")
            .tempdir_in(root)?;
        std::fs::create_dir(dir.path().join("upload"))?;
        std::fs::create_dir(dir.path().join("charts"))?;
        debug!("Created session workspace {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.dir.path().join("upload")
    }

    pub fn charts_dir(&self) -> PathBuf {
        self.dir.path().join("charts")
    }

    /// Remove the session directory now, reporting failures.
    pub fn close(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close()?;
        debug!("Removed session workspace {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChartKind;
    use std::collections::HashSet;

    fn artifact(dir: &Path, kind: ChartKind) -> ChartArtifact {
        let path = dir.join(kind.file_name());
        std::fs::write(&path, b"png").unwrap();
        ChartArtifact::new(kind, path)
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let artifacts = vec![
            artifact(dir.path(), ChartKind::Distribution),
            artifact(dir.path(), ChartKind::Correlation),
        ];

        assert_eq!(cleanup(&artifacts), 2);
        assert!(artifacts.iter().all(|a| !a.path().exists()));
        assert_eq!(cleanup(&artifacts), 0);
    }

    #[test]
    fn test_cleanup_ignores_missing_files() {
        let artifacts = vec![ChartArtifact::new(ChartKind::TopCategories, "/nonexistent/bar_chart.png")];
        assert_eq!(cleanup(&artifacts), 0);
    }

    #[test]
    fn test_manager_cleans_on_drop() {
        let dir = TempDir::new().unwrap();
        let path = {
            let mut manager = ArtifactManager::new();
            manager.track([artifact(dir.path(), ChartKind::Distribution)]);
            assert_eq!(manager.artifacts().len(), 1);
            manager.artifacts()[0].path.clone()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_manager_cleanup_forgets_artifacts() {
        let dir = TempDir::new().unwrap();
        let mut manager = ArtifactManager::new();
        manager.track([artifact(dir.path(), ChartKind::Distribution)]);
        assert_eq!(manager.cleanup(), 1);
        assert!(manager.artifacts().is_empty());
        assert_eq!(manager.cleanup(), 0);
    }

    #[test]
    fn test_session_layout_and_removal() {
        let root = TempDir::new().unwrap();
        let session = SessionWorkspace::create(&root.path().join("nested")).unwrap();
        let path = session.path().to_path_buf();

        assert!(session.upload_dir().is_dir());
        assert!(session.charts_dir().is_dir());
        assert!(
            path.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("session-")
        );

        session.close().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_sessions_are_unique() {
        let root = TempDir::new().unwrap();
        let sessions: Vec<SessionWorkspace> = (0..8)
            .map(|_| SessionWorkspace::create(root.path()).unwrap())
            .collect();
        let paths: HashSet<PathBuf> = sessions.iter().map(|s| s.path().to_path_buf()).collect();
        assert_eq!(paths.len(), 8);

        let first = sessions[0].path().to_path_buf();
        drop(sessions);
        assert!(!first.exists());
    }
}
