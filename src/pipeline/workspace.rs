use super::Stage;
use crate::error::{Error, Result, ToHttpStatus};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

/// Prefix of every per-request directory
pub const WORKSPACE_PREFIX: &str = "dotenvx-sh-";

/// Per-request scratch directory
///
/// Each request gets a fresh, uniquely named directory. It is removed by
/// [`Workspace::release`] or, failing that, when the value is dropped, which
/// covers early returns and clients that disconnect mid-stream.
///
/// Creation and removal run on the blocking pool. A drop inside a runtime
/// schedules the removal there and returns immediately.
#[derive(Debug)]
pub struct Workspace {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl Workspace {
    /// Create a new directory under `root`, creating `root` if needed
    pub async fn acquire(root: &Path) -> Result<Self> {
        let root = root.to_path_buf();
        let dir = tokio::task::spawn_blocking(move || {
            std::fs::create_dir_all(&root)?;
            tempfile::Builder::new()
                .prefix(WORKSPACE_PREFIX)
                .tempdir_in(&root)
        })
        .await
        .map_err(std::io::Error::other)??;
        let path = dir.path().to_path_buf();

        debug!(workspace = %path.display(), stage = %Stage::WorkspaceOpen, "workspace acquired");
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    /// Directory path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of `name` inside the workspace
    pub fn join(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Remove the directory and everything in it
    pub async fn release(mut self) -> Result<()> {
        let Some(dir) = self.dir.take() else {
            return Ok(());
        };
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || remove(dir, &path))
            .await
            .map_err(|e| Error::Cleanup {
                path: self.path.clone(),
                reason: e.to_string(),
            })?
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        let path = std::mem::take(&mut self.path);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || log_failure(remove(dir, &path)));
            }
            Err(_) => log_failure(remove(dir, &path)),
        }
    }
}

fn remove(dir: TempDir, path: &Path) -> Result<()> {
    dir.close().map_err(|e| Error::Cleanup {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    debug!(workspace = %path.display(), stage = %Stage::WorkspaceClosed, "workspace released");
    Ok(())
}

fn log_failure(result: Result<()>) {
    if let Err(e) = result {
        warn!(error = %e, code = e.error_code(), "workspace cleanup failed");
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{leftover_entries, wait_for_drain};
    use std::collections::HashSet;
    use tempfile::tempdir;

    #[tokio::test]
    async fn release_removes_directory_and_contents() {
        let root = tempdir().unwrap();
        let workspace = Workspace::acquire(root.path()).await.unwrap();
        let path = workspace.path().to_path_buf();
        std::fs::write(workspace.join("dotenvx"), b"x").unwrap();

        assert!(path.is_dir());
        assert!(
            path.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with(WORKSPACE_PREFIX)
        );

        workspace.release().await.unwrap();
        assert!(!path.exists());
        assert_eq!(leftover_entries(root.path()), 0);
    }

    #[tokio::test]
    async fn drop_in_runtime_removes_directory() {
        let root = tempdir().unwrap();
        let path = {
            let workspace = Workspace::acquire(root.path()).await.unwrap();
            std::fs::write(workspace.join("output.tgz"), b"x").unwrap();
            workspace.path().to_path_buf()
        };

        wait_for_drain(root.path()).await;
        assert!(!path.exists());
    }

    #[test]
    fn drop_outside_runtime_removes_directory() {
        let root = tempdir().unwrap();
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let workspace = runtime.block_on(Workspace::acquire(root.path())).unwrap();
        let path = workspace.path().to_path_buf();

        drop(workspace);
        assert!(!path.exists());
        assert_eq!(leftover_entries(root.path()), 0);
    }

    #[tokio::test]
    async fn missing_root_is_created() {
        let base = tempdir().unwrap();
        let root = base.path().join("nested/workspaces");

        let workspace = Workspace::acquire(&root).await.unwrap();
        assert!(workspace.path().starts_with(&root));
        workspace.release().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_workspaces_are_distinct() {
        let root = tempdir().unwrap();
        let root_path = root.path().to_path_buf();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let root = root_path.clone();
                tokio::spawn(async move { Workspace::acquire(&root).await.unwrap() })
            })
            .collect();

        let mut workspaces = Vec::new();
        for handle in handles {
            workspaces.push(handle.await.unwrap());
        }

        let paths: HashSet<_> = workspaces.iter().map(|w| w.path().to_path_buf()).collect();
        assert_eq!(paths.len(), 16);

        for workspace in workspaces {
            workspace.release().await.unwrap();
        }
        assert_eq!(leftover_entries(root.path()), 0);
    }
}
