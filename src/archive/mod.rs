//! Extraction and repackaging backends
//!
//! The pipeline only talks to the [`Archiver`] trait. [`NativeArchiver`]
//! does the work in-process with `tar` + `flate2`; [`TarCommandArchiver`]
//! drives the system `tar` binary through a
//! [`ProcessRunner`](crate::process::ProcessRunner).

mod command;
mod native;

pub use command::TarCommandArchiver;
pub use native::NativeArchiver;

use crate::config::{ArchiverKind, Config};
use crate::error::{Error, Result};
use crate::process::TokioProcessRunner;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Top-level directory registry tarballs wrap their contents in
pub const PACKAGE_ROOT: &str = "package";

/// Permission bits for the repackaged binary
pub const EXECUTABLE_MODE: u32 = 0o755;

/// Extracts a single binary from a vendor tarball and re-archives it
#[async_trait]
pub trait Archiver: Send + Sync {
    /// Unpack `binary_name` from the gzip tarball at `archive` into `dest`
    ///
    /// The tarball's single top-level directory is stripped, and only entries
    /// that are, or are under, `binary_name` are written. Returns the path of
    /// the extracted binary.
    ///
    /// # Errors
    ///
    /// [`Error::Extraction`] if the archive is corrupt, empty, or has no
    /// regular file named `binary_name`.
    async fn extract(&self, archive: &Path, dest: &Path, binary_name: &str) -> Result<PathBuf>;

    /// Write a gzip tarball at `output` holding exactly `dir/binary_name`
    ///
    /// # Errors
    ///
    /// [`Error::Repackaging`] on any write or compression failure.
    async fn repackage(&self, dir: &Path, binary_name: &str, output: &Path) -> Result<()>;

    /// Get the name of this backend
    fn name(&self) -> &'static str;
}

/// Build the backend selected in the configuration
pub fn build_archiver(config: &Config) -> Result<Arc<dyn Archiver>> {
    match config.download.archiver {
        ArchiverKind::Native => Ok(Arc::new(NativeArchiver)),
        ArchiverKind::Tar => {
            let runner = Arc::new(TokioProcessRunner::new(config.download.tool_timeout));
            let archiver = match &config.download.tar_path {
                Some(path) => TarCommandArchiver::new(path.clone(), runner),
                None => TarCommandArchiver::from_path(runner).ok_or_else(|| Error::Config {
                    message: "tar not found in PATH".to_string(),
                    key: Some("download.tar_path".to_string()),
                })?,
            };
            Ok(Arc::new(archiver))
        }
    }
}

/// Drop the first path component, rejecting anything that could escape `dest`
///
/// Returns `None` for the root directory entry itself and for paths holding
/// `..`, absolute roots or drive prefixes.
pub(crate) fn strip_root(path: &Path) -> Option<PathBuf> {
    let mut components = path.components().skip_while(|c| matches!(c, Component::CurDir));
    match components.next() {
        Some(Component::Normal(_)) => {}
        _ => return None,
    }

    let mut stripped = PathBuf::new();
    for component in components {
        match component {
            Component::Normal(part) => stripped.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }

    if stripped.as_os_str().is_empty() {
        None
    } else {
        Some(stripped)
    }
}

/// Whether a root-stripped entry path is, or is under, `binary_name`
pub(crate) fn is_binary_entry(relative: &Path, binary_name: &str) -> bool {
    matches!(
        relative.components().next(),
        Some(Component::Normal(first)) if first == binary_name
    )
}
