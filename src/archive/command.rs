use super::{Archiver, PACKAGE_ROOT};
use crate::error::{Error, Result};
use crate::process::{ProcessOutput, ProcessRunner};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// Archive backend that runs the system `tar` binary
///
/// Arguments are handed over as a vector, so request tokens never pass
/// through a shell. Unlike [`NativeArchiver`](super::NativeArchiver) it
/// expects the tarball's top-level directory to be named `package`.
///
/// # Examples
///
/// ```no_run
/// use dotenvx_sh::{TarCommandArchiver, TokioProcessRunner};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let runner = Arc::new(TokioProcessRunner::new(Duration::from_secs(60)));
/// let archiver = TarCommandArchiver::from_path(runner).expect("tar not found in PATH");
/// ```
pub struct TarCommandArchiver {
    binary_path: PathBuf,
    runner: Arc<dyn ProcessRunner>,
}

impl TarCommandArchiver {
    /// Create a backend with an explicit tar path
    pub fn new(binary_path: PathBuf, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            binary_path,
            runner,
        }
    }

    /// Attempt to find tar in PATH
    pub fn from_path(runner: Arc<dyn ProcessRunner>) -> Option<Self> {
        which::which("tar").ok().map(|path| Self::new(path, runner))
    }

    fn extract_args(archive: &Path, dest: &Path, binary_name: &str) -> Vec<OsString> {
        vec![
            "-xzf".into(),
            archive.as_os_str().to_owned(),
            "-C".into(),
            dest.as_os_str().to_owned(),
            "--strip-components=1".into(),
            format!("{}/{}", PACKAGE_ROOT, binary_name).into(),
        ]
    }

    fn repackage_args(dir: &Path, binary_name: &str, output: &Path) -> Vec<OsString> {
        vec![
            "-czf".into(),
            output.as_os_str().to_owned(),
            "-C".into(),
            dir.as_os_str().to_owned(),
            binary_name.into(),
        ]
    }
}

fn describe_failure(output: &ProcessOutput) -> String {
    let code = output
        .exit_code
        .map(|c| c.to_string())
        .unwrap_or_else(|| "signal".to_string());
    format!("tar exited with {}: {}", code, output.stderr.trim())
}

#[async_trait]
impl Archiver for TarCommandArchiver {
    async fn extract(&self, archive: &Path, dest: &Path, binary_name: &str) -> Result<PathBuf> {
        let args = Self::extract_args(archive, dest, binary_name);
        let output = self
            .runner
            .run(&self.binary_path, &args)
            .await
            .map_err(|e| Error::Extraction {
                archive: archive.to_path_buf(),
                reason: e.to_string(),
            })?;

        if !output.success {
            warn!(stderr = %output.stderr.trim(), "tar extraction failed");
            return Err(Error::Extraction {
                archive: archive.to_path_buf(),
                reason: describe_failure(&output),
            });
        }

        let binary_path = dest.join(binary_name);
        if !binary_path.is_file() {
            return Err(Error::Extraction {
                archive: archive.to_path_buf(),
                reason: format!("archive has no file named {}", binary_name),
            });
        }
        Ok(binary_path)
    }

    async fn repackage(&self, dir: &Path, binary_name: &str, output: &Path) -> Result<()> {
        let args = Self::repackage_args(dir, binary_name, output);
        let result = self
            .runner
            .run(&self.binary_path, &args)
            .await
            .map_err(|e| Error::Repackaging {
                output: output.to_path_buf(),
                reason: e.to_string(),
            })?;

        if !result.success {
            warn!(stderr = %result.stderr.trim(), "tar repackaging failed");
            return Err(Error::Repackaging {
                output: output.to_path_buf(),
                reason: describe_failure(&result),
            });
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "tar-command"
    }
}
