//! External process invocation
//!
//! Programs are started directly with an argument vector (never through a
//! shell), stdout and stderr are captured, and every invocation has a hard
//! deadline after which the child is killed.

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Captured result of one process invocation
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Whether the process exited with status 0
    pub success: bool,
    /// Exit code, if the process exited normally (None when killed by a signal)
    pub exit_code: Option<i32>,
    /// Captured standard output (lossy UTF-8)
    pub stdout: String,
    /// Captured standard error (lossy UTF-8)
    pub stderr: String,
}

impl From<std::process::Output> for ProcessOutput {
    fn from(output: std::process::Output) -> Self {
        Self {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Runs external programs on behalf of the archive backends
///
/// A non-zero exit is reported through [`ProcessOutput::success`], not as an
/// `Err`; errors are reserved for "could not run it at all" and timeouts.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `program` with `args` and wait for it to finish
    async fn run(&self, program: &Path, args: &[OsString]) -> Result<ProcessOutput>;
}

/// [`ProcessRunner`] backed by `tokio::process` with a per-call timeout
#[derive(Debug, Clone)]
pub struct TokioProcessRunner {
    timeout: Duration,
}

impl TokioProcessRunner {
    /// Create a runner that kills children running longer than `timeout`
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, program: &Path, args: &[OsString]) -> Result<ProcessOutput> {
        debug!(program = %program.display(), ?args, "running external tool");

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            // Dropping the future on timeout must not leave the child behind
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| {
                Error::ExternalTool(format!(
                    "{} timed out after {} seconds",
                    program.display(),
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| {
                Error::ExternalTool(format!("failed to execute {}: {}", program.display(), e))
            })?;

        let output = ProcessOutput::from(output);
        debug!(
            program = %program.display(),
            success = output.success,
            exit_code = ?output.exit_code,
            "external tool finished"
        );
        Ok(output)
    }
}
