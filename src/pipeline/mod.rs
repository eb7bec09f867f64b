//! Fetch, extract and repackage pipeline
//!
//! One [`Pipeline::run`] call per `GET /{os}/{arch}` request. Stages run
//! strictly in order and nothing is shared between requests except the HTTP
//! client and the archive backend.

mod fetch;
mod locator;
mod permissions;
mod request;
mod stream;
mod workspace;

pub use fetch::fetch_to_file;
pub use locator::{ArtifactLocator, ResolvedArtifactSpec, package_name, repo_id};
pub(crate) use locator::{ensure_path_token, is_version_char};
pub use permissions::make_executable;
pub use request::{DownloadRequest, NormalizedRequest, normalize_arch, normalize_version};
pub use stream::{ARCHIVE_CONTENT_TYPE, ArchiveStream, PreparedArchive, archive_response};
pub use workspace::{WORKSPACE_PREFIX, Workspace};

use crate::archive::Archiver;
use crate::config::Config;
use crate::error::{Result, ToHttpStatus};
use axum::response::Response;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Name of the repackaged archive inside a workspace
pub const OUTPUT_ARCHIVE_NAME: &str = "output.tgz";

/// Progress of a single request through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Request accepted
    Received,
    /// Tokens canonicalized
    Normalized,
    /// Registry artifact resolved
    Located,
    /// Workspace directory created
    WorkspaceOpen,
    /// Registry tarball on disk
    Fetched,
    /// Binary extracted
    Extracted,
    /// Binary marked executable
    PermissionSet,
    /// Output archive written
    Repackaged,
    /// Output archive sent
    Streamed,
    /// Workspace removed
    WorkspaceClosed,
}

impl Stage {
    /// Stable lowercase name for logs
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::Normalized => "normalized",
            Stage::Located => "located",
            Stage::WorkspaceOpen => "workspace_open",
            Stage::Fetched => "fetched",
            Stage::Extracted => "extracted",
            Stage::PermissionSet => "permission_set",
            Stage::Repackaged => "repackaged",
            Stage::Streamed => "streamed",
            Stage::WorkspaceClosed => "workspace_closed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runs the download pipeline
///
/// # Examples
///
/// ```no_run
/// use dotenvx_sh::{Config, DownloadRequest, NativeArchiver, Pipeline};
/// use std::sync::Arc;
///
/// # async fn example() -> dotenvx_sh::Result<()> {
/// let config = Config::default();
/// let pipeline = Pipeline::new(&config, reqwest::Client::new(), Arc::new(NativeArchiver));
///
/// let request = DownloadRequest::new("linux", "amd64", Some("1.2.3".to_string()));
/// let response = pipeline.run(&request, "1.2.3").await?;
/// assert_eq!(response.status(), 200);
/// # Ok(())
/// # }
/// ```
pub struct Pipeline {
    locator: ArtifactLocator,
    client: reqwest::Client,
    archiver: Arc<dyn Archiver>,
    workspace_root: PathBuf,
    tool_name: String,
}

impl Pipeline {
    /// Create a pipeline from configuration, a shared HTTP client and an archive backend
    pub fn new(config: &Config, client: reqwest::Client, archiver: Arc<dyn Archiver>) -> Self {
        Self {
            locator: ArtifactLocator::from_config(config),
            client,
            archiver,
            workspace_root: config.workspace_root(),
            tool_name: config.tool.name.clone(),
        }
    }

    /// Name of the active archive backend
    pub fn archiver_name(&self) -> &'static str {
        self.archiver.name()
    }

    /// Normalize and locate, without touching the filesystem or network
    pub fn resolve(
        &self,
        request: &DownloadRequest,
        current_version: &str,
    ) -> Result<ResolvedArtifactSpec> {
        let normalized = request.normalize(&self.tool_name, current_version)?;
        debug!(
            stage = %Stage::Normalized,
            os = %normalized.os,
            arch = %normalized.arch,
            version = %normalized.version,
            "request normalized"
        );

        let spec = self.locator.locate(normalized)?;
        debug!(stage = %Stage::Located, url = %spec.source_url, "artifact located");
        Ok(spec)
    }

    /// Fetch, extract, mark executable and repackage into a fresh workspace
    ///
    /// On failure the workspace is released before the error is returned.
    pub async fn prepare(&self, spec: &ResolvedArtifactSpec) -> Result<PreparedArchive> {
        let workspace = Workspace::acquire(&self.workspace_root).await?;
        let mut stage = Stage::WorkspaceOpen;

        match self.build(spec, &workspace, &mut stage).await {
            Ok(path) => Ok(PreparedArchive {
                workspace,
                path,
                download_name: spec.source_filename.clone(),
            }),
            Err(e) => {
                warn!(
                    failed_after = %stage,
                    error = %e,
                    code = e.error_code(),
                    url = %spec.source_url,
                    "download pipeline failed"
                );
                if let Err(cleanup) = workspace.release().await {
                    warn!(error = %cleanup, "workspace cleanup failed");
                }
                Err(e)
            }
        }
    }

    async fn build(
        &self,
        spec: &ResolvedArtifactSpec,
        workspace: &Workspace,
        stage: &mut Stage,
    ) -> Result<PathBuf> {
        let source = workspace.join(&spec.source_filename);
        let bytes = fetch_to_file(&self.client, &spec.source_url, &source).await?;
        *stage = Stage::Fetched;
        debug!(stage = %stage, bytes, "registry tarball fetched");

        let binary = self
            .archiver
            .extract(&source, workspace.path(), &spec.binary_name)
            .await?;
        *stage = Stage::Extracted;
        debug!(stage = %stage, binary = %binary.display(), "binary extracted");

        make_executable(&binary).await?;
        *stage = Stage::PermissionSet;

        let output = workspace.join(OUTPUT_ARCHIVE_NAME);
        self.archiver
            .repackage(workspace.path(), &spec.binary_name, &output)
            .await?;
        *stage = Stage::Repackaged;
        debug!(stage = %stage, output = %output.display(), "archive repackaged");

        Ok(output)
    }

    /// Run every stage and return a streaming response
    pub async fn run(&self, request: &DownloadRequest, current_version: &str) -> Result<Response> {
        debug!(stage = %Stage::Received, os = %request.os, arch = %request.arch, "download requested");
        let spec = self.resolve(request, current_version)?;
        let prepared = self.prepare(&spec).await?;

        info!(
            os = %spec.os,
            arch = %spec.arch,
            version = %spec.version,
            backend = self.archiver.name(),
            "serving repackaged archive"
        );
        archive_response(prepared).await
    }
}
