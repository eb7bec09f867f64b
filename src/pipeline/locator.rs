//! Registry artifact location
//!
//! Derives the package id, tarball filename and registry URL from a
//! normalized request by string composition against
//! `<registry>/@<scope>/<repo>/-/<repo>-<version>.tgz`.

use super::request::NormalizedRequest;
use crate::config::{Config, is_token_char};
use crate::error::{Error, Result};
use url::Url;

/// Everything needed to fetch and repackage one artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifactSpec {
    /// Canonical os
    pub os: String,
    /// Canonical arch
    pub arch: String,
    /// Bare version
    pub version: String,
    /// Name of the executable inside the archive
    pub binary_name: String,
    /// `<tool>-<os>-<arch>`
    pub repo_id: String,
    /// `<repo_id>-<version>.tgz`
    pub source_filename: String,
    /// Registry URL of the source tarball
    pub source_url: Url,
}

/// Builds [`ResolvedArtifactSpec`]s against a fixed registry
#[derive(Debug, Clone)]
pub struct ArtifactLocator {
    registry_url: String,
    scope: String,
    tool_name: String,
}

impl ArtifactLocator {
    /// Create a locator for `tool_name` published under `@scope` on `registry_url`
    pub fn new(
        registry_url: impl Into<String>,
        scope: impl Into<String>,
        tool_name: impl Into<String>,
    ) -> Self {
        Self {
            registry_url: registry_url.into(),
            scope: scope.into(),
            tool_name: tool_name.into(),
        }
    }

    /// Create a locator from the service configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.upstream.registry_url.clone(),
            config.tool.scope.clone(),
            config.tool.name.clone(),
        )
    }

    /// Resolve the registry artifact for a normalized request
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRequest`] if a token holds characters that are unsafe
    /// in a URL path or filename.
    pub fn locate(&self, request: NormalizedRequest) -> Result<ResolvedArtifactSpec> {
        ensure_path_token("os", &request.os, is_token_char)?;
        ensure_path_token("arch", &request.arch, is_token_char)?;
        ensure_path_token("version", &request.version, is_version_char)?;

        let repo_id = repo_id(&self.tool_name, &request.os, &request.arch);
        let source_filename = format!("{}-{}.tgz", repo_id, request.version);
        let raw_url = format!(
            "{}/@{}/{}/-/{}",
            self.registry_url.trim_end_matches('/'),
            self.scope,
            repo_id,
            source_filename
        );
        let source_url = Url::parse(&raw_url).map_err(|e| {
            Error::InvalidRequest(format!("cannot build registry URL '{}': {}", raw_url, e))
        })?;

        Ok(ResolvedArtifactSpec {
            os: request.os,
            arch: request.arch,
            version: request.version,
            binary_name: request.binary_name,
            repo_id,
            source_filename,
            source_url,
        })
    }
}

/// `<tool>-<os>-<arch>`
pub fn repo_id(tool_name: &str, os: &str, arch: &str) -> String {
    format!("{}-{}-{}", tool_name, os, arch)
}

/// Scoped registry package name, `@<scope>/<repo_id>`
pub fn package_name(scope: &str, repo_id: &str) -> String {
    format!("@{}/{}", scope, repo_id)
}

/// Characters allowed in a version token, case preserved
pub(crate) fn is_version_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+' | '_')
}

/// Reject tokens that could alter the URL or escape a path component
pub(crate) fn ensure_path_token(kind: &str, value: &str, allowed: fn(char) -> bool) -> Result<()> {
    if value.is_empty() || value == "." || value == ".." {
        return Err(Error::InvalidRequest(format!("invalid {} token '{}'", kind, value)));
    }
    if let Some(bad) = value.chars().find(|c| !allowed(*c)) {
        return Err(Error::InvalidRequest(format!(
            "invalid character {:?} in {} token '{}'",
            bad, kind, value
        )));
    }
    Ok(())
}
