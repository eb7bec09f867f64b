//! Request normalization
//!
//! Turns raw path and query tokens into canonical `{os, arch, version}` plus
//! the binary name. Pure string work, no I/O.

use crate::error::{Error, Result};

/// Inputs exactly as received on `GET /{os}/{arch}?version=`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Raw os token
    pub os: String,
    /// Raw arch token, possibly carrying a file extension (`amd64.tgz`)
    pub arch: String,
    /// Raw version token, possibly `v`-prefixed
    pub version: Option<String>,
}

/// Canonical request fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRequest {
    /// Lowercased, trimmed os
    pub os: String,
    /// Lowercased, trimmed arch without trailing extension
    pub arch: String,
    /// Bare version (no `v` prefix)
    pub version: String,
    /// Tool name, with `.exe` appended on windows
    pub binary_name: String,
}

impl DownloadRequest {
    /// Create a request from raw tokens
    pub fn new(os: impl Into<String>, arch: impl Into<String>, version: Option<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
            version,
        }
    }

    /// Whether the caller asked for a specific version
    pub fn has_version(&self) -> bool {
        self.version
            .as_deref()
            .is_some_and(|v| !v.trim().is_empty())
    }

    /// Canonicalize the tokens
    ///
    /// An absent or blank version falls back to `current_version`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRequest`] if a token is empty after normalization.
    pub fn normalize(&self, tool_name: &str, current_version: &str) -> Result<NormalizedRequest> {
        let os = normalize_os(&self.os);
        let arch = normalize_arch(&self.arch);
        let version = normalize_version(self.version.as_deref(), current_version);

        for (kind, value) in [("os", &os), ("arch", &arch), ("version", &version)] {
            if value.is_empty() {
                return Err(Error::InvalidRequest(format!("empty {} token", kind)));
            }
        }

        let binary_name = binary_name_for(tool_name, &os);
        Ok(NormalizedRequest {
            os,
            arch,
            version,
            binary_name,
        })
    }
}

/// Lowercase and trim an os token
pub fn normalize_os(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Lowercase and trim an arch token, dropping one trailing extension
///
/// `amd64.tgz` and `amd64` both become `amd64`.
pub fn normalize_arch(raw: &str) -> String {
    strip_extension(raw.trim()).trim().to_lowercase()
}

/// Strip a leading `v` from the requested version, or fall back to `current`
pub fn normalize_version(raw: Option<&str>, current: &str) -> String {
    let version = match raw.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => current.trim(),
    };
    version.strip_prefix('v').unwrap_or(version).to_string()
}

/// `<tool>.exe` on windows, `<tool>` everywhere else
pub fn binary_name_for(tool_name: &str, os: &str) -> String {
    if os == "windows" {
        format!("{}.exe", tool_name)
    } else {
        tool_name.to_string()
    }
}

/// Remove a trailing `.ext` where `ext` holds no `/` or `.`
pub(crate) fn strip_extension(value: &str) -> &str {
    match value.rfind('.') {
        Some(idx) => {
            let ext = &value[idx + 1..];
            if ext.is_empty() || ext.contains('/') {
                value
            } else {
                &value[..idx]
            }
        }
        None => value,
    }
}
