//! Error types for dotenvx-sh
//!
//! One error enum covers the whole request pipeline plus the ambient concerns
//! (configuration, I/O, networking). Each pipeline stage has its own variant so
//! failures can be tagged in logs, while the HTTP layer collapses them into a
//! single generic response.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for dotenvx-sh operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for dotenvx-sh
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "registry_url")
        key: Option<String>,
    },

    /// Malformed os, arch or version token
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Registry or release host unreachable, timed out or answered non-2xx
    #[error("upstream fetch failed for {url}: {reason}")]
    UpstreamFetch {
        /// The URL that was requested
        url: String,
        /// HTTP status returned by the upstream, if a response arrived
        status: Option<u16>,
        /// The underlying cause
        reason: String,
    },

    /// Archive corrupt, empty or missing the expected binary
    #[error("extraction failed for {archive}: {reason}")]
    Extraction {
        /// The archive being unpacked
        archive: PathBuf,
        /// The reason extraction failed
        reason: String,
    },

    /// The extracted binary could not be made executable
    #[error("failed to set permissions on {path}: {reason}")]
    Permission {
        /// The file whose mode could not be changed
        path: PathBuf,
        /// The reason the mode change failed
        reason: String,
    },

    /// The output archive could not be written or compressed
    #[error("repackaging failed for {output}: {reason}")]
    Repackaging {
        /// The output archive path
        output: PathBuf,
        /// The reason repackaging failed
        reason: String,
    },

    /// Workspace removal failed (non-fatal, only ever logged)
    #[error("cleanup failed for {path}: {reason}")]
    Cleanup {
        /// The workspace directory that could not be removed
        path: PathBuf,
        /// The reason cleanup failed
        reason: String,
    },

    /// External tool execution failed (tar)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Requested resource does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            Error::NotFound(_) => 404,
            // Every pipeline failure is a plain 500 to the client, including
            // malformed tokens; the detail only goes to the log.
            _ => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::InvalidRequest(_) => "invalid_request",
            Error::UpstreamFetch { .. } => "upstream_fetch_error",
            Error::Extraction { .. } => "extraction_error",
            Error::Permission { .. } => "permission_error",
            Error::Repackaging { .. } => "repackaging_error",
            Error::Cleanup { .. } => "cleanup_error",
            Error::ExternalTool(_) => "external_tool_error",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::NotFound(_) => "not_found",
            Error::ApiServerError(_) => "api_server_error",
        }
    }
}
