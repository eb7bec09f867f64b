//! Route handlers
//!
//! Handlers are organized by domain:
//! - [`install`] — install scripts, version and robots text
//! - [`download`] — per-platform binary archives
//! - [`stats`] — download count badge
//! - [`system`] — health

use serde::Deserialize;

mod download;
mod install;
mod stats;
mod system;

pub use download::*;
pub use install::*;
pub use stats::*;
pub use system::*;

/// Query parameters for `GET /{os}/{arch}`
#[derive(Debug, Default, Deserialize)]
pub struct DownloadQuery {
    /// Requested version, with or without a `v` prefix
    pub version: Option<String>,
}
