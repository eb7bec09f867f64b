//! # dotenvx-sh
//!
//! Public installer endpoint for a command-line tool. It serves the install
//! script and version text, and on demand repackages a platform-specific
//! binary out of the vendor's registry tarball.
//!
//! ## Request pipeline
//!
//! `GET /{os}/{arch}?version=` runs a strictly linear pipeline:
//!
//! 1. normalize the raw tokens into a [`pipeline::NormalizedRequest`]
//! 2. locate the registry tarball ([`pipeline::ResolvedArtifactSpec`])
//! 3. open a per-request [`pipeline::Workspace`]
//! 4. fetch, extract, set permissions, repackage
//! 5. stream the new archive back and release the workspace
//!
//! The workspace is released on every exit path, including a client that
//! disconnects halfway through the body.
//!
//! ## Quick Start
//!
//! ```no_run
//! use dotenvx_sh::{AppState, Assets, Config};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Arc::new(Config::load(None)?);
//!     let assets = Arc::new(Assets::load(&config.assets)?);
//!     let state = AppState::new(config, assets)?;
//!
//!     dotenvx_sh::api::start_api_server(state).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// HTTP routing layer
pub mod api;
/// Extraction and repackaging backends
pub mod archive;
/// Startup-loaded text assets and install script templating
pub mod assets;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Download pipeline stages
pub mod pipeline;
/// External process invocation
pub mod process;
/// Release host proxying
pub mod proxy;
/// Download count aggregation
pub mod stats;

#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use api::AppState;
pub use archive::{Archiver, NativeArchiver, TarCommandArchiver};
pub use assets::{Assets, InstallParams, Product, render_install_script};
pub use config::{ArchiverKind, Config, DownloadMode};
pub use error::{Error, Result, ToHttpStatus};
pub use pipeline::{DownloadRequest, Pipeline, ResolvedArtifactSpec, Workspace};
pub use process::{ProcessOutput, ProcessRunner, TokioProcessRunner};

/// Resolves once the process is asked to stop.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
pub async fn shutdown_signal() {
    wait_for_signal().await;
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
