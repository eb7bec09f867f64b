//! Application state for the API server

use crate::archive::build_archiver;
use crate::error::{Error, Result};
use crate::pipeline::Pipeline;
use crate::{Assets, Config};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clones). Everything in here is fixed at
/// startup; requests never write to it.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration
    pub config: Arc<Config>,

    /// Install scripts, version and robots text loaded at startup
    pub assets: Arc<Assets>,

    /// Download pipeline
    pub pipeline: Arc<Pipeline>,

    /// HTTP client for the pipeline and the stats lookups
    ///
    /// Its timeout covers the whole exchange, body included.
    pub client: reqwest::Client,

    /// HTTP client for proxied release archives
    ///
    /// Only connecting is bounded here; the body is read at the pace of the
    /// downstream client, and `proxy::stream_release` bounds the response
    /// headers itself.
    pub proxy_client: reqwest::Client,
}

impl AppState {
    /// Build the HTTP client, archive backend and pipeline
    pub fn new(config: Arc<Config>, assets: Arc<Assets>) -> Result<Self> {
        let client = build_client(
            reqwest::Client::builder().timeout(config.upstream.timeout),
        )?;
        let proxy_client = build_client(
            reqwest::Client::builder().connect_timeout(config.upstream.timeout),
        )?;

        let archiver = build_archiver(&config)?;
        let pipeline = Arc::new(Pipeline::new(&config, client.clone(), archiver));

        tracing::debug!(
            backend = pipeline.archiver_name(),
            mode = ?config.download.mode,
            workspace_root = %config.workspace_root().display(),
            "application state ready"
        );

        Ok(Self {
            config,
            assets,
            pipeline,
            client,
            proxy_client,
        })
    }
}

fn build_client(builder: reqwest::ClientBuilder) -> Result<reqwest::Client> {
    builder
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::Config {
            message: format!("failed to build HTTP client: {}", e),
            key: Some("upstream".to_string()),
        })
}
