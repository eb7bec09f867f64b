//! Test server setup: config from fixture assets, real TCP listener

use super::fixtures::write_assets;
use dotenvx_sh::config::ProductConfig;
use dotenvx_sh::{AppState, Assets, Config};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A running server plus the directories it owns
pub struct TestServer {
    /// Address the server listens on
    pub addr: SocketAddr,
    /// Directory per-request workspaces are created in
    pub workspace_dir: TempDir,
    _assets_dir: TempDir,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<dotenvx_sh::Result<()>>>,
}

impl TestServer {
    /// Absolute URL for `path`
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Stop the server and wait for it to drain
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle
                .await
                .expect("Server task panicked")
                .expect("Server returned an error");
        }
    }
}

/// Config with every upstream pointed at `upstream_url`
pub fn config_for(upstream_url: &str, assets_dir: &TempDir, workspace_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.server.bind_address = "127.0.0.1:0".parse().expect("valid address");
    config.upstream.registry_url = upstream_url.to_string();
    config.upstream.releases_url = format!("{}/releases", upstream_url);
    config.upstream.stats_api_url = upstream_url.to_string();
    config.upstream.timeout = Duration::from_secs(10);
    config.download.workspace_dir = Some(workspace_dir.path().to_path_buf());
    config.assets.dir = assets_dir.path().to_path_buf();
    config.assets.products = vec![ProductConfig {
        prefix: "radar".to_string(),
        default_version: "0.1.0".to_string(),
        platform_params: true,
    }];
    config
}

/// Start a server against `upstream_url` with default settings
pub async fn spawn_server(upstream_url: &str) -> TestServer {
    spawn_server_with(upstream_url, |_| {}).await
}

/// Start a server against `upstream_url`, letting the caller adjust the config
pub async fn spawn_server_with<F>(upstream_url: &str, customize: F) -> TestServer
where
    F: FnOnce(&mut Config),
{
    let assets_dir = TempDir::new().expect("Failed to create assets dir");
    let workspace_dir = TempDir::new().expect("Failed to create workspace dir");
    write_assets(assets_dir.path());

    let mut config = config_for(upstream_url, &assets_dir, &workspace_dir);
    customize(&mut config);
    config.validate().expect("Test config should be valid");

    let config = Arc::new(config);
    let assets = Arc::new(Assets::load(&config.assets).expect("Failed to load assets"));
    let state = AppState::new(config, assets).expect("Failed to build state");

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind listener");
    let addr = listener.local_addr().expect("Listener has no address");

    let (tx, rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(dotenvx_sh::api::serve_with_shutdown(
        listener,
        state,
        async move {
            let _ = rx.await;
        },
    ));

    TestServer {
        addr,
        workspace_dir,
        _assets_dir: assets_dir,
        shutdown: Some(tx),
        handle: Some(handle),
    }
}
