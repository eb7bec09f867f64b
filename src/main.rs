//! dotenvx-sh server binary
//!
//! Usage: `dotenvx-sh [config.json]`. The config path can also come from
//! `DOTENVX_SH_CONFIG`; environment variables such as `PORT` override the file.

use dotenvx_sh::{AppState, Assets, Config};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("DOTENVX_SH_CONFIG").map(PathBuf::from));

    let config = Arc::new(Config::load(config_path.as_deref())?);
    let assets = Arc::new(Assets::load(&config.assets)?);
    let state = AppState::new(config, assets)?;

    if let Err(e) = dotenvx_sh::api::start_api_server(state).await {
        tracing::error!(error = %e, "server exited with error");
        return Err(e.into());
    }
    Ok(())
}
