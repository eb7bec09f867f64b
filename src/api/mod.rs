//! HTTP server module
//!
//! Serves the install scripts, static text, download statistics and the
//! per-platform binary archives.

use crate::Result;
use crate::assets::InstallParams;
use crate::config::product_paths;
use axum::{
    Router,
    extract::{Query, State},
    routing::get,
};
use std::future::Future;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub mod error_response;
pub mod routes;
pub mod state;

pub use state::AppState;

/// Create the router with all route definitions
///
/// # Routes
///
/// ## Install scripts
/// - `GET /`, `GET /install.sh`, `GET /installer.sh` - Main install script
/// - `GET /VERSION` - Current release version
/// - `GET /robots.txt` - Robots text
/// - `GET /{prefix}`, `GET /{prefix}/install.sh`, `GET /{prefix}/VERSION` - Per product
///
/// ## Downloads
/// - `GET /{os}/{arch}?version=` - Platform binary archive
///
/// ## Statistics
/// - `GET /stats/curl` - Download badge for every platform
/// - `GET /stats/curl/{platform}` - Download badge for one platform
///
/// ## System
/// - `GET /health` - Health check
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        // Install scripts
        .route("/", get(routes::install_script))
        .route("/install.sh", get(routes::install_script))
        .route("/installer.sh", get(routes::install_script))
        .route("/VERSION", get(routes::version))
        .route("/robots.txt", get(routes::robots))
        // Statistics
        .route("/stats/curl", get(routes::stats_all))
        .route("/stats/curl/:platform", get(routes::stats_platform))
        // System
        .route("/health", get(routes::health_check))
        // Downloads
        .route("/:os/:arch", get(routes::download));

    // Static product paths outrank the `/:os/:arch` parameters
    let router = state
        .assets
        .products
        .iter()
        .map(|product| product.prefix.clone())
        .fold(router, product_routes);

    router
        .fallback(error_response::not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

fn product_routes(router: Router<AppState>, prefix: String) -> Router<AppState> {
    let install = {
        let prefix = prefix.clone();
        move |state: State<AppState>, params: Query<InstallParams>| {
            routes::product_install_script(state, params, prefix)
        }
    };
    let version = {
        let prefix = prefix.clone();
        move |state: State<AppState>| routes::product_version(state, prefix)
    };

    let [root, script, version_path] = product_paths(&prefix);
    router
        .route(&root, get(install.clone()))
        .route(&script, get(install))
        .route(&version_path, get(version))
}

/// Start the server on the configured bind address
///
/// Runs until SIGTERM/SIGINT (or Ctrl+C), then drains in-flight requests.
///
/// # Example
///
/// ```no_run
/// use dotenvx_sh::{AppState, Assets, Config};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let assets = Arc::new(Assets::load(&config.assets)?);
/// let state = AppState::new(config, assets)?;
///
/// // Blocks until shutdown
/// dotenvx_sh::api::start_api_server(state).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(state: AppState) -> Result<()> {
    let bind_address = state.config.server.bind_address;

    tracing::info!(
        address = %bind_address,
        "Starting HTTP server"
    );

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(
        address = %bind_address,
        version = %state.assets.version,
        mode = ?state.config.download.mode,
        "HTTP server listening"
    );

    serve_with_shutdown(listener, state, crate::shutdown_signal()).await
}

/// Serve on an already bound listener until `signal` resolves
pub async fn serve_with_shutdown<F>(listener: TcpListener, state: AppState, signal: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(signal)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
