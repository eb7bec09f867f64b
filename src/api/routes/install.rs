//! Install script and static text handlers.

use crate::Result;
use crate::api::AppState;
use crate::assets::{InstallParams, render_install_script};
use crate::error::Error;
use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

fn text(body: String) -> Response {
    ([(header::CONTENT_TYPE, TEXT_PLAIN)], body).into_response()
}

/// GET /, /install.sh, /installer.sh - Main install script
pub async fn install_script(
    State(state): State<AppState>,
    Query(params): Query<InstallParams>,
) -> Result<Response> {
    let script = render_install_script(&state.assets.install_script, &params)?;
    Ok(text(script))
}

/// GET /VERSION - Current release version
pub async fn version(State(state): State<AppState>) -> Response {
    text(state.assets.version.clone())
}

/// GET /robots.txt
pub async fn robots(State(state): State<AppState>) -> Response {
    text(state.assets.robots.clone())
}

/// GET /{prefix}, /{prefix}/install.sh - Product install script
pub async fn product_install_script(
    State(state): State<AppState>,
    Query(params): Query<InstallParams>,
    prefix: String,
) -> Result<Response> {
    let product = state
        .assets
        .product(&prefix)
        .ok_or_else(|| Error::NotFound(format!("product '{}'", prefix)))?;
    Ok(text(product.render(params)?))
}

/// GET /{prefix}/VERSION - Product version
pub async fn product_version(State(state): State<AppState>, prefix: String) -> Result<Response> {
    let product = state
        .assets
        .product(&prefix)
        .ok_or_else(|| Error::NotFound(format!("product '{}'", prefix)))?;
    Ok(text(product.version.clone()))
}
