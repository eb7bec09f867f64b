//! Download statistics handlers.

use crate::Result;
use crate::api::AppState;
use crate::stats::{Badge, download_badge};
use axum::{
    Json,
    extract::{Path, State},
};

/// GET /stats/curl - Downloads across every platform
pub async fn stats_all(State(state): State<AppState>) -> Result<Json<Badge>> {
    let badge = download_badge(&state.client, &state.config, None).await?;
    Ok(Json(badge))
}

/// GET /stats/curl/{platform} - Downloads for one platform
pub async fn stats_platform(
    State(state): State<AppState>,
    Path(platform): Path<String>,
) -> Result<Json<Badge>> {
    let badge = download_badge(&state.client, &state.config, Some(&platform)).await?;
    Ok(Json(badge))
}
