//! Binary archive handler.

use super::DownloadQuery;
use crate::Result;
use crate::api::AppState;
use crate::pipeline::DownloadRequest;
use crate::proxy;
use axum::{
    extract::{Path, Query, State},
    response::Response,
};

/// GET /{os}/{arch}?version= - Platform binary archive
///
/// Repackages the registry tarball, or proxies the release host when the
/// configured download mode says so.
pub async fn download(
    State(state): State<AppState>,
    Path((os, arch)): Path<(String, String)>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response> {
    let request = DownloadRequest::new(os, arch, query.version);

    if state
        .config
        .download
        .mode
        .should_proxy(request.has_version())
    {
        let url = proxy::release_url(
            &state.config.upstream.releases_url,
            &state.config.tool.name,
            &request.os,
            &request.arch,
            request.version.as_deref(),
        )?;
        return proxy::stream_release(&state.proxy_client, &url, state.config.upstream.timeout)
            .await;
    }

    state.pipeline.run(&request, &state.assets.version).await
}
