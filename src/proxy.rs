//! Release host proxying
//!
//! In the proxy download modes `GET /{os}/{arch}` streams a prebuilt archive
//! straight from the release host instead of repackaging the registry
//! tarball.

use crate::config::is_token_char;
use crate::error::{Error, Result};
use crate::pipeline::{ensure_path_token, is_version_char, normalize_version};
use std::time::Duration;
use axum::body::Body;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::Response;
use tracing::{debug, warn};
use url::Url;

/// Version path segment used when no version is requested
pub const LATEST: &str = "latest";

/// Build `<releases>/<version>/<tool>-<os>-<arch>`
///
/// The version gains a `v` prefix, or becomes `latest` when absent. An arch
/// ending in `.tgz` is rewritten to `.tar.gz` and an arch without any
/// extension gets `.tar.gz` appended.
///
/// # Errors
///
/// [`Error::InvalidRequest`] if a token holds characters unsafe in a URL path.
pub fn release_url(
    releases_url: &str,
    tool_name: &str,
    os: &str,
    arch: &str,
    version: Option<&str>,
) -> Result<Url> {
    let os = os.trim().to_lowercase();
    let arch = release_arch(arch);
    let version = match version.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => format!("v{}", normalize_version(Some(v), "")),
        None => LATEST.to_string(),
    };

    ensure_path_token("version", &version, is_version_char)?;
    for (kind, value) in [("os", &os), ("arch", &arch)] {
        if value.is_empty()
            || value.starts_with('.')
            || !value.chars().all(|c| is_token_char(c) || c == '+')
        {
            return Err(Error::InvalidRequest(format!(
                "invalid {} token '{}'",
                kind, value
            )));
        }
    }

    let raw = format!(
        "{}/{}/{}-{}-{}",
        releases_url.trim_end_matches('/'),
        version,
        tool_name,
        os,
        arch
    );
    Url::parse(&raw)
        .map_err(|e| Error::InvalidRequest(format!("cannot build release URL '{}': {}", raw, e)))
}

fn release_arch(raw: &str) -> String {
    let arch = raw.trim().to_lowercase();
    if let Some(stem) = arch.strip_suffix(".tgz") {
        format!("{}.tar.gz", stem)
    } else if !arch.contains('.') {
        format!("{}.tar.gz", arch)
    } else {
        arch
    }
}

/// Stream a release archive, forwarding its `Content-Type` and `Content-Length`
///
/// `timeout` bounds the wait for the response headers only. Once the status
/// has been forwarded the body streams for as long as the downstream client
/// keeps reading, so `client` must not carry a total request timeout.
///
/// # Errors
///
/// [`Error::UpstreamFetch`] if the release host is unreachable, does not
/// answer within `timeout`, or answers with a non-2xx status.
pub async fn stream_release(
    client: &reqwest::Client,
    url: &Url,
    timeout: Duration,
) -> Result<Response> {
    let fetch_error = |reason: String| Error::UpstreamFetch {
        url: url.to_string(),
        status: None,
        reason,
    };

    let response = tokio::time::timeout(timeout, client.get(url.clone()).send())
        .await
        .map_err(|_| fetch_error(format!("no response within {:?}", timeout)))?
        .map_err(|e| fetch_error(format!("request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        warn!(url = %url, status = status.as_u16(), "release host rejected request");
        return Err(Error::UpstreamFetch {
            url: url.to_string(),
            status: Some(status.as_u16()),
            reason: format!("release host returned HTTP {}", status),
        });
    }

    let mut builder = Response::builder().status(StatusCode::OK);
    for (name, upstream) in [
        (header::CONTENT_TYPE, reqwest::header::CONTENT_TYPE),
        (header::CONTENT_LENGTH, reqwest::header::CONTENT_LENGTH),
    ] {
        let forwarded = response
            .headers()
            .get(upstream)
            .and_then(|v| HeaderValue::from_bytes(v.as_bytes()).ok());
        if let Some(value) = forwarded {
            builder = builder.header(name, value);
        }
    }

    debug!(url = %url, "proxying release archive");
    builder
        .body(Body::from_stream(response.bytes_stream()))
        .map_err(|e| Error::ApiServerError(format!("failed to build proxy response: {}", e)))
}
