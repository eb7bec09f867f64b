use crate::error::{Error, Result};
use futures::StreamExt;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use url::Url;

/// Download `url` into `dest`, returning the number of bytes written
///
/// The body is written chunk by chunk, never buffered whole.
///
/// # Errors
///
/// [`Error::UpstreamFetch`] on connection failure, a non-2xx status or a
/// body that breaks off. [`Error::Io`] if `dest` cannot be written.
pub async fn fetch_to_file(client: &reqwest::Client, url: &Url, dest: &Path) -> Result<u64> {
    let fetch_error = |status: Option<u16>, reason: String| Error::UpstreamFetch {
        url: url.to_string(),
        status,
        reason,
    };

    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| fetch_error(None, format!("request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(fetch_error(
            Some(status.as_u16()),
            format!("registry returned HTTP {}", status),
        ));
    }

    let mut file = tokio::fs::File::create(dest).await?;
    let mut written = 0u64;
    let mut body = response.bytes_stream();

    while let Some(chunk) = body.next().await {
        let chunk =
            chunk.map_err(|e| fetch_error(Some(status.as_u16()), format!("body read failed: {}", e)))?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    file.sync_all().await?;

    debug!(url = %url, dest = %dest.display(), bytes = written, "fetched upstream artifact");
    Ok(written)
}
