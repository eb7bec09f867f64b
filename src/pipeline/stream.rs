use super::{Stage, Workspace};
use crate::error::{Error, Result, ToHttpStatus};
use axum::body::{Body, Bytes};
use axum::http::{StatusCode, header};
use axum::response::Response;
use futures::Stream;
use futures::future::BoxFuture;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

/// Content type of every repackaged archive
pub const ARCHIVE_CONTENT_TYPE: &str = "application/gzip";

/// A repackaged archive waiting to be streamed, still inside its workspace
#[derive(Debug)]
pub struct PreparedArchive {
    /// Workspace holding the archive
    pub workspace: Workspace,
    /// Path of the repackaged archive
    pub path: PathBuf,
    /// Filename offered to the client
    pub download_name: String,
}

/// Body stream that owns the workspace it reads from
///
/// The workspace is released as soon as the file is exhausted, and the stream
/// only ends once the directory is gone. If the client goes away first, the
/// stream is dropped and the workspace with it.
pub struct ArchiveStream {
    inner: ReaderStream<File>,
    workspace: Option<Workspace>,
    cleanup: Option<BoxFuture<'static, Result<()>>>,
}

impl ArchiveStream {
    /// Stream `file`, releasing `workspace` at end of file
    pub fn new(file: File, workspace: Workspace) -> Self {
        Self {
            inner: ReaderStream::new(file),
            workspace: Some(workspace),
            cleanup: None,
        }
    }
}

impl Stream for ArchiveStream {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(cleanup) = this.cleanup.as_mut() {
                let result = std::task::ready!(cleanup.as_mut().poll(cx));
                this.cleanup = None;
                if let Err(e) = result {
                    warn!(error = %e, code = e.error_code(), "workspace cleanup failed");
                }
                return Poll::Ready(None);
            }

            match std::task::ready!(Pin::new(&mut this.inner).poll_next(cx)) {
                Some(chunk) => return Poll::Ready(Some(chunk)),
                None => match this.workspace.take() {
                    Some(workspace) => {
                        debug!(stage = %Stage::Streamed, "archive streamed");
                        this.cleanup = Some(Box::pin(workspace.release()));
                    }
                    None => return Poll::Ready(None),
                },
            }
        }
    }
}

/// Turn a prepared archive into a streaming `200` response
///
/// Sets `Content-Type: application/gzip`, `Content-Length` and a
/// `Content-Disposition` attachment named after the registry tarball.
pub async fn archive_response(prepared: PreparedArchive) -> Result<Response> {
    let PreparedArchive {
        workspace,
        path,
        download_name,
    } = prepared;

    let file = File::open(&path).await?;
    let length = file.metadata().await?.len();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, ARCHIVE_CONTENT_TYPE)
        .header(header::CONTENT_LENGTH, length)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", download_name),
        )
        .body(Body::from_stream(ArchiveStream::new(file, workspace)))
        .map_err(|e| Error::ApiServerError(format!("failed to build archive response: {}", e)))
}
