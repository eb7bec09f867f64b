//! HTTP error response handling for the API
//!
//! Clients only ever see a short plain-text body. The full error, including
//! upstream URLs and status codes, goes to the log.

use crate::error::{Error, ToHttpStatus};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Body sent for every failure other than an unknown resource
pub const INTERNAL_ERROR_BODY: &str = "500 error";

/// Body sent for unknown resources
pub const NOT_FOUND_BODY: &str = "404 not found";

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status_code == StatusCode::NOT_FOUND {
            tracing::debug!(error = %self, code = self.error_code(), "resource not found");
            return (status_code, NOT_FOUND_BODY).into_response();
        }

        tracing::error!(error = %self, code = self.error_code(), "request failed");
        (status_code, INTERNAL_ERROR_BODY).into_response()
    }
}

/// Fallback handler for routes that match nothing
pub async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, NOT_FOUND_BODY).into_response()
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;
    use std::path::PathBuf;

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn pipeline_errors_are_generic_500() {
        let response = Error::UpstreamFetch {
            url: "https://registry.npmjs.org/@dotenvx/secret-path.tgz".to_string(),
            status: Some(404),
            reason: "registry returned HTTP 404 Not Found".to_string(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(
            response.headers()[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/plain")
        );
        let body = body_text(response).await;
        assert_eq!(body, "500 error");
        assert!(!body.contains("registry"));
    }

    #[tokio::test]
    async fn every_pipeline_stage_maps_to_500() {
        for error in [
            Error::InvalidRequest("bad".to_string()),
            Error::Extraction {
                archive: PathBuf::from("/tmp/a.tgz"),
                reason: "corrupt".to_string(),
            },
            Error::Permission {
                path: PathBuf::from("/tmp/dotenvx"),
                reason: "denied".to_string(),
            },
            Error::Repackaging {
                output: PathBuf::from("/tmp/out.tgz"),
                reason: "disk full".to_string(),
            },
        ] {
            let response = error.into_response();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body_text(response).await, "500 error");
        }
    }

    #[tokio::test]
    async fn not_found_is_404_text() {
        let response = Error::NotFound("platform plan9".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, "404 not found");
    }
}
