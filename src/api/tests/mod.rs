use super::*;
use crate::config::Config;
use crate::test_helpers::{test_assets, test_config};
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::MockServer;

mod install;

/// Router wired to a mock upstream, with workspaces under `workspace_dir`
fn test_router(upstream: &MockServer, workspace_dir: &std::path::Path) -> Router {
    create_router(crate::test_helpers::test_state(&upstream.uri(), workspace_dir))
}

/// Router built from a customized config
fn router_with(config: Config) -> Router {
    let state = AppState::new(Arc::new(config), Arc::new(test_assets())).unwrap();
    create_router(state)
}

async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_text(response: Response) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

fn content_type(response: &Response) -> &str {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

#[tokio::test]
async fn test_api_server_serves_and_shuts_down() {
    let upstream = MockServer::start().await;
    let workspace = tempfile::tempdir().unwrap();
    let state = crate::test_helpers::test_state(&upstream.uri(), workspace.path());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(serve_with_shutdown(listener, state, async move {
        let _ = stop_rx.await;
    }));

    let body = reqwest::get(format!("http://{}/VERSION", addr))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "1.2.3");

    stop_tx.send(()).unwrap();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let upstream = MockServer::start().await;
    let workspace = tempfile::tempdir().unwrap();

    let response = get(test_router(&upstream, workspace.path()), "/a/b/c/d").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(response).await, "404 not found");
}
