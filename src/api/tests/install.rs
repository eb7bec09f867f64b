use super::*;
use crate::test_helpers::TEST_INSTALL_SCRIPT;

#[tokio::test]
async fn test_install_script_routes_serve_the_template() {
    let upstream = MockServer::start().await;
    let workspace = tempfile::tempdir().unwrap();

    for uri in ["/", "/install.sh", "/installer.sh"] {
        let response = get(test_router(&upstream, workspace.path()), uri).await;

        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        assert!(content_type(&response).starts_with("text/plain"));
        assert_eq!(body_text(response).await, TEST_INSTALL_SCRIPT);
    }
}

#[tokio::test]
async fn test_install_script_substitutes_query_params() {
    let upstream = MockServer::start().await;
    let workspace = tempfile::tempdir().unwrap();

    let response = get(
        test_router(&upstream, workspace.path()),
        "/install.sh?version=1.0.0&directory=/opt/bin&os=linux&arch=arm64&force=true&ignored=x",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("VERSION=\"1.0.0\""));
    assert!(body.contains("DIRECTORY=\"/opt/bin\""));
    assert!(body.contains("OS=\"linux\""));
    assert!(body.contains("ARCH=\"arm64\""));
    assert!(body.contains("FORCE=\"true\""));
}

#[tokio::test]
async fn test_version_and_robots() {
    let upstream = MockServer::start().await;
    let workspace = tempfile::tempdir().unwrap();

    let response = get(test_router(&upstream, workspace.path()), "/VERSION").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(content_type(&response).starts_with("text/plain"));
    assert_eq!(body_text(response).await, "1.2.3");

    let response = get(test_router(&upstream, workspace.path()), "/robots.txt").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "User-agent: *\nDisallow:");
}

#[tokio::test]
async fn test_product_routes() {
    let upstream = MockServer::start().await;
    let workspace = tempfile::tempdir().unwrap();

    let response = get(test_router(&upstream, workspace.path()), "/radar/VERSION").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "0.4.0");

    for uri in ["/radar?version=0.5.0&os=darwin", "/radar/install.sh?version=0.5.0&os=darwin"] {
        let response = get(test_router(&upstream, workspace.path()), uri).await;
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        let body = body_text(response).await;
        assert!(body.contains("VERSION=\"0.5.0\""));
        assert!(body.contains("OS=\"darwin\""));
    }
}

#[tokio::test]
async fn test_nested_product_ignores_platform_params() {
    let upstream = MockServer::start().await;
    let workspace = tempfile::tempdir().unwrap();

    let response = get(
        test_router(&upstream, workspace.path()),
        "/ext/hub/install.sh?version=0.3.0&os=linux&directory=/srv",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("VERSION=\"0.3.0\""));
    assert!(body.contains("DIRECTORY=\"/srv\""));
    assert!(body.contains("OS=\"\""));

    let response = get(test_router(&upstream, workspace.path()), "/ext/hub/VERSION").await;
    assert_eq!(body_text(response).await, "0.2.0");
}
