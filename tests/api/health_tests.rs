//! Health Check API Tests

use axum::http::StatusCode;
use serde_json::Value;

use crate::common::TestApp;

#[tokio::test]
async fn test_health_check_returns_ok() {
    let app = TestApp::new().await;

    let response = app.server.get("/health").await;

    response.assert_status_ok();
    let json = response.json::<Value>();
    assert_eq!(json["status"], "healthy");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_liveness_probe() {
    let app = TestApp::new().await;

    let response = app.server.get("/health/live").await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "alive");
}

#[tokio::test]
async fn test_readiness_reports_store_and_hub() {
    let app = TestApp::new().await;

    let response = app.server.get("/health/ready").await;

    response.assert_status_ok();
    let json = response.json::<Value>();
    assert_ne!(json["status"], "unhealthy");
    assert_eq!(json["checks"]["hub"]["active_connections"], 0);
    assert!(json["checks"]["database"]["status"].is_string());
}

#[tokio::test]
async fn test_readiness_fails_after_hub_shutdown() {
    let app = TestApp::new().await;
    app.state.hub.shutdown().await;

    let response = app.server.get("/health/ready").await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.json::<Value>()["checks"]["hub"]["status"], "unhealthy");
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_chat_metrics() {
    let app = TestApp::new().await;
    app.server.get("/health").await;

    let response = app.server.get("/metrics").await;

    response.assert_status_ok();
    let body = response.text();
    assert!(body.contains("forum_chat_http_requests_total"));
    assert!(body.contains("forum_chat_chat_connections_active"));
}
