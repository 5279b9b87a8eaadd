//! API integration tests for routing, static content and middleware.
//!
//! Tests verify:
//! - Journal rules are served unchanged
//! - Health and feedback endpoints
//! - Unknown routes and methods
//! - Base path nesting, body limits and CORS

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;

use figexport::RouterConfig;

use super::test_utils::{
    get_request, json_request, sample_rules, send, test_router, test_router_with,
};

// =============================================================================
// Journal Rules
// =============================================================================

#[tokio::test]
async fn test_journal_rules() {
    let response = send(test_router(), get_request("/api/journal-rules")).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("content-type"), Some("application/json"));
    assert_eq!(response.body, sample_rules().document());

    let body = response.json();
    assert!(body.is_object());
    assert!(body.get("Nature").is_some());
}

#[tokio::test]
async fn test_journal_rules_are_stable() {
    let router = test_router();
    let first = send(router.clone(), get_request("/api/journal-rules")).await;
    let second = send(router, get_request("/api/journal-rules")).await;
    assert_eq!(first.body, second.body);
}

#[tokio::test]
async fn test_journal_rules_reject_post() {
    let request = json_request("/api/journal-rules", &json!({}));
    let response = send(test_router(), request).await;
    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
}

// =============================================================================
// Health and Feedback
// =============================================================================

#[tokio::test]
async fn test_health() {
    let response = send(test_router(), get_request("/health")).await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_submit_feedback() {
    let request = json_request(
        "/api/submit-feedback",
        &json!({"rating": 4, "feedback": "Export to TIFF works well"}),
    );
    let response = send(test_router(), request).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), json!({"success": true}));
}

#[tokio::test]
async fn test_submit_feedback_without_fields() {
    let response = send(test_router(), json_request("/api/submit-feedback", &json!({}))).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["success"], true);
}

#[tokio::test]
async fn test_submit_feedback_invalid_body() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/submit-feedback")
        .header("content-type", "application/json")
        .body(Body::from("rating=5"))
        .unwrap();
    let response = send(test_router(), request).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["error"], "Failed to submit feedback");
}

// =============================================================================
// Routing
// =============================================================================

#[tokio::test]
async fn test_unknown_action() {
    let response = send(test_router(), json_request("/api/frobnicate", &json!({}))).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["error"], "not_found");
}

#[tokio::test]
async fn test_export_requires_post() {
    let response = send(test_router(), get_request("/api/export-png")).await;
    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_base_path() {
    let router = test_router_with(RouterConfig::new().with_base_path("/easyfig"));

    let response = send(router.clone(), get_request("/easyfig/api/journal-rules")).await;
    assert_eq!(response.status, StatusCode::OK);

    let response = send(router.clone(), get_request("/api/journal-rules")).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    // Health stays at the root
    let response = send(router, get_request("/health")).await;
    assert_eq!(response.status, StatusCode::OK);
}

// =============================================================================
// Middleware
// =============================================================================

#[tokio::test]
async fn test_body_limit() {
    let router = test_router_with(RouterConfig::new().with_max_upload_bytes(1024));
    let url = format!("data:image/png;base64,{}", "A".repeat(4096));
    let response = send(
        router,
        json_request("/api/export-png", &json!({"canvasDataUrl": url})),
    )
    .await;

    assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(response.json()["error"], "request_rejected");
}

#[tokio::test]
async fn test_cors_preflight() {
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/export-png")
        .header("origin", "https://figures.example.com")
        .header("access-control-request-method", "POST")
        .body(Body::empty())
        .unwrap();
    let response = send(test_router(), request).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("access-control-allow-origin"), Some("*"));
}

#[tokio::test]
async fn test_cors_restricted_origin() {
    let router = test_router_with(
        RouterConfig::new().with_cors_origins(vec!["https://figures.example.com".to_string()]),
    );
    let request = Request::builder()
        .uri("/api/journal-rules")
        .header("origin", "https://figures.example.com")
        .body(Body::empty())
        .unwrap();
    let response = send(router, request).await;

    assert_eq!(
        response.header("access-control-allow-origin"),
        Some("https://figures.example.com")
    );
}
