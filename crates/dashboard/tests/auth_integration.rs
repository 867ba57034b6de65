//! Integration tests for admin authentication and public routes.

mod common;

use axum::http::StatusCode;
use common::{create_test_app, get_request, parse_response_body, seed_user_with_role, token_for};
use tower::ServiceExt;
use uuid::Uuid;

#[tokio::test]
async fn test_health_reports_memory_store() {
    let app = create_test_app();
    let response = app
        .router
        .oneshot(get_request("/api/health", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_response_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"]["backend"], "memory");
    assert_eq!(body["store"]["connected"], true);
}

#[tokio::test]
async fn test_health_unavailable_when_store_fails() {
    let app = create_test_app();
    app.memory.set_failing(true);
    let response = app
        .router
        .oneshot(get_request("/api/health/ready", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = create_test_app();
    let response = app
        .router
        .oneshot(get_request("/api/health/live", None))
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_spotify_authorize_url_is_public() {
    let app = create_test_app();
    let response = app
        .router
        .oneshot(get_request("/api/auth/spotify/authorize", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_response_body(response).await;
    let url = body["url"].as_str().unwrap();
    assert!(url.contains("provider=spotify"));
    assert!(url.contains("redirect_to="));
}

#[tokio::test]
async fn test_admin_route_without_token() {
    let app = create_test_app();
    let response = app
        .router
        .oneshot(get_request("/api/v1/admin/users", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_admin_route_with_garbage_token() {
    let app = create_test_app();
    let response = app
        .router
        .oneshot(get_request("/api/v1/admin/users", Some("not-a-jwt")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_regular_user_is_forbidden() {
    let app = create_test_app();
    let user_id = seed_user_with_role(&app.memory, "listener@example.com", "user");
    let response = app
        .router
        .oneshot(get_request("/api/v1/admin/users", Some(&token_for(user_id))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_token_for_user_without_role_is_forbidden() {
    let app = create_test_app();
    let response = app
        .router
        .oneshot(get_request(
            "/api/v1/admin/dashboard/stats",
            Some(&token_for(Uuid::new_v4())),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_session_returns_admin_role() {
    let app = create_test_app();
    let response = app
        .router
        .oneshot(get_request("/api/v1/admin/session", Some(&app.admin_token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_response_body(response).await;
    assert_eq!(body["user_id"], app.admin_id.to_string());
    assert_eq!(body["role"], "admin");
}
