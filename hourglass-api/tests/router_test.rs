/// Router tests that never reach the database
///
/// Authentication is rejected before any query runs, so these work against a
/// lazy pool pointing at an unreachable server.

mod common;

use axum::http::{header, Method, StatusCode};
use common::{body_json, offline_app, request};
use hourglass_shared::{auth::jwt::TokenType, models::user::UserRole};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

#[tokio::test]
async fn test_protected_route_requires_token() {
    let (app, _) = offline_app();

    let response = app
        .oneshot(request(Method::GET, "/api/timesheets", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Missing authorization header");
}

#[tokio::test]
async fn test_malformed_token_is_rejected() {
    let (app, _) = offline_app();

    let response = app
        .oneshot(request(Method::GET, "/api/reports/weekly", Some("not-a-jwt"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_token_cannot_authenticate() {
    let (app, config) = offline_app();
    let refresh = config
        .token_signer()
        .issue(Uuid::new_v4(), UserRole::Admin, TokenType::Refresh)
        .unwrap();

    let response = app
        .oneshot(request(Method::GET, "/api/auth/me", Some(&refresh), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_rejected() {
    let (app, _) = offline_app();
    let forged = hourglass_shared::auth::jwt::TokenSigner::new(
        "some-other-secret-that-is-32-bytes-long",
        chrono::Duration::hours(1),
        chrono::Duration::days(1),
    )
    .issue(Uuid::new_v4(), UserRole::Admin, TokenType::Access)
    .unwrap();

    let response = app
        .oneshot(request(Method::GET, "/api/users", Some(&forged), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_security_headers_on_error_responses() {
    let (app, _) = offline_app();

    let response = app
        .oneshot(request(Method::GET, "/api/projects", None, None))
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert!(headers.get(header::STRICT_TRANSPORT_SECURITY).is_none());
}

#[tokio::test]
async fn test_malformed_register_body_is_bad_request() {
    let (app, _) = offline_app();

    let response = app
        .oneshot(request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "email": "someone@example.com" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_unknown_api_path_is_not_found() {
    let (app, _) = offline_app();

    let response = app
        .oneshot(request(Method::GET, "/api/does-not-exist", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
