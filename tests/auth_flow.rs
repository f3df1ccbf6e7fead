//! End-to-end tests for the auth API surface.
//!
//! Each test drives the real router (user store + token service over a
//! throwaway SQLite file) with in-process requests; no server or fixtures
//! are required.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use payroll_backend::auth::models::{User, UserRole};
use payroll_backend::auth::{api, AuthState, TokenService, UserStore};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tower::ServiceExt;

const TEST_SECRET: &str = "test-secret-key-12345";

// Minimum bcrypt cost keeps the suite fast.
fn test_app() -> (Router, NamedTempFile) {
    let temp = NamedTempFile::new().unwrap();
    let store = Arc::new(UserStore::new(temp.path().to_str().unwrap(), 4).unwrap());
    let tokens = Arc::new(TokenService::new(TEST_SECRET.to_string(), 24));
    (api::router(AuthState::new(store, tokens)), temp)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn post_json(path: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_json_authed(path: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_authed(path: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(path)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

async fn signup(app: &Router, email: &str, password: &str, role: &str) -> Value {
    let (status, body) = send(
        app,
        post_json(
            "/api/auth/signup",
            json!({ "email": email, "password": password, "role": role }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

#[tokio::test]
async fn signup_then_login_then_verify_returns_the_same_account() {
    let (app, _db) = test_app();

    let body = signup(&app, "a@x.com", "pw123", "employee").await;
    assert_eq!(body["user"]["role"], "employee");
    assert!(body["user"].get("password_hash").is_none());
    assert!(body["token"].as_str().is_some());
    let signed_up_id = body["user"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        post_json("/api/auth/login", json!({ "email": "a@x.com", "password": "pw123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "employee");
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = send(&app, get_authed("/api/auth/verify", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"].as_str().unwrap(), signed_up_id);
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn verify_answers_post_as_well_as_get() {
    let (app, _db) = test_app();

    let body = signup(&app, "a@x.com", "pw123", "employee").await;
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        post_json_authed("/api/auth/verify", &token, json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "a@x.com");
}

#[tokio::test]
async fn login_failures_reveal_nothing_about_which_part_was_wrong() {
    let (app, _db) = test_app();

    signup(&app, "a@x.com", "pw123", "employee").await;

    let wrong_password = send(
        &app,
        post_json("/api/auth/login", json!({ "email": "a@x.com", "password": "nope" })),
    )
    .await;
    let unknown_email = send(
        &app,
        post_json(
            "/api/auth/login",
            json!({ "email": "unregistered@x.com", "password": "anything" }),
        ),
    )
    .await;

    assert_eq!(wrong_password.0, StatusCode::UNAUTHORIZED);
    // Identical status and identical body: no enumeration signal.
    assert_eq!(wrong_password, unknown_email);
}

#[tokio::test]
async fn duplicate_signup_conflicts_even_with_different_case() {
    let (app, _db) = test_app();

    signup(&app, "a@x.com", "pw123", "employee").await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/auth/signup",
            json!({ "email": "A@X.com", "password": "other" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn signup_role_defaults_to_employee() {
    let (app, _db) = test_app();

    let (status, body) = send(
        &app,
        post_json(
            "/api/auth/signup",
            json!({ "email": "b@x.com", "password": "pw123" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["role"], "employee");
}

#[tokio::test]
async fn protected_endpoints_reject_missing_tokens() {
    let (app, _db) = test_app();

    let request = Request::builder()
        .method("GET")
        .uri("/api/auth/verify")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authentication required");
}

#[tokio::test]
async fn tampered_token_is_rejected_and_the_handler_never_runs() {
    let (app, _db) = test_app();

    let body = signup(&app, "a@x.com", "pw123", "employee").await;
    let user_id = body["user"]["id"].as_str().unwrap().to_string();

    // Same claims, wrong secret: the signature check must fail.
    let forged = TokenService::new("wrong-secret".to_string(), 24)
        .issue(&test_user(&user_id, "a@x.com"))
        .unwrap();

    let (status, _) = send(
        &app,
        post_json_authed(
            "/api/auth/change-password",
            &forged,
            json!({ "oldPassword": "pw123", "newPassword": "stolen" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The stored hash is untouched: the original password still works.
    let (status, _) = send(
        &app,
        post_json("/api/auth/login", json!({ "email": "a@x.com", "password": "pw123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let (app, _db) = test_app();

    let body = signup(&app, "a@x.com", "pw123", "employee").await;
    let user_id = body["user"]["id"].as_str().unwrap().to_string();

    // Right secret, expiry already in the past.
    let expired = TokenService::new(TEST_SECRET.to_string(), -2)
        .issue(&test_user(&user_id, "a@x.com"))
        .unwrap();

    let (status, body) = send(&app, get_authed("/api/auth/verify", &expired)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authentication required");
}

#[tokio::test]
async fn change_password_fails_closed_on_a_wrong_old_password() {
    let (app, _db) = test_app();

    let body = signup(&app, "a@x.com", "pw123", "employee").await;
    let token = body["token"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        post_json_authed(
            "/api/auth/change-password",
            &token,
            json!({ "oldPassword": "wrong", "newPassword": "newpw" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Old password unchanged, new one never took effect.
    let (status, _) = send(
        &app,
        post_json("/api/auth/login", json!({ "email": "a@x.com", "password": "pw123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(
        &app,
        post_json("/api/auth/login", json!({ "email": "a@x.com", "password": "newpw" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn change_password_roundtrip() {
    let (app, _db) = test_app();

    let body = signup(&app, "a@x.com", "pw123", "employee").await;
    let token = body["token"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        post_json_authed(
            "/api/auth/change-password",
            &token,
            json!({ "oldPassword": "pw123", "newPassword": "newpw" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        post_json("/api/auth/login", json!({ "email": "a@x.com", "password": "newpw" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(
        &app,
        post_json("/api/auth/login", json!({ "email": "a@x.com", "password": "pw123" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn forgot_password_always_succeeds_for_well_formed_requests() {
    let (app, _db) = test_app();

    signup(&app, "a@x.com", "pw123", "employee").await;

    let known = send(
        &app,
        post_json("/api/auth/forgot-password", json!({ "email": "a@x.com" })),
    )
    .await;
    let unknown = send(
        &app,
        post_json(
            "/api/auth/forgot-password",
            json!({ "email": "unregistered@x.com" }),
        ),
    )
    .await;

    assert_eq!(known.0, StatusCode::OK);
    // Identical responses either way: no enumeration signal.
    assert_eq!(known, unknown);

    let (status, _) = send(&app, post_json("/api/auth/forgot-password", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_fields_are_validation_errors() {
    let (app, _db) = test_app();

    let (status, body) = send(&app, post_json("/api/auth/login", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().is_some());

    let (status, _) = send(
        &app,
        post_json("/api/auth/signup", json!({ "email": "a@x.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_json_is_a_400() {
    let (app, _db) = test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid JSON payload");
}

#[tokio::test]
async fn seeded_admin_can_log_in_on_a_fresh_store() {
    let (app, _db) = test_app();

    let (status, body) = send(
        &app,
        post_json(
            "/api/auth/login",
            json!({ "email": "admin@payroll.local", "password": "admin123" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "admin");
}

fn test_user(id: &str, email: &str) -> User {
    User {
        id: id.parse().unwrap(),
        email: email.to_string(),
        password_hash: String::new(),
        role: UserRole::Employee,
        created_at: chrono::Utc::now().to_rfc3339(),
        updated_at: chrono::Utc::now().to_rfc3339(),
    }
}
