//! Router 経由の認証フロー結合テスト（インメモリストア使用）

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use finanzly::{
    config::SessionSettings,
    repositories::{MemoryStore, Repositories},
    routes::create_router,
    services::{DeliveryResult, EmailSender, PasswordHasher, TokenSigner},
    state::AppState,
};

/// 何も送らないメーラー
struct NoopMailer;

#[async_trait]
impl EmailSender for NoopMailer {
    async fn send_password_reset(
        &self,
        _to: &str,
        _reset_url: &str,
        _token: &str,
    ) -> DeliveryResult {
        DeliveryResult { success: true }
    }
}

fn app() -> Router {
    let settings = SessionSettings::default();
    let signer = TokenSigner::new(
        b"integration-secret",
        settings.access_token_ttl,
        settings.refresh_token_ttl,
    );
    let state = AppState::new(
        Repositories::in_memory(MemoryStore::new()),
        PasswordHasher::new(4),
        signer,
        Arc::new(NoopMailer),
        settings,
    );
    create_router(state)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .map(|value| value.to_str().unwrap().to_string());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, set_cookie, body)
}

/// `Set-Cookie` から `name=value` 部分を取り出す
fn cookie_pair(set_cookie: &str) -> String {
    set_cookie.split(';').next().unwrap().trim().to_string()
}

async fn register(app: &Router) {
    let (status, _, body) = send(
        app,
        post_json(
            "/api/v1/auth/register",
            json!({"name": "Ana", "email": "a@b.com", "password": "Secret123"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["email"], "a@b.com");
    assert!(body["data"].get("password_hash").is_none());
}

async fn login(app: &Router, password: &str) -> (StatusCode, Option<String>, Value) {
    send(
        app,
        post_json(
            "/api/v1/auth/login",
            json!({"email": "a@b.com", "password": password}),
        ),
    )
    .await
}

#[tokio::test]
async fn health_check_reports_ok() {
    let app = app();
    let request = Request::builder()
        .uri("/api/health")
        .body(Body::empty())
        .unwrap();

    let (status, _, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn login_sets_refresh_cookie_and_rotation_rejects_old_token() {
    let app = app();
    register(&app).await;

    let (status, set_cookie, body) = login(&app, "Secret123").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["token_type"], "bearer");
    assert_eq!(body["data"]["user"]["name"], "Ana");

    let set_cookie = set_cookie.unwrap();
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("Path=/api/v1/auth"));
    let first = cookie_pair(&set_cookie);

    let (status, rotated, body) =
        send(&app, post_with_cookie("/api/v1/auth/refresh", &first)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["access_token"].as_str().is_some());
    let second = cookie_pair(&rotated.unwrap());
    assert_ne!(first, second);

    // ローテーション済みの古いトークンは拒否される
    let (status, _, body) = send(&app, post_with_cookie("/api/v1/auth/refresh", &first)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "error");

    // 新しいトークンは使える
    let (status, _, _) = send(&app, post_with_cookie("/api/v1/auth/refresh", &second)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn refresh_without_cookie_is_unauthorized() {
    let app = app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/refresh")
        .body(Body::empty())
        .unwrap();

    let (status, _, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn login_with_wrong_password_is_bad_request() {
    let app = app();
    register(&app).await;

    let (status, set_cookie, _) = login(&app, "wrong-password").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(set_cookie.is_none());
}

#[tokio::test]
async fn duplicate_registration_is_conflict() {
    let app = app();
    register(&app).await;

    let (status, _, _) = send(
        &app,
        post_json(
            "/api/v1/auth/register",
            json!({"name": "Other", "email": "a@b.com", "password": "Secret123"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn me_and_sessions_require_bearer_token() {
    let app = app();
    register(&app).await;
    let (_, _, body) = login(&app, "Secret123").await;
    let access_token = body["data"]["access_token"].as_str().unwrap().to_string();

    let request = Request::builder()
        .uri("/api/v1/auth/me")
        .header(header::AUTHORIZATION, format!("Bearer {access_token}"))
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "a@b.com");

    let request = Request::builder()
        .uri("/api/v1/auth/sessions")
        .header(header::AUTHORIZATION, format!("Bearer {access_token}"))
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let request = Request::builder()
        .uri("/api/v1/auth/me")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_revokes_refresh_token() {
    let app = app();
    register(&app).await;
    let (_, set_cookie, _) = login(&app, "Secret123").await;
    let cookie = cookie_pair(&set_cookie.unwrap());

    let (status, cleared, _) = send(&app, post_with_cookie("/api/v1/auth/logout", &cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(cleared.unwrap().starts_with("refreshToken="));

    let (status, _, _) = send(&app, post_with_cookie("/api/v1/auth/refresh", &cookie)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn forgot_then_reset_password_allows_login_with_new_password() {
    let app = app();
    register(&app).await;

    let (status, _, body) = send(
        &app,
        post_json("/api/v1/auth/forgot-password", json!({"email": "a@b.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["token"].as_str().unwrap().to_string();
    assert_eq!(token.len(), 64);
    assert!(
        body["data"]["resetUrl"]
            .as_str()
            .unwrap()
            .ends_with(&format!("/reset-password?token={token}"))
    );

    let (status, _, _) = send(
        &app,
        post_json(
            "/api/v1/auth/reset-password",
            json!({
                "token": token,
                "newPassword": "NewSecret123",
                "confirmPassword": "NewSecret123"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = login(&app, "Secret123").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _, _) = login(&app, "NewSecret123").await;
    assert_eq!(status, StatusCode::CREATED);

    // 使用済みトークンは再利用できない
    let (status, _, _) = send(
        &app,
        post_json(
            "/api/v1/auth/reset-password",
            json!({"token": token, "newPassword": "Another123", "confirmPassword": "Another123"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reset_password_with_unknown_token_is_bad_request() {
    let app = app();

    let (status, _, body) = send(
        &app,
        post_json(
            "/api/v1/auth/reset-password",
            json!({
                "token": "no-such-token",
                "newPassword": "NewSecret123",
                "confirmPassword": "NewSecret123"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn logout_all_revokes_every_session() {
    let app = app();
    register(&app).await;
    let (_, first_cookie, body) = login(&app, "Secret123").await;
    let access_token = body["data"]["access_token"].as_str().unwrap().to_string();
    let (_, second_cookie, _) = login(&app, "Secret123").await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/logout-all")
        .header(header::AUTHORIZATION, format!("Bearer {access_token}"))
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["revoked"], 2);

    for cookie in [first_cookie, second_cookie] {
        let cookie = cookie_pair(&cookie.unwrap());
        let (status, _, _) = send(&app, post_with_cookie("/api/v1/auth/refresh", &cookie)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
