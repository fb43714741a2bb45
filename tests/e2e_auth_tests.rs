mod common;

use axum::http::StatusCode;
use common::{TestApp, DJ_HANDLE, DJ_PASSWORD};
use serde_json::json;

#[tokio::test]
async fn login_with_wrong_password_is_forbidden() {
    let app = TestApp::new();
    let (status, _) = app
        .post(
            "/v1/auth/login",
            None,
            json!({"handle": DJ_HANDLE, "password": "nope"}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn login_with_unknown_handle_is_forbidden() {
    let app = TestApp::new();
    let (status, _) = app
        .post(
            "/v1/auth/login",
            None,
            json!({"handle": "ghost", "password": DJ_PASSWORD}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn login_returns_token_and_session_cookie() {
    let app = TestApp::new();
    let (status, _) = app.get("/v1/albums", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let token = app.dj_token().await;
    assert_eq!(token.len(), 64);

    let (status, body) = app.get("/v1/albums", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["albums"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn login_sets_cookie_header() {
    let app = TestApp::new();
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/v1/auth/login")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(
            json!({"handle": DJ_HANDLE, "password": DJ_PASSWORD}).to_string(),
        ))
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.app.clone(), request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let cookie = response
        .headers()
        .get("set-cookie")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(cookie.starts_with("session_token="));
    assert!(cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn logout_invalidates_the_token() {
    let app = TestApp::new();
    let token = app.dj_token().await;

    let (status, _) = app.get("/v1/auth/logout", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get("/v1/albums", Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
