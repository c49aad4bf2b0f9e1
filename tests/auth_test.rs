mod common;

use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use common::{DbFactory, DbTestApp, Factory, TestApp};

#[tokio::test]
#[ignore = "requires a PostgreSQL database (DATABASE_URL)"]
async fn test_register_success() {
    let app = DbTestApp::new().await;
    let unique_id = Uuid::new_v4();

    let response = app
        .server
        .post("/api/auth/register")
        .json(&json!({
            "email": format!("Test-{}@Example.com", unique_id),
            "password": "password123",
            "name": "Test User"
        }))
        .await;

    response.assert_status(StatusCode::CREATED);

    let body: serde_json::Value = response.json();
    assert!(body["token"].as_str().is_some());
    assert!(body["user"]["id"].as_str().is_some());
    assert_eq!(
        body["user"]["email"].as_str().unwrap(),
        format!("test-{}@example.com", unique_id)
    );
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database (DATABASE_URL)"]
async fn test_register_duplicate_email() {
    let app = DbTestApp::new().await;
    let auth = DbFactory::new(&app.state).create_user().await;

    let response = app
        .server
        .post("/api/auth/register")
        .json(&json!({
            "email": auth.email,
            "password": "password123",
            "name": "Another User"
        }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_invalid_email() {
    let app = TestApp::new().await;

    let response = app
        .server
        .post("/api/auth/register")
        .json(&json!({
            "email": "not-an-email",
            "password": "password123",
            "name": "Test User"
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_short_password() {
    let app = TestApp::new().await;

    let response = app
        .server
        .post("/api/auth/register")
        .json(&json!({
            "email": "short@example.com",
            "password": "short",
            "name": "Test User"
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);

    let body: serde_json::Value = response.json();
    assert_eq!(body["details"], "Password must be at least 8 characters");
}

#[tokio::test]
async fn test_register_blank_name() {
    let app = TestApp::new().await;

    let response = app
        .server
        .post("/api/auth/register")
        .json(&json!({
            "email": "blank@example.com",
            "password": "password123",
            "name": "   "
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database (DATABASE_URL)"]
async fn test_login_success() {
    let app = DbTestApp::new().await;
    let email = format!("login-{}@example.com", Uuid::new_v4());
    DbFactory::new(&app.state)
        .create_user_with_email(&email, "password123")
        .await;

    let response = app
        .server
        .post("/api/auth/login")
        .json(&json!({
            "email": email,
            "password": "password123"
        }))
        .await;

    response.assert_status(StatusCode::OK);

    let body: serde_json::Value = response.json();
    assert!(body["token"].as_str().is_some());
    assert_eq!(body["user"]["email"], email);
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database (DATABASE_URL)"]
async fn test_login_wrong_password() {
    let app = DbTestApp::new().await;
    let email = format!("login-{}@example.com", Uuid::new_v4());
    DbFactory::new(&app.state)
        .create_user_with_email(&email, "password123")
        .await;

    let response = app
        .server
        .post("/api/auth/login")
        .json(&json!({
            "email": email,
            "password": "wrong-password"
        }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database (DATABASE_URL)"]
async fn test_me() {
    let app = DbTestApp::new().await;
    let auth = DbFactory::new(&app.state).create_user().await;

    let response = app
        .server
        .get("/api/auth/me")
        .add_header("Authorization", auth.auth_header())
        .await;

    response.assert_status(StatusCode::OK);

    let body: serde_json::Value = response.json();
    assert_eq!(body["id"].as_str().unwrap(), auth.user_id.to_string());
    assert_eq!(body["email"], auth.email);
}

#[tokio::test]
async fn test_me_without_token() {
    let app = TestApp::new().await;

    let response = app.server.get("/api/auth/me").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_with_token_signed_by_other_secret() {
    let app = TestApp::new().await;
    let auth = Factory::new(&app).user();

    let mut other_config = common::test_config();
    other_config.jwt_secret = "a-different-secret-that-is-also-32-characters".to_string();
    let other = TestApp::with_config(other_config).await;

    let response = other
        .server
        .get("/api/auth/me")
        .add_header("Authorization", auth.auth_header())
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}
