mod common;

use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use common::{DbFactory, DbTestApp, Factory, TestApp};

fn webapp_payload(name: &str) -> serde_json::Value {
    json!({
        "name": name,
        "region": "eu-central-1",
        "plan": "pro",
        "framework": "nextjs",
        "repository": {
            "provider": "github",
            "owner": "acme",
            "repo": "storefront",
            "branch": "main"
        },
        "port": 3000,
        "env_vars": [
            { "key": "NODE_ENV", "value": "production" },
            { "key": "API_TOKEN", "value": "s3cr3t" }
        ]
    })
}

#[tokio::test]
async fn test_create_webapp_unsupported_region() {
    let app = TestApp::new().await;
    let auth = Factory::new(&app).user();
    let mut payload = webapp_payload("storefront");
    payload["region"] = json!("sa-east-1");

    let response = app
        .server
        .post("/api/webapps")
        .add_header("Authorization", auth.auth_header())
        .json(&payload)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);

    let body: serde_json::Value = response.json();
    assert_eq!(body["details"], "Unsupported region: sa-east-1");
}

#[tokio::test]
async fn test_create_webapp_unsupported_plan() {
    let app = TestApp::new().await;
    let auth = Factory::new(&app).user();
    let mut payload = webapp_payload("storefront");
    payload["plan"] = json!("enterprise");

    let response = app
        .server
        .post("/api/webapps")
        .add_header("Authorization", auth.auth_header())
        .json(&payload)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_webapp_privileged_port() {
    let app = TestApp::new().await;
    let auth = Factory::new(&app).user();
    let mut payload = webapp_payload("storefront");
    payload["port"] = json!(80);

    let response = app
        .server
        .post("/api/webapps")
        .add_header("Authorization", auth.auth_header())
        .json(&payload)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);

    let body: serde_json::Value = response.json();
    assert_eq!(body["details"], "Port must be between 1024 and 65535");
}

#[tokio::test]
async fn test_create_webapp_wrong_field_type() {
    let app = TestApp::new().await;
    let auth = Factory::new(&app).user();
    let mut payload = webapp_payload("storefront");
    payload["port"] = json!("3000");

    let response = app
        .server
        .post("/api/webapps")
        .add_header("Authorization", auth.auth_header())
        .json(&payload)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);

    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "Validation error");
}

#[tokio::test]
async fn test_create_webapp_unauthorized() {
    let app = TestApp::new().await;

    let response = app
        .server
        .post("/api/webapps")
        .json(&webapp_payload("storefront"))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database (DATABASE_URL)"]
async fn test_create_webapp_success() {
    let app = DbTestApp::new().await;
    let auth = DbFactory::new(&app.state).create_user().await;

    let response = app
        .server
        .post("/api/webapps")
        .add_header("Authorization", auth.auth_header())
        .json(&webapp_payload("storefront"))
        .await;

    response.assert_status(StatusCode::CREATED);

    let body: serde_json::Value = response.json();
    assert!(body["web_app_id"].as_str().is_some());
    assert!(body["deployment_id"].as_str().is_some());
    assert_eq!(body["status"], "pending");
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database (DATABASE_URL)"]
async fn test_create_webapp_duplicate_name() {
    let app = DbTestApp::new().await;
    let auth = DbFactory::new(&app.state).create_user().await;
    let name = format!("app-{}", Uuid::new_v4());

    app.server
        .post("/api/webapps")
        .add_header("Authorization", auth.auth_header())
        .json(&webapp_payload(&name))
        .await
        .assert_status(StatusCode::CREATED);

    let response = app
        .server
        .post("/api/webapps")
        .add_header("Authorization", auth.auth_header())
        .json(&webapp_payload(&name))
        .await;

    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database (DATABASE_URL)"]
async fn test_list_webapps_only_own() {
    let app = DbTestApp::new().await;
    let factory = DbFactory::new(&app.state);
    let auth = factory.create_user().await;
    let other = factory.create_user().await;

    factory.create_web_app(auth.user_id).await;
    factory.create_web_app(auth.user_id).await;
    factory.create_web_app(other.user_id).await;

    let response = app
        .server
        .get("/api/webapps")
        .add_header("Authorization", auth.auth_header())
        .await;

    response.assert_status(StatusCode::OK);

    let body: serde_json::Value = response.json();
    assert_eq!(body["total"], 2);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database (DATABASE_URL)"]
async fn test_get_webapp_detail_hides_env_values() {
    let app = DbTestApp::new().await;
    let auth = DbFactory::new(&app.state).create_user().await;

    let response = app
        .server
        .post("/api/webapps")
        .add_header("Authorization", auth.auth_header())
        .json(&webapp_payload(&format!("app-{}", Uuid::new_v4())))
        .await;
    let created: serde_json::Value = response.json();
    let web_app_id = created["web_app_id"].as_str().unwrap();

    let response = app
        .server
        .get(&format!("/api/webapps/{}", web_app_id))
        .add_header("Authorization", auth.auth_header())
        .await;

    response.assert_status(StatusCode::OK);

    let body: serde_json::Value = response.json();
    assert_eq!(body["plan"], "pro");
    let environment = &body["environments"][0];
    assert_eq!(environment["name"], "production");
    assert_eq!(environment["instance"]["instance_type"], "t3.medium");
    assert_eq!(environment["instance"]["status"], "pending");
    assert_eq!(environment["deployments"][0]["status"], "pending");

    let keys = environment["env_var_keys"].as_array().unwrap();
    assert_eq!(keys.len(), 2);
    assert!(!body.to_string().contains("s3cr3t"));
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database (DATABASE_URL)"]
async fn test_get_other_users_webapp_not_found() {
    let app = DbTestApp::new().await;
    let factory = DbFactory::new(&app.state);
    let owner = factory.create_user().await;
    let stranger = factory.create_user().await;
    let created = factory.create_web_app(owner.user_id).await;

    let response = app
        .server
        .get(&format!("/api/webapps/{}", created.web_app_id))
        .add_header("Authorization", stranger.auth_header())
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database (DATABASE_URL)"]
async fn test_create_then_deploy() {
    let app = DbTestApp::new().await;
    let factory = DbFactory::new(&app.state);
    let auth = factory.create_user().await;
    let created = factory.create_web_app(auth.user_id).await;

    let response = app
        .server
        .post(&format!("/api/deployments/{}/start", created.deployment_id))
        .add_header("Authorization", auth.auth_header())
        .await;

    response.assert_status(StatusCode::OK);

    let response = app
        .server
        .get(&format!("/api/webapps/{}", created.web_app_id))
        .add_header("Authorization", auth.auth_header())
        .await;

    let body: serde_json::Value = response.json();
    let environment = &body["environments"][0];
    assert_eq!(environment["instance"]["status"], "active");
    assert_eq!(environment["instance"]["public_ip"], "203.0.113.10");
    assert_eq!(environment["deployments"][0]["status"], "active");
}
