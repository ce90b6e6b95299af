//! HTTP 层测试：认证、权限、组织隔离与响应格式

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::config::AppConfig;
use common::models::{NewUser, SystemRole};

use crate::create_router;
use crate::state::AppState;
use crate::store;

const ADMIN: &str = "tok-admin-org1";
const DBADMIN: &str = "tok-dbadmin-org1";
const VIEWER: &str = "tok-user-org1";
const OTHER_ADMIN: &str = "tok-admin-org2";

async fn setup_app() -> Router {
    let config = AppConfig {
        service_name: crate::SERVICE_NAME.to_string(),
        database_url: "sqlite::memory:".to_string(),
        ..Default::default()
    };
    let stores = store::connect(&config).await.unwrap();
    for (token, org_id, role) in [
        (ADMIN, 1, SystemRole::Admin),
        (DBADMIN, 1, SystemRole::DbAdmin),
        (VIEWER, 1, SystemRole::User),
        (OTHER_ADMIN, 2, SystemRole::Admin),
    ] {
        stores
            .users
            .insert_user(&NewUser {
                name: token.to_string(),
                email: format!("{token}@example.com"),
                org_id,
                system_role: role,
                api_token: token.to_string(),
            })
            .await
            .unwrap();
    }
    create_router(AppState::new(config, stores))
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn new_database_body() -> Value {
    json!({
        "jdbcUrl": "jdbc:postgresql://pg:5432/analytics",
        "userName": "analyst",
        "password": "s3cret",
        "type": "postgres",
        "orgId": 2
    })
}

async fn create(app: &Router, token: &str) -> i64 {
    let (status, body) = call(app, "POST", "/databases", Some(token), Some(new_database_body())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["data"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_requests_without_token_are_unauthorized() {
    let app = setup_app().await;

    let (status, body) = call(&app, "GET", "/databases", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = call(&app, "GET", "/databases", Some("bogus"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_returns_record_in_caller_org() {
    let app = setup_app().await;

    let (status, body) = call(&app, "POST", "/databases", Some(DBADMIN), Some(new_database_body())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["orgId"], 1);
    assert_eq!(body["data"]["userName"], "analyst");
    assert_eq!(body["data"]["type"], "postgres");
    assert!(body["data"].get("password").is_none());
    assert_eq!(body["meta"]["service"], crate::SERVICE_NAME);
    assert!(body["meta"]["request_id"].is_string());
}

#[tokio::test]
async fn test_list_and_get_are_org_scoped() {
    let app = setup_app().await;
    let id = create(&app, ADMIN).await;

    let (status, body) = call(&app, "GET", "/databases", Some(VIEWER), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = call(&app, "GET", "/databases", Some(OTHER_ADMIN), None).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let uri = format!("/databases/{id}");
    let (status, body) = call(&app, "GET", &uri, Some(VIEWER), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], id);

    let (status, body) = call(&app, "GET", &uri, Some(OTHER_ADMIN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn test_update_preserves_unset_fields() {
    let app = setup_app().await;
    let id = create(&app, ADMIN).await;
    let uri = format!("/databases/{id}");

    let (status, body) = call(
        &app,
        "PUT",
        &uri,
        Some(DBADMIN),
        Some(json!({ "userName": "reporter", "jdbcUrl": null })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["userName"], "reporter");
    assert_eq!(body["data"]["jdbcUrl"], "jdbc:postgresql://pg:5432/analytics");
    assert_eq!(body["data"]["type"], "postgres");

    let (_, body) = call(&app, "GET", &uri, Some(VIEWER), None).await;
    assert_eq!(body["data"]["userName"], "reporter");
}

#[tokio::test]
async fn test_update_missing_or_foreign_is_not_found() {
    let app = setup_app().await;
    let id = create(&app, ADMIN).await;

    let (status, body) = call(&app, "PUT", "/databases/4242", Some(ADMIN), Some(json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "DATABASE_NOT_FOUND");

    let uri = format!("/databases/{id}");
    let (status, _) = call(&app, "PUT", &uri, Some(OTHER_ADMIN), Some(json!({ "userName": "x" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_always_acknowledges() {
    let app = setup_app().await;
    let id = create(&app, ADMIN).await;
    let uri = format!("/databases/{id}");

    let (status, body) = call(&app, "DELETE", &uri, Some(OTHER_ADMIN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["message"], format!("Database '{id}' deleted"));
    let (_, body) = call(&app, "GET", &uri, Some(ADMIN), None).await;
    assert_eq!(body["data"]["id"], id);

    let (status, _) = call(&app, "DELETE", &uri, Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = call(&app, "GET", &uri, Some(ADMIN), None).await;
    assert!(body["data"].is_null());

    let (status, _) = call(&app, "DELETE", "/databases/777", Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_viewers_cannot_write() {
    let app = setup_app().await;
    let id = create(&app, ADMIN).await;
    let uri = format!("/databases/{id}");

    let (status, body) = call(&app, "POST", "/databases", Some(VIEWER), Some(new_database_body())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let (status, _) = call(&app, "PUT", &uri, Some(VIEWER), Some(json!({ "password": "x" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&app, "DELETE", &uri, Some(VIEWER), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_viewer_role_is_checked_before_body() {
    let app = setup_app().await;

    let mut body = new_database_body();
    body["type"] = json!("db2");
    let (status, response) = call(&app, "POST", "/databases", Some(VIEWER), Some(body)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(response["error"]["code"], "FORBIDDEN");

    let (status, response) = call(&app, "PUT", "/databases/1", Some(VIEWER), Some(json!({ "type": 5 }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(response["error"]["code"], "FORBIDDEN");

    let (status, _) = call(&app, "DELETE", "/databases/not-a-number", Some(VIEWER), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_invalid_bodies_are_rejected() {
    let app = setup_app().await;

    let mut body = new_database_body();
    body["jdbcUrl"] = json!("postgres://pg/analytics");
    let (status, response) = call(&app, "POST", "/databases", Some(ADMIN), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"]["code"], "VALIDATION_ERROR");
    assert!(response["error"]["details"].is_object());

    let mut body = new_database_body();
    body["type"] = json!("db2");
    let (status, response) = call(&app, "POST", "/databases", Some(ADMIN), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = call(&app, "GET", "/databases/not-a-number", Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_and_openapi_are_public() {
    let app = setup_app().await;

    let (status, body) = call(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"], true);

    let (status, body) = call(&app, "GET", "/api-docs/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"].get("/databases/{id}").is_some());
    assert!(body["components"]["securitySchemes"].get("bearer").is_some());

    let item = &body["components"]["schemas"]["DatabaseItem"]["properties"];
    assert!(item.get("jdbcUrl").is_some());
    assert!(item.get("password").is_none());
}
