//! End-to-end tests over the real router: bearer authentication, response
//! envelopes, validation rejections and the audit trail.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;

use auth_backend::audit::AuditLogger;
use auth_backend::config::Settings;
use auth_backend::crypto::FieldCipher;
use auth_backend::database::{self, AuthStore, Tables};
use auth_backend::handlers::{self, AppState};

const TENANT: &str = "550e8400-e29b-41d4-a716-446655440000";
const OTHER_TENANT: &str = "6ba7b810-9dad-41d1-80b4-00c04fd430c8";

fn test_settings(dir: &TempDir) -> Settings {
    Settings {
        database_url: format!("sqlite://{}?mode=rwc", dir.path().join("auth.db").display()),
        database_schema: None,
        max_connections: 5,
        jwt_secret: "integration-test-secret".into(),
        encryption_key: "integration-test-key".into(),
        enable_encryption: true,
        enable_audit_logging: true,
        server_host: "127.0.0.1".into(),
        server_port: 0,
        request_timeout: Duration::from_secs(30),
    }
}

async fn test_app() -> (Router, SqlitePool, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let settings = test_settings(&dir);

    let pool = database::init_database(&settings).await.unwrap();
    let tables = Tables::new(None);
    let cipher = FieldCipher::new(settings.enable_encryption, &settings.encryption_key);
    let store = AuthStore::new(pool.clone(), tables.clone(), cipher);
    let audit = AuditLogger::new(pool.clone(), tables.audit_log.clone(), true);

    let state = Arc::new(AppState {
        settings,
        store,
        audit,
    });
    (handlers::router(state), pool, dir)
}

async fn call(app: &Router, method: &str, path: &str, token: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let response = app
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn call_ok(app: &Router, method: &str, path: &str) -> Value {
    let (status, body) = call(app, method, path, Some(TENANT)).await;
    assert_eq!(status, StatusCode::OK, "unexpected status for {method} {path}: {body}");
    assert_eq!(body["success"], true);
    body["data"].clone()
}

#[tokio::test]
async fn ping_answers_pong() {
    let (app, _pool, _dir) = test_app().await;
    let (status, body) = call(&app, "GET", "/ping", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "PONG");
}

#[tokio::test]
async fn health_reports_pool_telemetry() {
    let (app, _pool, _dir) = test_app().await;
    let (status, body) = call(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    let db = &body["database"];
    assert_eq!(db["pool_size"], 5);
    for key in ["checked_out", "available", "overflow", "total_connections"] {
        assert!(db[key].is_u64(), "missing {key}");
    }
}

#[tokio::test]
async fn openapi_document_is_served() {
    let (app, _pool, _dir) = test_app().await;
    let (status, body) = call(&app, "GET", "/api-docs/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/role/{role}"].is_object());
}

// S1: create, list, create again.
#[tokio::test]
async fn role_creation_is_idempotent_over_http() {
    let (app, _pool, _dir) = test_app().await;

    let data = call_ok(&app, "POST", "/api/role/admin").await;
    assert_eq!(data["result"], true);

    let data = call_ok(&app, "GET", "/api/roles").await;
    let roles = data["result"].as_array().unwrap();
    assert!(roles.iter().any(|r| r["role"] == "admin"));

    let data = call_ok(&app, "POST", "/api/role/admin").await;
    assert_eq!(data["result"], true);
}

// S2 + S3: the documented admin/user fixture.
#[tokio::test]
async fn composite_checks_and_reverse_lookup() {
    let (app, _pool, _dir) = test_app().await;

    call_ok(&app, "POST", "/api/role/admin").await;
    call_ok(&app, "POST", "/api/role/user").await;
    call_ok(&app, "POST", "/api/permission/admin/read").await;
    call_ok(&app, "POST", "/api/permission/user/read").await;
    call_ok(&app, "POST", "/api/membership/john/admin").await;
    call_ok(&app, "POST", "/api/membership/jane/user").await;

    let data = call_ok(&app, "GET", "/api/which_users_can/read").await;
    let users = data.as_array().unwrap();
    assert!(users.iter().any(|m| m["user"] == "john" && m["role"] == "admin"));
    assert!(users.iter().any(|m| m["user"] == "jane" && m["role"] == "user"));

    let data = call_ok(&app, "GET", "/api/has_permission/john/read").await;
    assert_eq!(data["has_permission"], true);
    let data = call_ok(&app, "GET", "/api/has_permission/jane/write").await;
    assert_eq!(data["has_permission"], false);

    let data = call_ok(&app, "GET", "/api/user_permissions/john").await;
    assert_eq!(data["count"], 1);
    assert_eq!(data["permissions"][0]["name"], "read");

    let data = call_ok(&app, "GET", "/api/role_permissions/admin").await;
    assert_eq!(data[0]["name"], "read");

    let data = call_ok(&app, "GET", "/api/which_roles_can/read").await;
    let roles = data.as_array().unwrap();
    assert_eq!(roles.len(), 2);

    let data = call_ok(&app, "GET", "/api/user_roles/john").await;
    assert_eq!(data[0]["role"], "admin");

    let data = call_ok(&app, "GET", "/api/members/admin").await;
    assert_eq!(data[0]["user"], "john");
}

// S4: revocation takes effect immediately.
#[tokio::test]
async fn membership_revocation_revokes_the_permission() {
    let (app, _pool, _dir) = test_app().await;

    call_ok(&app, "POST", "/api/role/admin").await;
    call_ok(&app, "POST", "/api/permission/admin/read").await;
    call_ok(&app, "POST", "/api/membership/john/admin").await;

    let data = call_ok(&app, "GET", "/api/has_permission/john/read").await;
    assert_eq!(data["has_permission"], true);

    let data = call_ok(&app, "DELETE", "/api/membership/john/admin").await;
    assert_eq!(data["result"], true);

    let data = call_ok(&app, "GET", "/api/has_permission/john/read").await;
    assert_eq!(data["has_permission"], false);
}

// S5: malformed bearer tokens.
#[tokio::test]
async fn credential_failures_map_to_400_and_401() {
    let (app, _pool, _dir) = test_app().await;

    let (status, body) = call(&app, "POST", "/api/role/admin", Some("not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], 400);

    let (status, body) = call(&app, "POST", "/api/role/admin", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 401);
}

// S6: traversal-shaped names never reach the engine.
#[tokio::test]
async fn validator_rejects_traversal_names() {
    let (app, pool, _dir) = test_app().await;

    // Encoded form so the path stays a single segment.
    let (status, _body) = call(&app, "POST", "/api/role/..%2Fetc%2Fpasswd", Some(TENANT)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _body) = call(&app, "GET", "/api/has_permission/jo%20hn/read", Some(TENANT)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM auth_role")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

// S7: concurrent creates converge on a single row.
#[tokio::test]
async fn concurrent_role_creates_agree() {
    let (app, pool, _dir) = test_app().await;

    let (first, second) = tokio::join!(
        call(&app, "POST", "/api/role/admin", Some(TENANT)),
        call(&app, "POST", "/api/role/admin", Some(TENANT)),
    );
    assert_eq!(first.0, StatusCode::OK);
    assert_eq!(second.0, StatusCode::OK);
    assert_eq!(first.1["data"]["result"], true);
    assert_eq!(second.1["data"]["result"], true);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM auth_role WHERE role = 'admin'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn precondition_failures_are_results_not_errors() {
    let (app, _pool, _dir) = test_app().await;

    // Granting to a role that does not exist: HTTP 200, result false.
    let data = call_ok(&app, "POST", "/api/permission/ghost/read").await;
    assert_eq!(data["result"], false);
    let data = call_ok(&app, "POST", "/api/membership/john/ghost").await;
    assert_eq!(data["result"], false);
}

#[tokio::test]
async fn tenants_do_not_see_each_other_over_http() {
    let (app, _pool, _dir) = test_app().await;

    call_ok(&app, "POST", "/api/role/admin").await;
    call_ok(&app, "POST", "/api/permission/admin/read").await;
    call_ok(&app, "POST", "/api/membership/john/admin").await;

    let (status, body) = call(&app, "GET", "/api/roles", Some(OTHER_TENANT)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["result"].as_array().unwrap().len(), 0);

    let (_, body) = call(&app, "GET", "/api/has_permission/john/read", Some(OTHER_TENANT)).await;
    assert_eq!(body["data"]["has_permission"], false);
}

#[tokio::test]
async fn workflow_routes_alias_the_engine() {
    let (app, _pool, _dir) = test_app().await;

    call_ok(&app, "POST", "/api/role/operators").await;
    call_ok(&app, "POST", "/api/permission/operators/nightly-sync").await;
    call_ok(&app, "POST", "/api/membership/john/operators").await;

    let data = call_ok(&app, "GET", "/api/workflow/users/nightly-sync").await;
    assert_eq!(data["count"], 1);
    assert_eq!(data["members"][0]["user"], "john");

    let data = call_ok(&app, "GET", "/api/workflow/user/john/can_run/nightly-sync").await;
    assert_eq!(data["has_permission"], true);
    let data = call_ok(&app, "GET", "/api/workflow/user/jane/can_run/nightly-sync").await;
    assert_eq!(data["has_permission"], false);
}

#[tokio::test]
async fn every_privileged_call_leaves_one_audit_row() {
    let (app, pool, _dir) = test_app().await;

    call_ok(&app, "POST", "/api/role/admin").await;
    call_ok(&app, "GET", "/api/roles").await;
    let before: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM audit_log")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(before, 2);

    // Failed requests are audited too.
    let (status, _) = call(&app, "POST", "/api/role/admin", Some("not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let rows: Vec<(String, i64)> =
        sqlx::query_as("SELECT action, success FROM audit_log ORDER BY id")
            .fetch_all(&pool)
            .await
            .unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0], ("CREATE_ROLE".to_string(), 1));
    assert_eq!(rows[1], ("LIST_ROLES".to_string(), 1));
    assert_eq!(rows[2], ("CREATE_ROLE".to_string(), 0));

    // Attribution: the presented credential is recorded even when rejected.
    let client_ids: Vec<String> = sqlx::query_scalar("SELECT client_id FROM audit_log ORDER BY id")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(client_ids[0], TENANT);
    assert_eq!(client_ids[2], "not-a-uuid");
}
