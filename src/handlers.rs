//! # HTTP Handlers Module
//!
//! The request boundary of the authorization service. Every handler walks
//! the same pipeline:
//!
//! 1. Extract `Authorization: Bearer <tenant-key>`; missing or malformed
//!    headers are `401`, a token that is not a canonical UUIDv4 is `400`.
//! 2. Validate the path parameters against the documented patterns; `400`
//!    on failure, before anything reaches the engine.
//! 3. Run the engine operation under the request-scoped deadline.
//! 4. Emit exactly one audit record, success or failure.
//! 5. Shape the outcome into the uniform JSON envelope.
//!
//! ## API Overview
//!
//! ### Health
//! - `GET /ping` - liveness
//! - `GET /health` - connection pool telemetry
//! - `GET /api-docs/openapi.json` - generated OpenAPI document
//!
//! ### Roles
//! - `POST /api/role/{role}` / `DELETE /api/role/{role}` - create / soft-delete
//! - `GET /api/roles` - list the tenant's roles
//!
//! ### Permissions
//! - `POST|GET|DELETE /api/permission/{role}/{name}` - grant / check / revoke
//! - `GET /api/role_permissions/{role}` - permissions of a role
//! - `GET /api/which_roles_can/{name}` - reverse lookup over roles
//!
//! ### Memberships
//! - `POST|GET|DELETE /api/membership/{user}/{role}` - grant / check / revoke
//! - `GET /api/user_roles/{user}` / `GET /api/members/{role}` - projections
//! - `GET /api/which_users_can/{name}` - reverse lookup over users
//!
//! ### Composite checks
//! - `GET /api/has_permission/{user}/{name}` - does the user hold the
//!   permission through any role
//! - `GET /api/user_permissions/{user}` - everything the user holds
//!
//! ### Workflows
//! - `GET /api/workflow/users/{workflow_name}` - who can run a workflow
//! - `GET /api/workflow/user/{user}/can_run/{workflow_name}` - single check
//!
//! Business-logic outcomes (a grant refused because the role does not
//! exist) are `{"result": false}` payloads with HTTP 200; only transport
//! and validation failures use error statuses.

use std::future::Future;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header::{AUTHORIZATION, USER_AGENT};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use serde_json::Value;
use tower_http::cors::CorsLayer;
use utoipa::{OpenApi, ToSchema};

use crate::audit::{AuditAction, AuditEvent, AuditLogger};
use crate::config::Settings;
use crate::database::AuthStore;
use crate::error::AuthError;
use crate::models::{HealthResponse, MembershipInfo, PermissionInfo, PoolStats, RoleInfo, RoleName};
use crate::response::{
    format_permission_check, format_result, format_role_members, format_user_permissions,
    ApiResponse,
};
use crate::service::AuthorizationService;
use crate::validation::{
    require_permission, require_role, require_user, require_user_and_role, validate_client_key,
};

/// Application state shared across all handlers.
///
/// Built once in `main` and injected via `Arc`; everything inside is either
/// read-only or internally synchronised.
pub struct AppState {
    pub settings: Settings,
    pub store: AuthStore,
    pub audit: AuditLogger,
}

pub type SharedState = Arc<AppState>;

/// Assemble the full router. Tests drive this directly with `oneshot`.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/health", get(health))
        .route("/api-docs/openapi.json", get(openapi_doc))
        .route("/api/role/:role", axum::routing::post(create_role).delete(delete_role))
        .route("/api/roles", get(list_roles))
        .route(
            "/api/permission/:role/:name",
            axum::routing::post(add_permission)
                .get(check_permission)
                .delete(remove_permission),
        )
        .route(
            "/api/membership/:user/:role",
            axum::routing::post(add_membership)
                .get(check_membership)
                .delete(remove_membership),
        )
        .route("/api/has_permission/:user/:name", get(check_user_permission))
        .route("/api/user_permissions/:user", get(get_user_permissions))
        .route("/api/role_permissions/:role", get(get_role_permissions))
        .route("/api/user_roles/:user", get(get_user_roles))
        .route("/api/members/:role", get(get_role_members))
        .route("/api/which_roles_can/:name", get(which_roles_can))
        .route("/api/which_users_can/:name", get(which_users_can))
        .route("/api/workflow/users/:workflow_name", get(workflow_users))
        .route(
            "/api/workflow/user/:user/can_run/:workflow_name",
            get(workflow_can_run),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Request metadata captured for the audit trail.
struct RequestMeta {
    client_id: String,
    ip: Option<String>,
    user_agent: Option<String>,
}

impl RequestMeta {
    fn capture(headers: &HeaderMap) -> Self {
        let client_id = raw_bearer(headers).unwrap_or_else(|| "unknown".to_string());
        let ip = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .or_else(|| {
                headers
                    .get("x-real-ip")
                    .and_then(|v| v.to_str().ok())
                    .map(|v| v.to_string())
            });
        let user_agent = headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        Self {
            client_id,
            ip,
            user_agent,
        }
    }
}

/// The raw bearer token, without any validation. Used for audit attribution
/// so that rejected requests still carry the credential they presented.
fn raw_bearer(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let mut parts = value.split_whitespace();
    let scheme = parts.next()?;
    let token = parts.next()?;
    if scheme.eq_ignore_ascii_case("bearer") && parts.next().is_none() {
        Some(token.to_string())
    } else {
        None
    }
}

/// Extract and validate the tenant credential.
///
/// Missing or malformed headers are `Unauthorized`; a well-formed header
/// whose token is not a canonical UUIDv4 is `BadInput`.
fn bearer_token(headers: &HeaderMap) -> Result<String, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AuthError::Unauthorized("Authorization header is missing.".to_string()))?
        .to_str()
        .map_err(|_| AuthError::Unauthorized("Authorization header is not valid UTF-8.".to_string()))?;

    let mut parts = value.split_whitespace();
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_none() || parts.next().is_some() {
        return Err(AuthError::Unauthorized(
            "Invalid Authorization header format. Must be 'Bearer <token>'.".to_string(),
        ));
    }

    let token = token.unwrap_or_default();
    if !validate_client_key(token) {
        return Err(AuthError::BadInput(format!(
            "Invalid client key: {token}. Client key must be a valid UUID4."
        )));
    }
    Ok(token.to_string())
}

/// Build the tenant-scoped engine for this request.
fn service(state: &AppState, headers: &HeaderMap) -> Result<AuthorizationService, AuthError> {
    let client = bearer_token(headers)?;
    AuthorizationService::new(state.store.clone(), &client)
}

/// Run an engine operation under the request-scoped deadline. Expiry maps
/// to `StoreUnavailable`, which the envelope reports as HTTP 503.
async fn deadline<T>(
    state: &AppState,
    fut: impl Future<Output = Result<T, AuthError>>,
) -> Result<T, AuthError> {
    match tokio::time::timeout(state.settings.request_timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(AuthError::StoreUnavailable(
            "request deadline exceeded".to_string(),
        )),
    }
}

/// Emit the audit record for an outcome and shape the response envelope.
async fn finish(
    state: &AppState,
    meta: RequestMeta,
    action: AuditAction,
    resource: String,
    user: Option<String>,
    outcome: Result<Value, AuthError>,
    message: &str,
) -> Response {
    state
        .audit
        .record(AuditEvent {
            client_id: meta.client_id,
            user,
            action,
            resource: Some(resource),
            details: outcome.as_ref().ok().cloned(),
            ip_address: meta.ip,
            user_agent: meta.user_agent,
            success: outcome.is_ok(),
        })
        .await;

    match outcome {
        Ok(data) => ApiResponse::success(data, message),
        Err(err) => err.into_response(),
    }
}

/// Liveness probe.
#[utoipa::path(get, path = "/ping",
    responses((status = 200, description = "Service is up")),
    tag = "Health")]
pub async fn ping() -> Json<Value> {
    Json(serde_json::json!({ "message": "PONG" }))
}

/// Health check with connection pool statistics, for monitoring and
/// debugging in production.
#[utoipa::path(get, path = "/health",
    responses((status = 200, description = "Pool telemetry", body = HealthResponse)),
    tag = "Health")]
pub async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let pool = state.store.pool();
    let total = pool.size();
    let available = pool.num_idle() as u32;
    let ceiling = state.settings.max_connections;

    Json(HealthResponse {
        status: "healthy".to_string(),
        database: PoolStats {
            pool_size: ceiling,
            checked_out: total.saturating_sub(available),
            available,
            overflow: total.saturating_sub(ceiling),
            total_connections: total,
        },
    })
}

/// Serve the generated OpenAPI document.
pub async fn openapi_doc() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Optional body for role creation.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRoleBody {
    pub description: Option<String>,
}

/// Create a role (or revive a soft-deleted one under the same name).
#[utoipa::path(post, path = "/api/role/{role}",
    params(("role" = String, Path, description = "Role name")),
    request_body(content = CreateRoleBody, description = "Optional description"),
    responses((status = 200, description = "Creation outcome in the envelope")),
    tag = "Roles")]
pub async fn create_role(
    State(state): State<SharedState>,
    Path(role): Path<String>,
    headers: HeaderMap,
    body: Option<Json<CreateRoleBody>>,
) -> Response {
    let meta = RequestMeta::capture(&headers);
    let outcome = async {
        require_role(&role)?;
        let svc = service(&state, &headers)?;
        let description = body.as_ref().and_then(|b| b.description.as_deref());
        let result = deadline(&state, svc.add_role(&role, description)).await?;
        Ok(format_result(result))
    }
    .await;
    finish(
        &state,
        meta,
        AuditAction::CreateRole,
        role.clone(),
        None,
        outcome,
        &format!("Role '{role}' creation completed"),
    )
    .await
}

/// Soft-delete a role.
#[utoipa::path(delete, path = "/api/role/{role}",
    params(("role" = String, Path, description = "Role name")),
    responses((status = 200, description = "Deletion outcome in the envelope")),
    tag = "Roles")]
pub async fn delete_role(
    State(state): State<SharedState>,
    Path(role): Path<String>,
    headers: HeaderMap,
) -> Response {
    let meta = RequestMeta::capture(&headers);
    let outcome = async {
        require_role(&role)?;
        let svc = service(&state, &headers)?;
        let result = deadline(&state, svc.del_role(&role)).await?;
        Ok(format_result(result))
    }
    .await;
    finish(
        &state,
        meta,
        AuditAction::DeleteRole,
        role.clone(),
        None,
        outcome,
        &format!("Role '{role}' deletion completed"),
    )
    .await
}

/// List the tenant's active roles.
#[utoipa::path(get, path = "/api/roles",
    responses((status = 200, description = "Role list in the envelope", body = [RoleInfo])),
    tag = "Roles")]
pub async fn list_roles(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let meta = RequestMeta::capture(&headers);
    let outcome = async {
        let svc = service(&state, &headers)?;
        let roles = deadline(&state, svc.get_roles()).await?;
        Ok(serde_json::json!({ "result": roles }))
    }
    .await;
    finish(
        &state,
        meta,
        AuditAction::ListRoles,
        "all".to_string(),
        None,
        outcome,
        "Retrieved roles",
    )
    .await
}

/// Grant a permission to a role.
#[utoipa::path(post, path = "/api/permission/{role}/{name}",
    params(
        ("role" = String, Path, description = "Role name"),
        ("name" = String, Path, description = "Permission name")),
    responses((status = 200, description = "Grant outcome in the envelope")),
    tag = "Permissions")]
pub async fn add_permission(
    State(state): State<SharedState>,
    Path((role, name)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let meta = RequestMeta::capture(&headers);
    let outcome = async {
        require_role(&role)?;
        require_permission(&name)?;
        let svc = service(&state, &headers)?;
        let result = deadline(&state, svc.add_permission(&role, &name)).await?;
        Ok(format_result(result))
    }
    .await;
    finish(
        &state,
        meta,
        AuditAction::AddPermission,
        format!("{role}:{name}"),
        None,
        outcome,
        &format!("Permission '{name}' grant to role '{role}' completed"),
    )
    .await
}

/// Check whether a role holds a permission.
#[utoipa::path(get, path = "/api/permission/{role}/{name}",
    params(
        ("role" = String, Path, description = "Role name"),
        ("name" = String, Path, description = "Permission name")),
    responses((status = 200, description = "Check outcome in the envelope")),
    tag = "Permissions")]
pub async fn check_permission(
    State(state): State<SharedState>,
    Path((role, name)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let meta = RequestMeta::capture(&headers);
    let outcome = async {
        require_role(&role)?;
        require_permission(&name)?;
        let svc = service(&state, &headers)?;
        let result = deadline(&state, svc.has_permission(&role, &name)).await?;
        Ok(format_result(result))
    }
    .await;
    finish(
        &state,
        meta,
        AuditAction::CheckPermission,
        format!("{role}:{name}"),
        None,
        outcome,
        &format!("Permission check for role '{role}' and permission '{name}' completed"),
    )
    .await
}

/// Revoke a permission from a role.
#[utoipa::path(delete, path = "/api/permission/{role}/{name}",
    params(
        ("role" = String, Path, description = "Role name"),
        ("name" = String, Path, description = "Permission name")),
    responses((status = 200, description = "Revocation outcome in the envelope")),
    tag = "Permissions")]
pub async fn remove_permission(
    State(state): State<SharedState>,
    Path((role, name)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let meta = RequestMeta::capture(&headers);
    let outcome = async {
        require_role(&role)?;
        require_permission(&name)?;
        let svc = service(&state, &headers)?;
        let result = deadline(&state, svc.del_permission(&role, &name)).await?;
        Ok(format_result(result))
    }
    .await;
    finish(
        &state,
        meta,
        AuditAction::RemovePermission,
        format!("{role}:{name}"),
        None,
        outcome,
        &format!("Permission '{name}' revocation from role '{role}' completed"),
    )
    .await
}

/// Put a user into a role.
#[utoipa::path(post, path = "/api/membership/{user}/{role}",
    params(
        ("user" = String, Path, description = "User identifier"),
        ("role" = String, Path, description = "Role name")),
    responses((status = 200, description = "Grant outcome in the envelope")),
    tag = "Memberships")]
pub async fn add_membership(
    State(state): State<SharedState>,
    Path((user, role)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let meta = RequestMeta::capture(&headers);
    let outcome = async {
        require_user_and_role(&user, &role)?;
        let svc = service(&state, &headers)?;
        let result = deadline(&state, svc.add_membership(&user, &role)).await?;
        Ok(format_result(result))
    }
    .await;
    finish(
        &state,
        meta,
        AuditAction::AddMembership,
        format!("{user}:{role}"),
        Some(user.clone()),
        outcome,
        &format!("Membership grant for user '{user}' and role '{role}' completed"),
    )
    .await
}

/// Check whether a user belongs to a role.
#[utoipa::path(get, path = "/api/membership/{user}/{role}",
    params(
        ("user" = String, Path, description = "User identifier"),
        ("role" = String, Path, description = "Role name")),
    responses((status = 200, description = "Check outcome in the envelope")),
    tag = "Memberships")]
pub async fn check_membership(
    State(state): State<SharedState>,
    Path((user, role)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let meta = RequestMeta::capture(&headers);
    let outcome = async {
        require_user_and_role(&user, &role)?;
        let svc = service(&state, &headers)?;
        let result = deadline(&state, svc.has_membership(&user, &role)).await?;
        Ok(format_result(result))
    }
    .await;
    finish(
        &state,
        meta,
        AuditAction::CheckMembership,
        format!("{user}:{role}"),
        Some(user.clone()),
        outcome,
        &format!("Membership check for user '{user}' and role '{role}' completed"),
    )
    .await
}

/// Remove a user from a role.
#[utoipa::path(delete, path = "/api/membership/{user}/{role}",
    params(
        ("user" = String, Path, description = "User identifier"),
        ("role" = String, Path, description = "Role name")),
    responses((status = 200, description = "Revocation outcome in the envelope")),
    tag = "Memberships")]
pub async fn remove_membership(
    State(state): State<SharedState>,
    Path((user, role)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let meta = RequestMeta::capture(&headers);
    let outcome = async {
        require_user_and_role(&user, &role)?;
        let svc = service(&state, &headers)?;
        let result = deadline(&state, svc.del_membership(&user, &role)).await?;
        Ok(format_result(result))
    }
    .await;
    finish(
        &state,
        meta,
        AuditAction::RemoveMembership,
        format!("{user}:{role}"),
        Some(user.clone()),
        outcome,
        &format!("Membership revocation for user '{user}' and role '{role}' completed"),
    )
    .await
}

/// Composite check: does the user hold the permission through any role?
#[utoipa::path(get, path = "/api/has_permission/{user}/{name}",
    params(
        ("user" = String, Path, description = "User identifier"),
        ("name" = String, Path, description = "Permission name")),
    responses((status = 200, description = "Check outcome in the envelope")),
    tag = "Permissions")]
pub async fn check_user_permission(
    State(state): State<SharedState>,
    Path((user, name)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let meta = RequestMeta::capture(&headers);
    let outcome = async {
        require_user(&user)?;
        require_permission(&name)?;
        let svc = service(&state, &headers)?;
        let result = deadline(&state, svc.user_has_permission(&user, &name)).await?;
        Ok(format_permission_check(result))
    }
    .await;
    finish(
        &state,
        meta,
        AuditAction::CheckPermission,
        format!("{user}:{name}"),
        Some(user.clone()),
        outcome,
        &format!("Permission check for user '{user}' and permission '{name}' completed"),
    )
    .await
}

/// All permissions a user holds, one entry per role association.
#[utoipa::path(get, path = "/api/user_permissions/{user}",
    params(("user" = String, Path, description = "User identifier")),
    responses((status = 200, description = "Permission list in the envelope", body = [PermissionInfo])),
    tag = "Permissions")]
pub async fn get_user_permissions(
    State(state): State<SharedState>,
    Path(user): Path<String>,
    headers: HeaderMap,
) -> Response {
    let meta = RequestMeta::capture(&headers);
    let outcome = async {
        require_user(&user)?;
        let svc = service(&state, &headers)?;
        let permissions = deadline(&state, svc.get_user_permissions(&user)).await?;
        Ok(format_user_permissions(&permissions))
    }
    .await;
    finish(
        &state,
        meta,
        AuditAction::UserPermissions,
        user.clone(),
        Some(user.clone()),
        outcome,
        &format!("Retrieved permissions for user '{user}'"),
    )
    .await
}

/// All permissions of a role.
#[utoipa::path(get, path = "/api/role_permissions/{role}",
    params(("role" = String, Path, description = "Role name")),
    responses((status = 200, description = "Permission list in the envelope", body = [PermissionInfo])),
    tag = "Permissions")]
pub async fn get_role_permissions(
    State(state): State<SharedState>,
    Path(role): Path<String>,
    headers: HeaderMap,
) -> Response {
    let meta = RequestMeta::capture(&headers);
    let outcome = async {
        require_role(&role)?;
        let svc = service(&state, &headers)?;
        let permissions = deadline(&state, svc.get_permissions(&role)).await?;
        Ok(serde_json::to_value(permissions)
            .map_err(|e| AuthError::Internal(e.to_string()))?)
    }
    .await;
    finish(
        &state,
        meta,
        AuditAction::ListPermissions,
        role.clone(),
        None,
        outcome,
        &format!("Retrieved permissions for role '{role}'"),
    )
    .await
}

/// All roles a user belongs to.
#[utoipa::path(get, path = "/api/user_roles/{user}",
    params(("user" = String, Path, description = "User identifier")),
    responses((status = 200, description = "Membership list in the envelope", body = [MembershipInfo])),
    tag = "Memberships")]
pub async fn get_user_roles(
    State(state): State<SharedState>,
    Path(user): Path<String>,
    headers: HeaderMap,
) -> Response {
    let meta = RequestMeta::capture(&headers);
    let outcome = async {
        require_user(&user)?;
        let svc = service(&state, &headers)?;
        let roles = deadline(&state, svc.get_user_roles(&user)).await?;
        Ok(serde_json::to_value(roles).map_err(|e| AuthError::Internal(e.to_string()))?)
    }
    .await;
    finish(
        &state,
        meta,
        AuditAction::ListMemberships,
        user.clone(),
        Some(user.clone()),
        outcome,
        &format!("Retrieved roles for user '{user}'"),
    )
    .await
}

/// All members of a role.
#[utoipa::path(get, path = "/api/members/{role}",
    params(("role" = String, Path, description = "Role name")),
    responses((status = 200, description = "Member list in the envelope", body = [MembershipInfo])),
    tag = "Memberships")]
pub async fn get_role_members(
    State(state): State<SharedState>,
    Path(role): Path<String>,
    headers: HeaderMap,
) -> Response {
    let meta = RequestMeta::capture(&headers);
    let outcome = async {
        require_role(&role)?;
        let svc = service(&state, &headers)?;
        let members = deadline(&state, svc.get_role_members(&role)).await?;
        Ok(serde_json::to_value(members).map_err(|e| AuthError::Internal(e.to_string()))?)
    }
    .await;
    finish(
        &state,
        meta,
        AuditAction::ListMemberships,
        role.clone(),
        None,
        outcome,
        &format!("Retrieved members of role '{role}'"),
    )
    .await
}

/// Roles granted a permission.
#[utoipa::path(get, path = "/api/which_roles_can/{name}",
    params(("name" = String, Path, description = "Permission name")),
    responses((status = 200, description = "Role list in the envelope", body = [RoleName])),
    tag = "Permissions")]
pub async fn which_roles_can(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Response {
    let meta = RequestMeta::capture(&headers);
    let outcome = async {
        require_permission(&name)?;
        let svc = service(&state, &headers)?;
        let roles = deadline(&state, svc.which_roles_can(&name)).await?;
        Ok(serde_json::to_value(roles).map_err(|e| AuthError::Internal(e.to_string()))?)
    }
    .await;
    finish(
        &state,
        meta,
        AuditAction::ListRoles,
        name.clone(),
        None,
        outcome,
        &format!("Retrieved roles that can '{name}'"),
    )
    .await
}

/// Users granted a permission through any role. Duplicates are preserved
/// per role association.
#[utoipa::path(get, path = "/api/which_users_can/{name}",
    params(("name" = String, Path, description = "Permission name")),
    responses((status = 200, description = "Membership list in the envelope", body = [MembershipInfo])),
    tag = "Permissions")]
pub async fn which_users_can(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Response {
    let meta = RequestMeta::capture(&headers);
    let outcome = async {
        require_permission(&name)?;
        let svc = service(&state, &headers)?;
        let users = deadline(&state, svc.which_users_can(&name)).await?;
        Ok(serde_json::to_value(users).map_err(|e| AuthError::Internal(e.to_string()))?)
    }
    .await;
    finish(
        &state,
        meta,
        AuditAction::ListMemberships,
        name.clone(),
        None,
        outcome,
        &format!("Retrieved users that can '{name}'"),
    )
    .await
}

/// All users who can run a workflow.
#[utoipa::path(get, path = "/api/workflow/users/{workflow_name}",
    params(("workflow_name" = String, Path, description = "Workflow name")),
    responses((status = 200, description = "Member list in the envelope")),
    tag = "Workflows")]
pub async fn workflow_users(
    State(state): State<SharedState>,
    Path(workflow_name): Path<String>,
    headers: HeaderMap,
) -> Response {
    let meta = RequestMeta::capture(&headers);
    let outcome = async {
        require_permission(&workflow_name)?;
        let svc = service(&state, &headers)?;
        let users = deadline(&state, svc.which_users_can(&workflow_name)).await?;
        Ok(format_role_members(&users))
    }
    .await;
    finish(
        &state,
        meta,
        AuditAction::ListMemberships,
        format!("workflow:{workflow_name}"),
        None,
        outcome,
        &format!("Retrieved users who can run workflow '{workflow_name}'"),
    )
    .await
}

/// Check whether a user can run a workflow.
#[utoipa::path(get, path = "/api/workflow/user/{user}/can_run/{workflow_name}",
    params(
        ("user" = String, Path, description = "User identifier"),
        ("workflow_name" = String, Path, description = "Workflow name")),
    responses((status = 200, description = "Check outcome in the envelope")),
    tag = "Workflows")]
pub async fn workflow_can_run(
    State(state): State<SharedState>,
    Path((user, workflow_name)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let meta = RequestMeta::capture(&headers);
    let outcome = async {
        require_user(&user)?;
        require_permission(&workflow_name)?;
        let svc = service(&state, &headers)?;
        let result = deadline(&state, svc.user_has_permission(&user, &workflow_name)).await?;
        Ok(format_permission_check(result))
    }
    .await;
    finish(
        &state,
        meta,
        AuditAction::CheckPermission,
        format!("workflow:{workflow_name}"),
        Some(user.clone()),
        outcome,
        &format!("Workflow permission check for user '{user}' and workflow '{workflow_name}' completed"),
    )
    .await
}

/// Generated OpenAPI description of the whole surface.
#[derive(OpenApi)]
#[openapi(
    paths(
        ping,
        health,
        create_role,
        delete_role,
        list_roles,
        add_permission,
        check_permission,
        remove_permission,
        add_membership,
        check_membership,
        remove_membership,
        check_user_permission,
        get_user_permissions,
        get_role_permissions,
        get_user_roles,
        get_role_members,
        which_roles_can,
        which_users_can,
        workflow_users,
        workflow_can_run,
    ),
    components(schemas(
        RoleInfo,
        RoleName,
        MembershipInfo,
        PermissionInfo,
        HealthResponse,
        PoolStats,
        CreateRoleBody,
    )),
    tags(
        (name = "Health", description = "Liveness and pool telemetry"),
        (name = "Roles", description = "Role administration"),
        (name = "Permissions", description = "Permission grants and checks"),
        (name = "Memberships", description = "User-to-role assignments"),
        (name = "Workflows", description = "Workflow permission lookups"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_auth(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn missing_header_is_unauthorized() {
        let err = bearer_token(&HeaderMap::new()).unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized(_)));
    }

    #[test]
    fn malformed_scheme_is_unauthorized() {
        let err = bearer_token(&headers_with_auth("Basic abc")).unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized(_)));
        let err = bearer_token(&headers_with_auth("Bearer")).unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized(_)));
        let err = bearer_token(&headers_with_auth("Bearer a b")).unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized(_)));
    }

    #[test]
    fn non_uuid_token_is_bad_input() {
        let err = bearer_token(&headers_with_auth("Bearer not-a-uuid")).unwrap_err();
        assert!(matches!(err, AuthError::BadInput(_)));
    }

    #[test]
    fn valid_token_passes() {
        let token = "550e8400-e29b-41d4-a716-446655440000";
        let got = bearer_token(&headers_with_auth(&format!("Bearer {token}"))).unwrap();
        assert_eq!(got, token);
    }

    #[test]
    fn meta_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("10.0.0.1, 10.0.0.2"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("test-agent"));
        let meta = RequestMeta::capture(&headers);
        assert_eq!(meta.ip.as_deref(), Some("10.0.0.1"));
        assert_eq!(meta.user_agent.as_deref(), Some("test-agent"));
        assert_eq!(meta.client_id, "unknown");
    }
}
