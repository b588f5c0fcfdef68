//! # Response Format Module
//!
//! Uniform JSON envelopes for every route:
//!
//! ```json
//! {"success": true,  "code": 200, "message": "...", "data": ...,    "timestamp": "..."}
//! {"success": false, "code": 400, "message": "...", "details": {}, "timestamp": "..."}
//! ```
//!
//! The `data` member carries the endpoint-specific payload; business-logic
//! outcomes such as a failed precondition travel inside `data` as
//! `{"result": false}`, while HTTP-level failures use the error envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use chrono::Utc;
use serde_json::{json, Value};

/// Builder for the standardized response envelopes.
pub struct ApiResponse;

impl ApiResponse {
    /// Success envelope with payload and message.
    pub fn success(data: Value, message: &str) -> Response {
        let body = json!({
            "success": true,
            "code": 200,
            "message": message,
            "data": data,
            "timestamp": Utc::now().to_rfc3339(),
        });
        (StatusCode::OK, Json(body)).into_response()
    }

    /// Error envelope for the given status.
    pub fn error(status: StatusCode, message: &str) -> Response {
        let body = json!({
            "success": false,
            "code": status.as_u16(),
            "message": message,
            "details": {},
            "timestamp": Utc::now().to_rfc3339(),
        });
        (status, Json(body)).into_response()
    }
}

/// `{"count": n, "permissions": [...]}` for the user-permissions payload.
pub fn format_user_permissions(permissions: &[crate::models::PermissionInfo]) -> Value {
    json!({
        "count": permissions.len(),
        "permissions": permissions,
    })
}

/// `{"count": n, "members": [...]}` for the workflow-users payload.
pub fn format_role_members(members: &[crate::models::MembershipInfo]) -> Value {
    json!({
        "count": members.len(),
        "members": members,
    })
}

/// `{"has_permission": b}` for the composite checks.
pub fn format_permission_check(has_permission: bool) -> Value {
    json!({ "has_permission": has_permission })
}

/// `{"result": b}` for the administrative mutations and plain checks.
pub fn format_result(result: bool) -> Value {
    json!({ "result": result })
}
