//! # Audit Module
//!
//! Append-only operation log. Every privileged operation produces exactly
//! one row in `audit_log` and one structured tracing event; rows are never
//! updated or deleted by the engine.
//!
//! Audit writes must never fail the caller: an insert failure is logged and
//! swallowed, so a degraded audit store cannot take the decision path down
//! with it.

use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;

/// Enumerated action kinds, one per privileged operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    CreateRole,
    DeleteRole,
    AddPermission,
    RemovePermission,
    AddMembership,
    RemoveMembership,
    CheckPermission,
    CheckMembership,
    ListRoles,
    ListPermissions,
    ListMemberships,
    UserPermissions,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::CreateRole => "CREATE_ROLE",
            AuditAction::DeleteRole => "DELETE_ROLE",
            AuditAction::AddPermission => "ADD_PERMISSION",
            AuditAction::RemovePermission => "REMOVE_PERMISSION",
            AuditAction::AddMembership => "ADD_MEMBERSHIP",
            AuditAction::RemoveMembership => "REMOVE_MEMBERSHIP",
            AuditAction::CheckPermission => "CHECK_PERMISSION",
            AuditAction::CheckMembership => "CHECK_MEMBERSHIP",
            AuditAction::ListRoles => "LIST_ROLES",
            AuditAction::ListPermissions => "LIST_PERMISSIONS",
            AuditAction::ListMemberships => "LIST_MEMBERSHIPS",
            AuditAction::UserPermissions => "USER_PERMISSIONS",
        }
    }
}

/// One audit record, as captured at the boundary.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub client_id: String,
    pub user: Option<String>,
    pub action: AuditAction,
    pub resource: Option<String>,
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub success: bool,
}

/// Writer for the append-only audit table.
#[derive(Clone)]
pub struct AuditLogger {
    pool: SqlitePool,
    table: String,
    enabled: bool,
}

impl AuditLogger {
    pub fn new(pool: SqlitePool, table: String, enabled: bool) -> Self {
        Self { pool, table, enabled }
    }

    /// Record an audit event. Failures are logged, never propagated.
    pub async fn record(&self, event: AuditEvent) {
        if !self.enabled {
            return;
        }

        let timestamp = Utc::now();
        let sql = format!(
            r#"
            INSERT INTO {t}
                (timestamp, client_id, user, action, resource, details,
                 ip_address, user_agent, success)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            t = self.table
        );

        let insert = sqlx::query(&sql)
            .bind(timestamp.to_rfc3339())
            .bind(&event.client_id)
            .bind(&event.user)
            .bind(event.action.as_str())
            .bind(&event.resource)
            .bind(event.details.as_ref().map(|d| d.to_string()))
            .bind(&event.ip_address)
            .bind(&event.user_agent)
            .bind(if event.success { 1i64 } else { 0i64 })
            .execute(&self.pool)
            .await;

        if let Err(err) = insert {
            tracing::error!(
                client_id = %event.client_id,
                action = event.action.as_str(),
                "failed to persist audit event: {}",
                err
            );
        }

        // Mirror every record as a structured log line for external
        // collectors, whether or not the row landed.
        let log_line = json!({
            "type": "audit",
            "client_id": event.client_id,
            "user": event.user,
            "action": event.action.as_str(),
            "resource": event.resource,
            "success": event.success,
            "ip": event.ip_address,
            "timestamp": timestamp.to_rfc3339(),
        });
        tracing::info!(target: "audit", "{}", log_line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{run_migrations, Tables};
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::Row;

    fn event(action: AuditAction, success: bool) -> AuditEvent {
        AuditEvent {
            client_id: "550e8400-e29b-41d4-a716-446655440000".into(),
            user: Some("john".into()),
            action,
            resource: Some("admin".into()),
            details: Some(json!({"result": success})),
            ip_address: Some("127.0.0.1".into()),
            user_agent: Some("unit-test".into()),
            success,
        }
    }

    #[tokio::test]
    async fn records_land_in_the_table() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let tables = Tables::new(None);
        run_migrations(&pool, &tables).await.unwrap();

        let logger = AuditLogger::new(pool.clone(), tables.audit_log.clone(), true);
        logger.record(event(AuditAction::CreateRole, true)).await;
        logger.record(event(AuditAction::CheckPermission, false)).await;

        let rows = sqlx::query("SELECT action, success FROM audit_log ORDER BY id")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get::<String, _>("action"), "CREATE_ROLE");
        assert_eq!(rows[0].get::<i64, _>("success"), 1);
        assert_eq!(rows[1].get::<String, _>("action"), "CHECK_PERMISSION");
        assert_eq!(rows[1].get::<i64, _>("success"), 0);
    }

    #[tokio::test]
    async fn disabled_logger_writes_nothing() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let tables = Tables::new(None);
        run_migrations(&pool, &tables).await.unwrap();

        let logger = AuditLogger::new(pool.clone(), tables.audit_log.clone(), false);
        logger.record(event(AuditAction::CreateRole, true)).await;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM audit_log")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn insert_failure_does_not_propagate() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        // No migrations: the table does not exist, the insert must fail
        // silently.
        let logger = AuditLogger::new(pool, "audit_log".into(), true);
        logger.record(event(AuditAction::DeleteRole, true)).await;
    }
}
