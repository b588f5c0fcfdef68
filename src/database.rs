//! # Database Module
//!
//! SQLite-backed store for the authorization graph. One connection pool per
//! process; row-level primitives scoped by `(creator, ...)`.
//!
//! ## Schema
//!
//! ### auth_role
//! - `id`: row id (reused on revival, which keeps link rows valid)
//! - `creator`: tenant key, partition column on every query
//! - `role`: short role name
//! - `description`: optional, encrypted at rest
//! - `is_active`: soft-delete flag
//! - `created_at` / `modified_at`: RFC3339 timestamps
//! - `UNIQUE(creator, role)`
//!
//! ### auth_membership
//! Same shape over `user` (encrypted at rest), `UNIQUE(creator, user)`.
//!
//! ### auth_permission
//! Same shape over `name` (encrypted at rest), `UNIQUE(creator, name)`.
//!
//! ### membership_roles / permission_roles
//! Unordered, unique link sets; composite primary keys absorb duplicate
//! inserts via `INSERT OR IGNORE`.
//!
//! ### audit_log
//! Append-only operation log, written by the audit module.
//!
//! ## Contracts
//!
//! Every mutating primitive is atomic and idempotent; uniqueness conflicts
//! are absorbed by `ON CONFLICT` upserts and never surface to callers.
//! Primitives take any `SqliteExecutor` so the engine can compose several of
//! them inside a single transaction. Every read filters on `creator` and on
//! both endpoints' `is_active`, so tombstoned rows and their leftover link
//! rows are invisible.
//!
//! Sensitive columns (user identifier, permission name, role description)
//! cross this boundary encrypted; the engine above only ever sees plaintext.
//! The table names carry an optional schema prefix so several deployments
//! can share one database host.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{migrate::MigrateDatabase, Row, Sqlite, SqliteExecutor, SqlitePool};

use crate::config::Settings;
use crate::crypto::FieldCipher;
use crate::error::AuthError;
use crate::models::{MembershipInfo, PermissionInfo, RoleInfo};

/// Resolved table names, schema prefix applied once at startup.
#[derive(Debug, Clone)]
pub struct Tables {
    pub role: String,
    pub membership: String,
    pub permission: String,
    pub membership_roles: String,
    pub permission_roles: String,
    pub audit_log: String,
}

impl Tables {
    pub fn new(schema: Option<&str>) -> Self {
        let qualify = |name: &str| match schema {
            Some(prefix) => format!("{prefix}_{name}"),
            None => name.to_string(),
        };
        Tables {
            role: qualify("auth_role"),
            membership: qualify("auth_membership"),
            permission: qualify("auth_permission"),
            membership_roles: qualify("membership_roles"),
            permission_roles: qualify("permission_roles"),
            audit_log: qualify("audit_log"),
        }
    }
}

/// The two many-to-many link sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTable {
    /// `membership_roles(membership_id, role_id)` - user belongs to role.
    MembershipRoles,
    /// `permission_roles(permission_id, role_id)` - permission granted to role.
    PermissionRoles,
}

/// Initializes the connection pool and runs the idempotent migrations.
///
/// Creates the SQLite database file if it does not exist, applies the WAL
/// and foreign-key pragmas, and creates all tables. Connections are
/// health-pinged on checkout and recycled after a bounded idle window.
pub async fn init_database(settings: &Settings) -> Result<SqlitePool, AuthError> {
    let database_url = &settings.database_url;

    if !Sqlite::database_exists(database_url).await.unwrap_or(false) {
        tracing::info!("creating database at {}", database_url);
        Sqlite::create_database(database_url)
            .await
            .map_err(AuthError::from)?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.request_timeout)
        .idle_timeout(Duration::from_secs(300))
        .test_before_acquire(true)
        .connect(database_url)
        .await?;

    // WAL keeps readers unblocked by the single writer; read-committed
    // isolation is sufficient because every upsert carries its own
    // uniqueness contract.
    sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;
    sqlx::query("PRAGMA synchronous=NORMAL").execute(&pool).await?;
    sqlx::query("PRAGMA foreign_keys=ON").execute(&pool).await?;

    let tables = Tables::new(settings.database_schema.as_deref());
    run_migrations(&pool, &tables).await?;

    Ok(pool)
}

/// Executes the DDL for all required tables. Idempotent.
pub async fn run_migrations(pool: &SqlitePool, tables: &Tables) -> Result<(), sqlx::Error> {
    tracing::info!("running migrations");

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {role} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            creator TEXT NOT NULL,
            role TEXT NOT NULL,
            description TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            modified_at TEXT NOT NULL,
            UNIQUE (creator, role)
        )
        "#,
        role = tables.role
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {membership} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            creator TEXT NOT NULL,
            user TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            modified_at TEXT NOT NULL,
            UNIQUE (creator, user)
        )
        "#,
        membership = tables.membership
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {permission} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            creator TEXT NOT NULL,
            name TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            modified_at TEXT NOT NULL,
            UNIQUE (creator, name)
        )
        "#,
        permission = tables.permission
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {membership_roles} (
            membership_id INTEGER NOT NULL,
            role_id INTEGER NOT NULL,
            PRIMARY KEY (membership_id, role_id)
        )
        "#,
        membership_roles = tables.membership_roles
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {permission_roles} (
            permission_id INTEGER NOT NULL,
            role_id INTEGER NOT NULL,
            PRIMARY KEY (permission_id, role_id)
        )
        "#,
        permission_roles = tables.permission_roles
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {audit_log} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp TEXT NOT NULL,
            client_id TEXT NOT NULL,
            user TEXT,
            action TEXT NOT NULL,
            resource TEXT,
            details TEXT,
            ip_address TEXT,
            user_agent TEXT,
            success INTEGER NOT NULL
        )
        "#,
        audit_log = tables.audit_log
    ))
    .execute(pool)
    .await?;

    for (index, table, column) in [
        ("idx_role_creator", &tables.role, "creator"),
        ("idx_membership_creator", &tables.membership, "creator"),
        ("idx_permission_creator", &tables.permission, "creator"),
        ("idx_audit_client", &tables.audit_log, "client_id"),
    ] {
        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS {table}_{index} ON {table} ({column})"
        ))
        .execute(pool)
        .await?;
    }

    tracing::info!("migrations complete");
    Ok(())
}

fn now_string() -> String {
    datetime_to_string(&Utc::now())
}

fn datetime_to_string(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Row-level store over the authorization tables.
///
/// Cheap to clone; the pool, name map and cipher are shared. Mutating
/// primitives accept any [`SqliteExecutor`] so the engine can run several of
/// them inside one transaction and observe no partial state on rollback.
#[derive(Clone)]
pub struct AuthStore {
    pool: SqlitePool,
    tables: Arc<Tables>,
    cipher: Arc<FieldCipher>,
}

impl AuthStore {
    pub fn new(pool: SqlitePool, tables: Tables, cipher: FieldCipher) -> Self {
        Self {
            pool,
            tables: Arc::new(tables),
            cipher: Arc::new(cipher),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    /// Insert `(creator, role)`, or on conflict revive the existing row and
    /// refresh its description if one was provided. Returns the row id; a
    /// revived row keeps its original id.
    pub async fn upsert_role<'e, E>(
        &self,
        exec: E,
        creator: &str,
        role: &str,
        description: Option<&str>,
    ) -> Result<i64, AuthError>
    where
        E: SqliteExecutor<'e>,
    {
        let sql = format!(
            r#"
            INSERT INTO {t} (creator, role, description, is_active, created_at, modified_at)
            VALUES (?1, ?2, ?3, 1, ?4, ?4)
            ON CONFLICT (creator, role) DO UPDATE SET
                is_active = 1,
                description = COALESCE(excluded.description, {t}.description),
                modified_at = excluded.modified_at
            RETURNING id
            "#,
            t = self.tables.role
        );
        let encrypted = description.map(|d| self.cipher.encrypt_field(d));
        let row = sqlx::query(&sql)
            .bind(creator)
            .bind(role)
            .bind(encrypted)
            .bind(now_string())
            .fetch_one(exec)
            .await?;
        Ok(row.get::<i64, _>(0))
    }

    /// Soft-delete a role. Returns whether a state change occurred.
    pub async fn deactivate_role<'e, E>(
        &self,
        exec: E,
        creator: &str,
        role: &str,
    ) -> Result<bool, AuthError>
    where
        E: SqliteExecutor<'e>,
    {
        let sql = format!(
            "UPDATE {t} SET is_active = 0, modified_at = ?3
             WHERE creator = ?1 AND role = ?2 AND is_active = 1",
            t = self.tables.role
        );
        let result = sqlx::query(&sql)
            .bind(creator)
            .bind(role)
            .bind(now_string())
            .execute(exec)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Insert `(creator, user)`, or on conflict revive the existing row.
    /// Returns the row id.
    pub async fn upsert_membership<'e, E>(
        &self,
        exec: E,
        creator: &str,
        user: &str,
    ) -> Result<i64, AuthError>
    where
        E: SqliteExecutor<'e>,
    {
        let sql = format!(
            r#"
            INSERT INTO {t} (creator, user, is_active, created_at, modified_at)
            VALUES (?1, ?2, 1, ?3, ?3)
            ON CONFLICT (creator, user) DO UPDATE SET
                is_active = 1,
                modified_at = excluded.modified_at
            RETURNING id
            "#,
            t = self.tables.membership
        );
        let row = sqlx::query(&sql)
            .bind(creator)
            .bind(self.cipher.encrypt_field(user))
            .bind(now_string())
            .fetch_one(exec)
            .await?;
        Ok(row.get::<i64, _>(0))
    }

    /// Insert `(creator, name)`, or on conflict revive the existing row.
    /// Returns the row id.
    pub async fn upsert_permission<'e, E>(
        &self,
        exec: E,
        creator: &str,
        name: &str,
    ) -> Result<i64, AuthError>
    where
        E: SqliteExecutor<'e>,
    {
        let sql = format!(
            r#"
            INSERT INTO {t} (creator, name, is_active, created_at, modified_at)
            VALUES (?1, ?2, 1, ?3, ?3)
            ON CONFLICT (creator, name) DO UPDATE SET
                is_active = 1,
                modified_at = excluded.modified_at
            RETURNING id
            "#,
            t = self.tables.permission
        );
        let row = sqlx::query(&sql)
            .bind(creator)
            .bind(self.cipher.encrypt_field(name))
            .bind(now_string())
            .fetch_one(exec)
            .await?;
        Ok(row.get::<i64, _>(0))
    }

    /// Id of an active role, if any.
    pub async fn find_active_role_id<'e, E>(
        &self,
        exec: E,
        creator: &str,
        role: &str,
    ) -> Result<Option<i64>, AuthError>
    where
        E: SqliteExecutor<'e>,
    {
        let sql = format!(
            "SELECT id FROM {t} WHERE creator = ?1 AND role = ?2 AND is_active = 1",
            t = self.tables.role
        );
        let row = sqlx::query(&sql)
            .bind(creator)
            .bind(role)
            .fetch_optional(exec)
            .await?;
        Ok(row.map(|r| r.get::<i64, _>(0)))
    }

    /// Id of a role regardless of `is_active`; unlink paths must reach
    /// tombstoned rows too.
    pub async fn find_role_id<'e, E>(
        &self,
        exec: E,
        creator: &str,
        role: &str,
    ) -> Result<Option<i64>, AuthError>
    where
        E: SqliteExecutor<'e>,
    {
        let sql = format!(
            "SELECT id FROM {t} WHERE creator = ?1 AND role = ?2",
            t = self.tables.role
        );
        let row = sqlx::query(&sql)
            .bind(creator)
            .bind(role)
            .fetch_optional(exec)
            .await?;
        Ok(row.map(|r| r.get::<i64, _>(0)))
    }

    pub async fn find_membership_id<'e, E>(
        &self,
        exec: E,
        creator: &str,
        user: &str,
    ) -> Result<Option<i64>, AuthError>
    where
        E: SqliteExecutor<'e>,
    {
        let sql = format!(
            "SELECT id FROM {t} WHERE creator = ?1 AND user = ?2",
            t = self.tables.membership
        );
        let row = sqlx::query(&sql)
            .bind(creator)
            .bind(self.cipher.encrypt_field(user))
            .fetch_optional(exec)
            .await?;
        Ok(row.map(|r| r.get::<i64, _>(0)))
    }

    pub async fn find_permission_id<'e, E>(
        &self,
        exec: E,
        creator: &str,
        name: &str,
    ) -> Result<Option<i64>, AuthError>
    where
        E: SqliteExecutor<'e>,
    {
        let sql = format!(
            "SELECT id FROM {t} WHERE creator = ?1 AND name = ?2",
            t = self.tables.permission
        );
        let row = sqlx::query(&sql)
            .bind(creator)
            .bind(self.cipher.encrypt_field(name))
            .fetch_optional(exec)
            .await?;
        Ok(row.map(|r| r.get::<i64, _>(0)))
    }

    fn link_parts(&self, table: LinkTable) -> (&str, &str) {
        match table {
            LinkTable::MembershipRoles => (self.tables.membership_roles.as_str(), "membership_id"),
            LinkTable::PermissionRoles => (self.tables.permission_roles.as_str(), "permission_id"),
        }
    }

    /// Insert a link row, ignoring duplicates.
    pub async fn link<'e, E>(
        &self,
        exec: E,
        table: LinkTable,
        left_id: i64,
        role_id: i64,
    ) -> Result<(), AuthError>
    where
        E: SqliteExecutor<'e>,
    {
        let (name, left_col) = self.link_parts(table);
        let sql = format!("INSERT OR IGNORE INTO {name} ({left_col}, role_id) VALUES (?1, ?2)");
        sqlx::query(&sql).bind(left_id).bind(role_id).execute(exec).await?;
        Ok(())
    }

    /// Delete a link row; no error if it was absent.
    pub async fn unlink<'e, E>(
        &self,
        exec: E,
        table: LinkTable,
        left_id: i64,
        role_id: i64,
    ) -> Result<(), AuthError>
    where
        E: SqliteExecutor<'e>,
    {
        let (name, left_col) = self.link_parts(table);
        let sql = format!("DELETE FROM {name} WHERE {left_col} = ?1 AND role_id = ?2");
        sqlx::query(&sql).bind(left_id).bind(role_id).execute(exec).await?;
        Ok(())
    }

    /// True iff an active membership for `(creator, user)` links to an
    /// active role named `role`.
    pub async fn has_membership(
        &self,
        creator: &str,
        user: &str,
        role: &str,
    ) -> Result<bool, AuthError> {
        let sql = format!(
            r#"
            SELECT COUNT(1) FROM {m} m
            JOIN {mr} mr ON mr.membership_id = m.id
            JOIN {r} r ON r.id = mr.role_id
            WHERE m.creator = ?1 AND m.user = ?2 AND m.is_active = 1
              AND r.creator = ?1 AND r.role = ?3 AND r.is_active = 1
            "#,
            m = self.tables.membership,
            mr = self.tables.membership_roles,
            r = self.tables.role
        );
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(creator)
            .bind(self.cipher.encrypt_field(user))
            .bind(role)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    /// True iff the active role `role` is linked to the active permission
    /// `name`.
    pub async fn has_permission(
        &self,
        creator: &str,
        role: &str,
        name: &str,
    ) -> Result<bool, AuthError> {
        let sql = format!(
            r#"
            SELECT COUNT(1) FROM {r} r
            JOIN {pr} pr ON pr.role_id = r.id
            JOIN {p} p ON p.id = pr.permission_id
            WHERE r.creator = ?1 AND r.role = ?2 AND r.is_active = 1
              AND p.creator = ?1 AND p.name = ?3 AND p.is_active = 1
            "#,
            r = self.tables.role,
            pr = self.tables.permission_roles,
            p = self.tables.permission
        );
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(creator)
            .bind(role)
            .bind(self.cipher.encrypt_field(name))
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    /// The composite check, resolved in a single statement: exists an active
    /// role linking the user's active membership to the active permission.
    pub async fn user_has_permission(
        &self,
        creator: &str,
        user: &str,
        name: &str,
    ) -> Result<bool, AuthError> {
        let sql = format!(
            r#"
            SELECT COUNT(1) FROM {m} m
            JOIN {mr} mr ON mr.membership_id = m.id
            JOIN {r} r ON r.id = mr.role_id AND r.creator = ?1 AND r.is_active = 1
            JOIN {pr} pr ON pr.role_id = r.id
            JOIN {p} p ON p.id = pr.permission_id AND p.creator = ?1 AND p.is_active = 1
            WHERE m.creator = ?1 AND m.user = ?2 AND m.is_active = 1 AND p.name = ?3
            "#,
            m = self.tables.membership,
            mr = self.tables.membership_roles,
            r = self.tables.role,
            pr = self.tables.permission_roles,
            p = self.tables.permission
        );
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(creator)
            .bind(self.cipher.encrypt_field(user))
            .bind(self.cipher.encrypt_field(name))
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    /// All active roles of the tenant.
    pub async fn list_roles(&self, creator: &str) -> Result<Vec<RoleInfo>, AuthError> {
        let sql = format!(
            "SELECT role, description FROM {t}
             WHERE creator = ?1 AND is_active = 1 ORDER BY id",
            t = self.tables.role
        );
        let rows = sqlx::query(&sql).bind(creator).fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|row| RoleInfo {
                role: row.get("role"),
                description: row
                    .get::<Option<String>, _>("description")
                    .map(|d| self.cipher.decrypt_field(&d)),
            })
            .collect())
    }

    /// Active permissions linked to an active role.
    pub async fn role_permissions(
        &self,
        creator: &str,
        role: &str,
    ) -> Result<Vec<PermissionInfo>, AuthError> {
        let sql = format!(
            r#"
            SELECT p.name FROM {r} r
            JOIN {pr} pr ON pr.role_id = r.id
            JOIN {p} p ON p.id = pr.permission_id
            WHERE r.creator = ?1 AND r.role = ?2 AND r.is_active = 1
              AND p.creator = ?1 AND p.is_active = 1
            ORDER BY p.id
            "#,
            r = self.tables.role,
            pr = self.tables.permission_roles,
            p = self.tables.permission
        );
        let rows = sqlx::query(&sql)
            .bind(creator)
            .bind(role)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| PermissionInfo {
                name: self.cipher.decrypt_field(row.get::<String, _>("name").as_str()),
            })
            .collect())
    }

    /// All permissions a user holds, one entry per role association.
    /// A user holding the same permission through two roles appears twice;
    /// the consumer dedupes if it wants to.
    pub async fn user_permissions(
        &self,
        creator: &str,
        user: &str,
    ) -> Result<Vec<PermissionInfo>, AuthError> {
        let sql = format!(
            r#"
            SELECT p.name FROM {m} m
            JOIN {mr} mr ON mr.membership_id = m.id
            JOIN {r} r ON r.id = mr.role_id AND r.creator = ?1 AND r.is_active = 1
            JOIN {pr} pr ON pr.role_id = r.id
            JOIN {p} p ON p.id = pr.permission_id AND p.creator = ?1 AND p.is_active = 1
            WHERE m.creator = ?1 AND m.user = ?2 AND m.is_active = 1
            ORDER BY r.id, p.id
            "#,
            m = self.tables.membership,
            mr = self.tables.membership_roles,
            r = self.tables.role,
            pr = self.tables.permission_roles,
            p = self.tables.permission
        );
        let rows = sqlx::query(&sql)
            .bind(creator)
            .bind(self.cipher.encrypt_field(user))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| PermissionInfo {
                name: self.cipher.decrypt_field(row.get::<String, _>("name").as_str()),
            })
            .collect())
    }

    /// Active roles held by a user, as `(user, role)` associations.
    pub async fn user_roles(
        &self,
        creator: &str,
        user: &str,
    ) -> Result<Vec<MembershipInfo>, AuthError> {
        let sql = format!(
            r#"
            SELECT r.role FROM {m} m
            JOIN {mr} mr ON mr.membership_id = m.id
            JOIN {r} r ON r.id = mr.role_id
            WHERE m.creator = ?1 AND m.user = ?2 AND m.is_active = 1
              AND r.creator = ?1 AND r.is_active = 1
            ORDER BY r.id
            "#,
            m = self.tables.membership,
            mr = self.tables.membership_roles,
            r = self.tables.role
        );
        let rows = sqlx::query(&sql)
            .bind(creator)
            .bind(self.cipher.encrypt_field(user))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| MembershipInfo {
                user: user.to_string(),
                role: row.get("role"),
            })
            .collect())
    }

    /// Active members of an active role, as `(user, role)` associations.
    pub async fn role_members(
        &self,
        creator: &str,
        role: &str,
    ) -> Result<Vec<MembershipInfo>, AuthError> {
        let sql = format!(
            r#"
            SELECT m.user FROM {r} r
            JOIN {mr} mr ON mr.role_id = r.id
            JOIN {m} m ON m.id = mr.membership_id
            WHERE r.creator = ?1 AND r.role = ?2 AND r.is_active = 1
              AND m.creator = ?1 AND m.is_active = 1
            ORDER BY m.id
            "#,
            r = self.tables.role,
            mr = self.tables.membership_roles,
            m = self.tables.membership
        );
        let rows = sqlx::query(&sql)
            .bind(creator)
            .bind(role)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| MembershipInfo {
                user: self.cipher.decrypt_field(row.get::<String, _>("user").as_str()),
                role: role.to_string(),
            })
            .collect())
    }

    /// Names of the active roles linked to the active permission `name`.
    pub async fn roles_with_permission(
        &self,
        creator: &str,
        name: &str,
    ) -> Result<Vec<String>, AuthError> {
        let sql = format!(
            r#"
            SELECT r.role FROM {p} p
            JOIN {pr} pr ON pr.permission_id = p.id
            JOIN {r} r ON r.id = pr.role_id
            WHERE p.creator = ?1 AND p.name = ?2 AND p.is_active = 1
              AND r.creator = ?1 AND r.is_active = 1
            ORDER BY r.id
            "#,
            p = self.tables.permission,
            pr = self.tables.permission_roles,
            r = self.tables.role
        );
        let rows = sqlx::query(&sql)
            .bind(creator)
            .bind(self.cipher.encrypt_field(name))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|row| row.get("role")).collect())
    }
}
