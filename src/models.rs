//! # Data Models Module
//!
//! Data structures shared between the store, the engine and the HTTP
//! boundary.
//!
//! ## Model Categories
//!
//! ### Projections
//! What the decision queries return, already decrypted:
//! - [`RoleInfo`] - a role with its optional description
//! - [`MembershipInfo`] - a `(user, role)` association
//! - [`PermissionInfo`] - a permission name
//!
//! ### API Response Models
//! - [`HealthResponse`] / [`PoolStats`] - liveness and pool telemetry
//!
//! Database rows never cross the store boundary directly; sensitive columns
//! (user identifier, permission name, role description) are decrypted inside
//! the store, so everything in this module is plaintext.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A role within a tenant, as returned by the listing queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RoleInfo {
    pub role: String,
    pub description: Option<String>,
}

/// A bare role name, for the reverse-lookup payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RoleName {
    pub role: String,
}

/// A `(user, role)` association within a tenant.
///
/// Listing queries that fan out over roles return one entry per association,
/// so a user holding several qualifying roles appears several times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MembershipInfo {
    pub user: String,
    pub role: String,
}

/// A permission name granted to a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PermissionInfo {
    pub name: String,
}

/// Connection pool telemetry reported by `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PoolStats {
    /// Configured pool ceiling.
    pub pool_size: u32,
    /// Connections currently handed out to requests.
    pub checked_out: u32,
    /// Idle connections ready for checkout.
    pub available: u32,
    /// Connections open beyond the configured ceiling.
    pub overflow: u32,
    /// All connections currently open.
    pub total_connections: u32,
}

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub database: PoolStats,
}
