//! # Authorization Service Module
//!
//! The decision engine. One instance is built per request from the shared
//! store and the caller's validated tenant key; every operation is scoped to
//! that tenant and never observes another tenant's graph.
//!
//! Reads answer the membership/permission questions; writes resolve their
//! endpoints via upserts and then link them, composing the store primitives
//! inside a single transaction where two tables are touched. Precondition
//! failures (granting to a role that does not exist) are reported as
//! `false`, not as errors; adding something that already exists reports
//! `true`.

use uuid::Uuid;

use crate::database::{AuthStore, LinkTable};
use crate::error::AuthError;
use crate::models::{MembershipInfo, PermissionInfo, RoleInfo, RoleName};

/// A tenant key must parse as a UUID, be version 4, and round-trip to its
/// canonical lower-case hyphenated form (so the compact and urn spellings
/// are rejected even though the parser accepts them).
fn is_valid_client_key(client: &str) -> bool {
    Uuid::parse_str(client)
        .map(|u| u.get_version_num() == 4 && u.to_string() == client.to_lowercase())
        .unwrap_or(false)
}

/// Tenant-scoped authorization engine.
pub struct AuthorizationService {
    store: AuthStore,
    client: String,
}

impl std::fmt::Debug for AuthorizationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationService")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

impl AuthorizationService {
    /// Build a service for a tenant, re-validating the key shape.
    ///
    /// The boundary has already checked the bearer token, so a failure here
    /// means a caller bypassed it; the error is the same `BadInput` either
    /// way.
    pub fn new(store: AuthStore, client: &str) -> Result<Self, AuthError> {
        if !is_valid_client_key(client) {
            return Err(AuthError::BadInput(format!(
                "Invalid client key: {client}. Client key must be a valid UUID4."
            )));
        }
        Ok(Self {
            store,
            client: client.to_lowercase(),
        })
    }

    /// Build a service without validating the key. Internal consumers
    /// (fixtures, maintenance jobs) that mint their own tenant keys use
    /// this; the HTTP boundary never does.
    pub fn new_unchecked(store: AuthStore, client: &str) -> Self {
        Self {
            store,
            client: client.to_lowercase(),
        }
    }

    pub fn client(&self) -> &str {
        &self.client
    }

    // --- reads ---

    /// Is `user` an active member of the active role `role`?
    pub async fn has_membership(&self, user: &str, role: &str) -> Result<bool, AuthError> {
        self.store.has_membership(&self.client, user, role).await
    }

    /// Does the active role `role` hold the active permission `name`?
    pub async fn has_permission(&self, role: &str, name: &str) -> Result<bool, AuthError> {
        self.store.has_permission(&self.client, role, name).await
    }

    /// Does `user` hold `name` through any active role? Resolved in a
    /// single join, not a fan-out over the user's roles.
    pub async fn user_has_permission(&self, user: &str, name: &str) -> Result<bool, AuthError> {
        self.store.user_has_permission(&self.client, user, name).await
    }

    /// All active roles of the tenant.
    pub async fn get_roles(&self) -> Result<Vec<RoleInfo>, AuthError> {
        self.store.list_roles(&self.client).await
    }

    /// Permissions held by a role.
    pub async fn get_permissions(&self, role: &str) -> Result<Vec<PermissionInfo>, AuthError> {
        self.store.role_permissions(&self.client, role).await
    }

    /// All permissions a user holds, one entry per role association.
    pub async fn get_user_permissions(&self, user: &str) -> Result<Vec<PermissionInfo>, AuthError> {
        self.store.user_permissions(&self.client, user).await
    }

    /// Roles a user belongs to, as `(user, role)` associations.
    pub async fn get_user_roles(&self, user: &str) -> Result<Vec<MembershipInfo>, AuthError> {
        self.store.user_roles(&self.client, user).await
    }

    /// Members of a role, as `(user, role)` associations.
    pub async fn get_role_members(&self, role: &str) -> Result<Vec<MembershipInfo>, AuthError> {
        self.store.role_members(&self.client, role).await
    }

    /// Roles granted the permission `name`.
    pub async fn which_roles_can(&self, name: &str) -> Result<Vec<RoleName>, AuthError> {
        let roles = self.store.roles_with_permission(&self.client, name).await?;
        Ok(roles.into_iter().map(|role| RoleName { role }).collect())
    }

    /// Users who hold the permission `name`, via any role. Duplicates are
    /// preserved per role association; the caller dedupes if it wants to.
    pub async fn which_users_can(&self, name: &str) -> Result<Vec<MembershipInfo>, AuthError> {
        let roles = self.store.roles_with_permission(&self.client, name).await?;
        let mut result = Vec::new();
        for role in roles {
            let members = self.store.role_members(&self.client, &role).await?;
            result.extend(members);
        }
        Ok(result)
    }

    // --- writes ---

    /// Create a role, or revive/refresh it if the name already exists.
    /// Always `true`: the post-state contains the role.
    pub async fn add_role(&self, role: &str, description: Option<&str>) -> Result<bool, AuthError> {
        self.store
            .upsert_role(self.store.pool(), &self.client, role, description)
            .await?;
        Ok(true)
    }

    /// Soft-delete a role. `true` iff the role was active before the call.
    pub async fn del_role(&self, role: &str) -> Result<bool, AuthError> {
        self.store
            .deactivate_role(self.store.pool(), &self.client, role)
            .await
    }

    /// Put `user` into `role`. The membership row is created on first
    /// grant; the role must already exist and be active, otherwise `false`.
    pub async fn add_membership(&self, user: &str, role: &str) -> Result<bool, AuthError> {
        let mut tx = self.store.pool().begin().await?;

        let Some(role_id) = self
            .store
            .find_active_role_id(&mut *tx, &self.client, role)
            .await?
        else {
            return Ok(false);
        };

        let membership_id = self
            .store
            .upsert_membership(&mut *tx, &self.client, user)
            .await?;
        self.store
            .link(&mut *tx, LinkTable::MembershipRoles, membership_id, role_id)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Remove `user` from `role`. Unlink only: the membership row remains
    /// for its other roles or a later re-grant. `true` unconditionally once
    /// the post-state no longer contains the link.
    pub async fn del_membership(&self, user: &str, role: &str) -> Result<bool, AuthError> {
        let pool = self.store.pool();
        let role_id = self.store.find_role_id(pool, &self.client, role).await?;
        let membership_id = self
            .store
            .find_membership_id(pool, &self.client, user)
            .await?;

        if let (Some(role_id), Some(membership_id)) = (role_id, membership_id) {
            self.store
                .unlink(pool, LinkTable::MembershipRoles, membership_id, role_id)
                .await?;
        }
        Ok(true)
    }

    /// Grant the permission `name` to `role`. The permission row is created
    /// on first grant; the role must already exist and be active, otherwise
    /// `false`.
    pub async fn add_permission(&self, role: &str, name: &str) -> Result<bool, AuthError> {
        let mut tx = self.store.pool().begin().await?;

        let Some(role_id) = self
            .store
            .find_active_role_id(&mut *tx, &self.client, role)
            .await?
        else {
            return Ok(false);
        };

        let permission_id = self
            .store
            .upsert_permission(&mut *tx, &self.client, name)
            .await?;
        self.store
            .link(&mut *tx, LinkTable::PermissionRoles, permission_id, role_id)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Revoke the permission `name` from `role`. Unlink only: the
    /// permission row stays, it may be linked to other roles. `true`
    /// unconditionally once the post-state no longer contains the link.
    pub async fn del_permission(&self, role: &str, name: &str) -> Result<bool, AuthError> {
        let pool = self.store.pool();
        let role_id = self.store.find_role_id(pool, &self.client, role).await?;
        let permission_id = self
            .store
            .find_permission_id(pool, &self.client, name)
            .await?;

        if let (Some(role_id), Some(permission_id)) = (role_id, permission_id) {
            self.store
                .unlink(pool, LinkTable::PermissionRoles, permission_id, role_id)
                .await?;
        }
        Ok(true)
    }
}
