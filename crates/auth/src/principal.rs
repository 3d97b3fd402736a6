use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use warden_core::TenantId;

use crate::{Permission, PolicyDocument, Role};

/// Identity of an authenticated principal (human user, service account, etc).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(Uuid);

impl PrincipalId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PrincipalId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for PrincipalId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<PrincipalId> for Uuid {
    fn from(value: PrincipalId) -> Self {
        value.0
    }
}

impl FromStr for PrincipalId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// A fully resolved principal for authorization decisions.
///
/// Rebuilt per request from verified token claims plus whatever the data
/// layer holds for the subject; never persisted here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub principal_id: PrincipalId,
    pub tenant_id: TenantId,
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
    pub policies: Vec<PolicyDocument>,
}

impl Principal {
    pub fn new(principal_id: PrincipalId, tenant_id: TenantId) -> Self {
        Self {
            principal_id,
            tenant_id,
            roles: Vec::new(),
            permissions: Vec::new(),
            policies: Vec::new(),
        }
    }

    /// Aggregate the permission set from role assignments.
    ///
    /// `role_permissions` maps a role name to the permission strings it
    /// grants. Duplicates are dropped, first occurrence wins the position.
    pub fn from_roles<F>(
        principal_id: PrincipalId,
        tenant_id: TenantId,
        roles: Vec<Role>,
        role_permissions: F,
    ) -> Self
    where
        F: Fn(&str) -> Vec<String>,
    {
        let mut permissions: Vec<Permission> = Vec::new();
        for role in &roles {
            for perm in role_permissions(role.as_str()) {
                let perm = Permission::from(perm);
                if !permissions.contains(&perm) {
                    permissions.push(perm);
                }
            }
        }

        Self {
            principal_id,
            tenant_id,
            roles,
            permissions,
            policies: Vec::new(),
        }
    }

    pub fn with_permission(mut self, permission: impl Into<Permission>) -> Self {
        let permission = permission.into();
        if !self.permissions.contains(&permission) {
            self.permissions.push(permission);
        }
        self
    }

    pub fn with_policy(mut self, document: PolicyDocument) -> Self {
        self.policies.push(document);
        self
    }
}
