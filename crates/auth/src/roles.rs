use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use rolegate_core::{Entity, RoleId};

use crate::Permission;

/// Role name that bypasses every permission check unless configured otherwise.
pub const DEFAULT_SUPER_ADMIN_ROLE: &str = "Super Admin";

/// Request header through which a client suggests which assigned role it is
/// acting as. Servers must verify it against the token holder's roles.
pub const ACTIVE_ROLE_HEADER: &str = "x-active-role";

/// Human-facing role name (e.g. "Admin", "Agent").
///
/// Role names are compared exactly; portal filters and role predicates never
/// normalize case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleName(Cow<'static, str>);

impl RoleName {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for RoleName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A role assigned to an identity, with its permission set.
///
/// Roles are owned by the identity service. Nothing in this workspace mutates
/// a role after it has been loaded; switching roles swaps which role is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: RoleId,
    pub name: RoleName,
    pub permissions: Vec<Permission>,
    pub is_active: bool,
}

impl Role {
    pub fn new(id: RoleId, name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            id,
            name: RoleName::new(name),
            permissions: Vec::new(),
            is_active: true,
        }
    }

    pub fn with_permissions(mut self, permissions: Vec<Permission>) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name.as_str() == name
    }

    /// True iff the role holds an *active* permission entry with `code`.
    pub fn grants(&self, code: &str) -> bool {
        self.permissions.iter().any(|p| p.grants(code))
    }

    /// Active permission codes, in document order.
    pub fn active_codes(&self) -> impl Iterator<Item = &str> {
        self.permissions
            .iter()
            .filter(|p| p.is_active)
            .map(|p| p.code.as_str())
    }
}

impl Entity for Role {
    type Id = RoleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}
