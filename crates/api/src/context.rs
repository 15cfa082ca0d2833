use rolegate_auth::Role;
use rolegate_core::IdentityId;

/// Principal context for a request (verified token subject + assigned roles).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    identity_id: IdentityId,
    roles: Vec<Role>,
}

impl PrincipalContext {
    pub fn new(identity_id: IdentityId, roles: Vec<Role>) -> Self {
        Self { identity_id, roles }
    }

    pub fn identity_id(&self) -> &IdentityId {
        &self.identity_id
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    /// An assigned, active role with the given id.
    pub fn assigned_role(&self, role_id: &str) -> Option<&Role> {
        self.roles
            .iter()
            .find(|role| role.is_active && role.id.as_str() == role_id)
    }
}

/// The role the client is acting as, after it was checked against the
/// principal's assignments. Absent when the client sent no `X-Active-Role`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveRoleContext {
    role: Role,
}

impl ActiveRoleContext {
    pub fn new(role: Role) -> Self {
        Self { role }
    }

    pub fn role(&self) -> &Role {
        &self.role
    }
}
