//! The live, in-memory projection of an authenticated identity.

use std::sync::Arc;

use rolegate_auth::{authorize, AuthorizationExplanation, Identity, Role, RoleRegistry};
use rolegate_core::RoleId;

/// Identity plus the roles it may act as on this portal.
///
/// A `Session` is immutable; role switches and refreshes publish a new value
/// so readers never observe a mix of old and new role sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    identity: Identity,
    registry: RoleRegistry,
}

impl Session {
    pub fn new(identity: Identity, registry: RoleRegistry) -> Self {
        Self { identity, registry }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn available_roles(&self) -> &[Role] {
        self.registry.available()
    }

    pub fn active_role(&self) -> Option<&Role> {
        self.registry.active()
    }

    pub fn active_role_id(&self) -> Option<&RoleId> {
        self.registry.active_id()
    }

    /// A copy of this session acting as `role_id`, if that role is available.
    pub fn switched_to(&self, role_id: &str) -> Option<Session> {
        let mut registry = self.registry.clone();
        registry.switch_to(role_id).then(|| Session {
            identity: self.identity.clone(),
            registry,
        })
    }

    pub fn has_permission(&self, code: &str, super_admin_role: &str) -> bool {
        authorize::has_permission(self.active_role(), code, super_admin_role)
    }

    pub fn has_role(&self, name: &str) -> bool {
        authorize::has_role(self.active_role(), name)
    }

    pub fn has_any_role<S: AsRef<str>>(&self, names: &[S]) -> bool {
        authorize::has_any_role(self.active_role(), names)
    }

    pub fn explain(&self, code: &str, super_admin_role: &str) -> AuthorizationExplanation {
        authorize::explain(self.active_role(), code, super_admin_role)
    }
}

/// What subscribers observe. Replaced as a whole on every transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// True until the first load resolves, and while a non-silent refresh runs.
    pub loading: bool,
    pub session: Option<Arc<Session>>,
}

impl SessionState {
    pub(crate) fn initial() -> Self {
        Self {
            loading: true,
            session: None,
        }
    }

    pub fn active_role(&self) -> Option<&Role> {
        self.session.as_deref().and_then(Session::active_role)
    }

    pub fn is_authenticated(&self) -> bool {
        self.active_role().is_some()
    }
}
