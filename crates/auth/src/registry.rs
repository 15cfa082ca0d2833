//! In-memory view of the roles an identity may act as on this portal.

use rolegate_core::{Entity, RoleId};

use crate::{Identity, PortalPolicy, Role};

/// Available roles plus the one currently active.
///
/// # Invariants
/// - `active()` is `None` iff `available()` is empty.
/// - `active()` is always an element of `available()`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoleRegistry {
    available: Vec<Role>,
    active: Option<usize>,
}

impl RoleRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the registry for `identity` on `portal`.
    ///
    /// The active role is the one named by `preferred` when it is available,
    /// otherwise the first available role.
    pub fn resolve(identity: &Identity, portal: &PortalPolicy, preferred: Option<&RoleId>) -> Self {
        Self::from_available(identity.available_roles(portal), preferred)
    }

    pub fn from_available(available: Vec<Role>, preferred: Option<&RoleId>) -> Self {
        let active = preferred
            .and_then(|id| available.iter().position(|r| r.id() == id))
            .or(if available.is_empty() { None } else { Some(0) });

        if let (Some(wanted), Some(idx)) = (preferred, active) {
            if available[idx].id() != wanted {
                tracing::debug!(
                    preferred = %wanted,
                    selected = %available[idx].id,
                    "preferred role unavailable; falling back to first available role"
                );
            }
        }

        Self { available, active }
    }

    pub fn available(&self) -> &[Role] {
        &self.available
    }

    pub fn active(&self) -> Option<&Role> {
        self.active.and_then(|idx| self.available.get(idx))
    }

    pub fn active_id(&self) -> Option<&RoleId> {
        self.active().map(|r| &r.id)
    }

    pub fn find(&self, role_id: &str) -> Option<&Role> {
        self.available.iter().find(|r| r.id == *role_id)
    }

    /// Make `role_id` the active role.
    ///
    /// Unknown ids leave the registry untouched and return `false`.
    pub fn switch_to(&mut self, role_id: &str) -> bool {
        match self.available.iter().position(|r| r.id == *role_id) {
            Some(idx) => {
                self.active = Some(idx);
                true
            }
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.available.is_empty()
    }
}
