use serde::{Deserialize, Serialize};

use rolegate_core::IdentityId;

use crate::{PortalPolicy, Role};

/// An authenticated identity as described by the identity service.
///
/// `assigned_roles` keeps the service's ordering: the first portal-relevant
/// role becomes the default active role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: IdentityId,
    pub assigned_roles: Vec<Role>,
}

impl Identity {
    pub fn new(id: IdentityId, assigned_roles: Vec<Role>) -> Self {
        Self { id, assigned_roles }
    }

    /// Roles relevant to the given portal, in assignment order.
    pub fn available_roles(&self, portal: &PortalPolicy) -> Vec<Role> {
        self.assigned_roles
            .iter()
            .filter(|role| portal.admits(role))
            .cloned()
            .collect()
    }
}
