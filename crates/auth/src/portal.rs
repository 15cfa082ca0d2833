//! Portal relevance rules.
//!
//! The same identity service backs several portals. Each portal only exposes
//! the roles meant for it; the rest are filtered out before any role can
//! become active.

use serde::{Deserialize, Serialize};

use crate::Role;

/// Role name reserved for the agent portal.
pub const AGENT_ROLE: &str = "Agent";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "roles", rename_all = "snake_case")]
pub enum PortalPolicy {
    /// Every active role is relevant.
    All,
    /// Every active role except the named ones.
    Excluding(Vec<String>),
    /// Only the named active roles.
    Only(Vec<String>),
}

impl PortalPolicy {
    /// The admin portal: everything except agent-only roles.
    pub fn admin() -> Self {
        Self::Excluding(vec![AGENT_ROLE.to_string()])
    }

    /// The agent portal: agent roles only.
    pub fn agent() -> Self {
        Self::Only(vec![AGENT_ROLE.to_string()])
    }

    pub fn all() -> Self {
        Self::All
    }

    /// Whether `role` may be offered on this portal. Inactive roles never are.
    pub fn admits(&self, role: &Role) -> bool {
        if !role.is_active {
            return false;
        }
        match self {
            PortalPolicy::All => true,
            PortalPolicy::Excluding(names) => !names.iter().any(|n| role.is_named(n)),
            PortalPolicy::Only(names) => names.iter().any(|n| role.is_named(n)),
        }
    }

    /// Parse a portal name as used in configuration (`admin`, `agent`, `all`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Self::admin()),
            "agent" => Some(Self::agent()),
            "all" => Some(Self::all()),
            _ => None,
        }
    }
}

impl Default for PortalPolicy {
    fn default() -> Self {
        Self::admin()
    }
}

#[cfg(test)]
mod tests {
    use rolegate_core::RoleId;

    use super::*;

    fn role(id: &str, name: &'static str) -> Role {
        Role::new(RoleId::parse(id).unwrap(), name)
    }

    #[test]
    fn admin_portal_excludes_agent() {
        let portal = PortalPolicy::admin();
        assert!(!portal.admits(&role("1", "Agent")));
        assert!(portal.admits(&role("2", "Admin")));
    }

    #[test]
    fn agent_portal_only_admits_agent() {
        let portal = PortalPolicy::agent();
        assert!(portal.admits(&role("1", "Agent")));
        assert!(!portal.admits(&role("2", "Admin")));
    }

    #[test]
    fn inactive_roles_are_never_admitted() {
        let inactive = role("2", "Admin").with_active(false);
        assert!(!PortalPolicy::all().admits(&inactive));
        assert!(!PortalPolicy::admin().admits(&inactive));
    }

    #[test]
    fn portal_names_parse() {
        assert_eq!(PortalPolicy::from_name("Admin"), Some(PortalPolicy::admin()));
        assert_eq!(PortalPolicy::from_name("all"), Some(PortalPolicy::All));
        assert_eq!(PortalPolicy::from_name("partner"), None);
    }
}
