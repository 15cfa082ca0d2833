//! Permission evaluation against the *active* role.
//!
//! - No IO
//! - No panics
//! - Only the active role is ever consulted; other assigned roles answer
//!   "what could I become", not "what am I acting as".

use serde::Serialize;
use thiserror::Error;

use crate::Role;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("no active role")]
    NoActiveRole,

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Evaluate `code` for the active role.
///
/// 1. No active role: deny.
/// 2. Active role named `super_admin_role`: allow without looking at permissions.
/// 3. Otherwise allow iff the role holds an active entry with `code`.
pub fn has_permission(active: Option<&Role>, code: &str, super_admin_role: &str) -> bool {
    match active {
        None => false,
        Some(role) if role.is_named(super_admin_role) => true,
        Some(role) => role.grants(code),
    }
}

/// `Result` form of [`has_permission`], for call sites that propagate with `?`.
pub fn authorize(active: Option<&Role>, code: &str, super_admin_role: &str) -> Result<(), AuthzError> {
    match active {
        None => Err(AuthzError::NoActiveRole),
        Some(_) if has_permission(active, code, super_admin_role) => Ok(()),
        Some(_) => Err(AuthzError::Forbidden(code.to_string())),
    }
}

pub fn has_role(active: Option<&Role>, name: &str) -> bool {
    active.is_some_and(|role| role.is_named(name))
}

pub fn has_any_role<S: AsRef<str>>(active: Option<&Role>, names: &[S]) -> bool {
    active.is_some_and(|role| names.iter().any(|n| role.is_named(n.as_ref())))
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Why a permission check came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    NoActiveRole,
    SuperAdminBypass,
    Granted,
    /// The role carries the code, but the entry is inactive.
    InactiveGrant,
    MissingPermission,
}

/// Detailed, serializable record of a permission decision.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub required_permission: String,
    pub granted: bool,
    pub kind: DecisionKind,
    pub active_role: Option<String>,
    pub effective_permissions: Vec<String>,
    pub reason: String,
}

/// Explain the decision [`has_permission`] would make.
pub fn explain(active: Option<&Role>, code: &str, super_admin_role: &str) -> AuthorizationExplanation {
    let Some(role) = active else {
        return AuthorizationExplanation {
            required_permission: code.to_string(),
            granted: false,
            kind: DecisionKind::NoActiveRole,
            active_role: None,
            effective_permissions: Vec::new(),
            reason: "No active role is selected".to_string(),
        };
    };

    let mut effective: Vec<String> = role.active_codes().map(str::to_string).collect();
    effective.sort();
    effective.dedup();

    let (kind, reason) = if role.is_named(super_admin_role) {
        (
            DecisionKind::SuperAdminBypass,
            format!("Active role '{}' bypasses all permission checks", role.name),
        )
    } else if role.grants(code) {
        (
            DecisionKind::Granted,
            format!("Active role '{}' grants '{}'", role.name, code),
        )
    } else if role.permissions.iter().any(|p| p.code.as_str() == code) {
        (
            DecisionKind::InactiveGrant,
            format!("Active role '{}' carries '{}' but the permission is inactive", role.name, code),
        )
    } else {
        (
            DecisionKind::MissingPermission,
            format!("Active role '{}' does not carry '{}'", role.name, code),
        )
    };

    AuthorizationExplanation {
        required_permission: code.to_string(),
        granted: matches!(kind, DecisionKind::SuperAdminBypass | DecisionKind::Granted),
        kind,
        active_role: Some(role.name.to_string()),
        effective_permissions: effective,
        reason,
    }
}
