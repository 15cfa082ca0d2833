//! `rolegate-auth`: pure authorization model (roles, permissions, evaluation).
//!
//! This crate is intentionally decoupled from HTTP, storage and timers.

pub mod authorize;
pub mod claims;
pub mod identity;
pub mod permissions;
pub mod portal;
pub mod registry;
pub mod roles;

pub use authorize::{
    authorize, explain, has_any_role, has_permission, has_role, AuthorizationExplanation,
    AuthzError, DecisionKind,
};
pub use claims::{
    decode_expiry, validate_claims, Hs256JwtValidator, JwtValidator, TokenClaims,
    TokenValidationError,
};
pub use identity::Identity;
pub use permissions::{Permission, PermissionCode};
pub use portal::PortalPolicy;
pub use registry::RoleRegistry;
pub use roles::{Role, RoleName, ACTIVE_ROLE_HEADER, DEFAULT_SUPER_ADMIN_ROLE};
