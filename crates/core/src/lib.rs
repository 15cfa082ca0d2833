//! `rolegate-core`: shared primitives for the authorization workspace.
//!
//! This crate contains **pure** building blocks (no IO, no async).

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{IdentityId, PermissionId, RoleId};
