//! Reference HTTP backend for the role-scoped session client.
//!
//! Serves the identity document (`GET /profile`), issues tokens
//! (`POST /auth/login`) and verifies the `X-Active-Role` header a client sends
//! against the roles actually assigned to the token holder.

pub mod app;
pub mod config;
pub mod context;
pub mod directory;
pub mod middleware;

pub use app::{build_app, AppState};
pub use config::ApiConfig;
pub use context::{ActiveRoleContext, PrincipalContext};
pub use directory::{Account, InMemoryDirectory, RoleDirectory};
