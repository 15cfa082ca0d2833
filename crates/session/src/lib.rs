//! `rolegate-session`
//!
//! **Responsibility:** client-side session lifecycle and role-scoped
//! authorization.
//!
//! This crate provides:
//! - Credential persistence (token + selected active role)
//! - Identity loading and portal role filtering
//! - Active-role switching and permission checks
//! - Forced logout at token expiry and on 401 responses
//! - Outbound request decoration (`Authorization`, `X-Active-Role`)
//! - Route gating for a navigation layer
//!
//! [`SessionManager`] is the only public entry point that mutates state; UI
//! layers subscribe to [`SessionState`] changes instead of reading shared
//! fields.

pub mod config;
pub mod credentials;
pub mod error;
pub mod guard;
pub mod identity_service;
pub mod manager;
pub mod profile;
pub mod propagator;
pub mod session;
pub mod watchdog;

pub use config::SessionConfig;
pub use credentials::{Credential, CredentialStore, FileCredentialStore, MemoryCredentialStore, StoreError};
pub use error::{ClientError, IdentityFetchError, SessionError};
pub use guard::{GuardDecision, GuardState, Requirement, RouteGuard};
pub use identity_service::{HttpIdentityService, IdentityService, LoginRequest};
pub use manager::{SessionManager, TeardownReason};
pub use propagator::{AuthorizedClient, AuthorizedRequest};
pub use session::{Session, SessionState};
pub use watchdog::{ArmOutcome, ExpiryWatchdog};
