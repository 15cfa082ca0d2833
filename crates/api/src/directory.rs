//! Source of truth for who holds which roles.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use rolegate_auth::Role;
use rolegate_core::IdentityId;

/// Lookup seam for assigned roles and login credentials.
pub trait RoleDirectory: Send + Sync {
    /// Roles assigned to `identity`, in assignment order. `None` for unknown identities.
    fn assigned_roles(&self, identity: &IdentityId) -> Option<Vec<Role>>;

    /// Identity owning the given login credentials.
    fn authenticate(&self, email: &str, password: &str) -> Option<IdentityId>;
}

/// A login account held by [`InMemoryDirectory`].
#[derive(Clone)]
pub struct Account {
    pub id: IdentityId,
    pub email: String,
    pub password: String,
    pub roles: Vec<Role>,
}

impl Account {
    pub fn new(
        id: IdentityId,
        email: impl Into<String>,
        password: impl Into<String>,
        roles: Vec<Role>,
    ) -> Self {
        Self {
            id,
            email: email.into(),
            password: password.into(),
            roles,
        }
    }
}

impl core::fmt::Debug for Account {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("roles", &self.roles)
            .finish()
    }
}

/// Dev/test directory. Passwords are compared in plain text.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    accounts: RwLock<HashMap<IdentityId, Account>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(self, account: Account) -> Self {
        self.insert(account);
        self
    }

    pub fn insert(&self, account: Account) {
        self.write().insert(account.id.clone(), account);
    }

    /// Replace an identity's role assignments. Returns `false` for unknown identities.
    pub fn set_roles(&self, identity: &IdentityId, roles: Vec<Role>) -> bool {
        match self.write().get_mut(identity) {
            Some(account) => {
                account.roles = roles;
                true
            }
            None => false,
        }
    }

    /// Forget an identity; its tokens stop verifying.
    pub fn remove(&self, identity: &IdentityId) -> bool {
        self.write().remove(identity).is_some()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<IdentityId, Account>> {
        self.accounts.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<IdentityId, Account>> {
        self.accounts.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RoleDirectory for InMemoryDirectory {
    fn assigned_roles(&self, identity: &IdentityId) -> Option<Vec<Role>> {
        self.read().get(identity).map(|account| account.roles.clone())
    }

    fn authenticate(&self, email: &str, password: &str) -> Option<IdentityId> {
        self.read()
            .values()
            .find(|account| account.email.eq_ignore_ascii_case(email) && account.password == password)
            .map(|account| account.id.clone())
    }
}
