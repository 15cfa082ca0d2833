//! Durable storage for the bearer token and the selected active role.
//!
//! Every operation replaces or reads the whole [`Credential`] under one lock,
//! so a racing `save` and `clear` always leave one of the two end states.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use rolegate_core::RoleId;

/// Persisted bearer token plus the last-selected active role id.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub token: String,
    #[serde(default)]
    pub active_role_id: Option<RoleId>,
}

impl Credential {
    pub fn new(token: impl Into<String>, active_role_id: Option<RoleId>) -> Self {
        Self {
            token: token.into(),
            active_role_id,
        }
    }
}

// Tokens never end up in logs.
impl core::fmt::Debug for Credential {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("active_role_id", &self.active_role_id)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("credential store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("credential store is corrupt: {0}")]
    Corrupt(String),
}

/// Key/value persistence for the credential.
pub trait CredentialStore: Send + Sync {
    fn save(&self, token: &str, active_role_id: Option<&RoleId>) -> Result<(), StoreError>;

    fn load(&self) -> Result<Option<Credential>, StoreError>;

    fn clear(&self) -> Result<(), StoreError>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Process-local store; does not survive restarts.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<Credential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn save(&self, token: &str, active_role_id: Option<&RoleId>) -> Result<(), StoreError> {
        *lock(&self.slot) = Some(Credential::new(token, active_role_id.cloned()));
        Ok(())
    }

    fn load(&self) -> Result<Option<Credential>, StoreError> {
        Ok(lock(&self.slot).clone())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *lock(&self.slot) = None;
        Ok(())
    }
}

/// JSON file store that survives process restarts on one device.
///
/// Writes go to a sibling temp file which is then renamed over the target,
/// so readers in other processes never observe a half-written document.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    /// Store under the OS data directory (`<data_dir>/rolegate/credentials.json`).
    pub fn in_default_location() -> anyhow::Result<Self> {
        Ok(Self::new(default_credentials_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CredentialStore for FileCredentialStore {
    fn save(&self, token: &str, active_role_id: Option<&RoleId>) -> Result<(), StoreError> {
        let _guard = lock(&self.guard);

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let credential = Credential::new(token, active_role_id.cloned());
        let body = serde_json::to_vec_pretty(&credential)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        let tmp = self.temp_path();
        std::fs::write(&tmp, body)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn load(&self) -> Result<Option<Credential>, StoreError> {
        let _guard = lock(&self.guard);

        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let credential: Credential = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::Corrupt(format!("{}: {e}", self.path.display())))?;

        if credential.token.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(credential))
    }

    fn clear(&self) -> Result<(), StoreError> {
        let _guard = lock(&self.guard);

        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

pub fn default_credentials_path() -> anyhow::Result<PathBuf> {
    let base = dirs::data_dir()
        .or_else(|| {
            dirs::home_dir().map(|mut h| {
                h.push(".local");
                h.push("share");
                h
            })
        })
        .context("failed to resolve OS app data directory - tried data_dir() and home_dir()/.local/share")?;

    let mut path = base;
    path.push("rolegate");
    path.push("credentials.json");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn role_id(id: &str) -> RoleId {
        RoleId::parse(id).unwrap()
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryCredentialStore::new();
        assert!(store.load().unwrap().is_none());

        store.save("tok", Some(&role_id("r1"))).unwrap();
        assert_eq!(store.load().unwrap(), Some(Credential::new("tok", Some(role_id("r1")))));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("credentials.json");

        FileCredentialStore::new(&path).save("tok", Some(&role_id("7"))).unwrap();

        let reopened = FileCredentialStore::new(&path);
        assert_eq!(reopened.load().unwrap(), Some(Credential::new("tok", Some(role_id("7")))));

        reopened.clear().unwrap();
        assert!(reopened.load().unwrap().is_none());
        // Clearing twice is fine.
        reopened.clear().unwrap();
    }

    #[test]
    fn file_store_reads_documents_without_role() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, r#"{"token":"tok"}"#).unwrap();

        let store = FileCredentialStore::new(&path);
        assert_eq!(store.load().unwrap(), Some(Credential::new("tok", None)));
    }

    #[test]
    fn file_store_reports_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, b"{not json").unwrap();

        let store = FileCredentialStore::new(&path);
        assert!(matches!(store.load(), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn debug_output_redacts_token() {
        let credential = Credential::new("super-secret", None);
        assert!(!format!("{credential:?}").contains("super-secret"));
    }

    #[test]
    fn concurrent_save_and_clear_never_tear() {
        let store = Arc::new(MemoryCredentialStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        if i % 2 == 0 {
                            store.save("tok-a", Some(&role_id("a"))).unwrap();
                        } else {
                            store.clear().unwrap();
                        }
                        if let Some(c) = store.load().unwrap() {
                            assert_eq!(c, Credential::new("tok-a", Some(role_id("a"))));
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }
}
