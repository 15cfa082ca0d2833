//! Forced logout at the credential's expiry instant.
//!
//! At most one timer is live at any time: arming always cancels the previous
//! timer under the same lock that installs the new one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::AbortHandle;

use rolegate_auth::decode_expiry;

#[derive(Debug)]
struct Armed {
    generation: u64,
    expires_at: DateTime<Utc>,
    handle: AbortHandle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmOutcome {
    /// A timer fires after `remaining`.
    Armed {
        expires_at: DateTime<Utc>,
        remaining: Duration,
    },
    /// The token is unparsable or already expired; no timer was armed and the
    /// caller must tear down immediately.
    Expired,
}

#[derive(Debug, Default)]
pub struct ExpiryWatchdog {
    slot: Arc<Mutex<Option<Armed>>>,
    generation: AtomicU64,
}

fn lock(slot: &Mutex<Option<Armed>>) -> MutexGuard<'_, Option<Armed>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ExpiryWatchdog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel any live timer and arm one for `token`'s expiry.
    ///
    /// `on_expire` runs on the tokio runtime once the expiry instant is
    /// reached, unless the timer is disarmed or re-armed first. Must be called
    /// from within a tokio runtime.
    pub fn arm<F>(&self, token: &str, on_expire: F) -> ArmOutcome
    where
        F: FnOnce() + Send + 'static,
    {
        let mut slot = lock(&self.slot);
        if let Some(previous) = slot.take() {
            previous.handle.abort();
            tracing::debug!(expires_at = %previous.expires_at, "cancelled previous expiry timer");
        }

        let expires_at = match decode_expiry(token) {
            Ok(expires_at) => expires_at,
            Err(e) => {
                tracing::warn!(error = %e, "token expiry unreadable; treating as expired");
                return ArmOutcome::Expired;
            }
        };

        let remaining = match (expires_at - Utc::now()).to_std() {
            Ok(remaining) if !remaining.is_zero() => remaining,
            _ => {
                tracing::info!(%expires_at, "token already expired");
                return ArmOutcome::Expired;
            }
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let timer_slot = Arc::clone(&self.slot);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(remaining).await;
            {
                let mut slot = lock(&timer_slot);
                match slot.as_ref() {
                    Some(armed) if armed.generation == generation => *slot = None,
                    _ => return,
                }
            }
            tracing::info!(%expires_at, "token expired; forcing logout");
            on_expire();
        })
        .abort_handle();

        *slot = Some(Armed {
            generation,
            expires_at,
            handle,
        });
        let remaining_ms = u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX);
        tracing::debug!(%expires_at, remaining_ms, "armed expiry timer");

        ArmOutcome::Armed {
            expires_at,
            remaining,
        }
    }

    /// Cancel the live timer, if any. Returns whether one was cancelled.
    pub fn disarm(&self) -> bool {
        match lock(&self.slot).take() {
            Some(armed) => {
                armed.handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        lock(&self.slot).is_some()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        lock(&self.slot).as_ref().map(|armed| armed.expires_at)
    }
}

impl Drop for ExpiryWatchdog {
    fn drop(&mut self) {
        self.disarm();
    }
}
