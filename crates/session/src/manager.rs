//! Session lifecycle: login, restore, refresh, role switch, logout.
//!
//! The manager is the only writer of the session state and (together with
//! role switches) of the credential store. Subscribers observe whole-state
//! replacements through a `watch` channel.
//!
//! Ordering rules:
//! - `login` saves the token before the refresh it triggers.
//! - Teardown clears the store before the session is nulled.
//! - A refresh applies its result only if the credential generation it
//!   started with is still current; otherwise the result is discarded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;

use rolegate_auth::{AuthorizationExplanation, Role, RoleRegistry};

use crate::config::SessionConfig;
use crate::credentials::{Credential, CredentialStore, FileCredentialStore};
use crate::error::SessionError;
use crate::guard::{GuardDecision, RouteGuard};
use crate::identity_service::{HttpIdentityService, IdentityService, LoginRequest};
use crate::session::{Session, SessionState};
use crate::watchdog::{ArmOutcome, ExpiryWatchdog};

/// Why a session ended. Logged only; subscribers see the same empty state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownReason {
    Logout,
    Expired,
    Unauthorized,
    IdentityFetchFailed,
    CredentialStoreFailed,
}

struct Inner {
    config: SessionConfig,
    store: Arc<dyn CredentialStore>,
    identity: Arc<dyn IdentityService>,
    state: watch::Sender<SessionState>,
    watchdog: ExpiryWatchdog,
    /// Bumped whenever the stored token changes or is cleared.
    epoch: AtomicU64,
    /// Serializes check-then-apply steps against teardown.
    transition: Mutex<()>,
}

impl Inner {
    fn transition(&self) -> MutexGuard<'_, ()> {
        self.transition
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn load_credential(&self) -> Option<Credential> {
        match self.store.load() {
            Ok(credential) => credential,
            Err(e) => {
                tracing::warn!(error = %e, "credential store unreadable; treating as signed out");
                if let Err(e) = self.store.clear() {
                    tracing::error!(error = %e, "failed to clear unreadable credential store");
                }
                None
            }
        }
    }

    fn teardown(&self, reason: TeardownReason) {
        let _transition = self.transition();
        self.teardown_locked(reason);
    }

    fn teardown_locked(&self, reason: TeardownReason) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.watchdog.disarm();
        if let Err(e) = self.store.clear() {
            tracing::error!(error = %e, "failed to clear credential store during teardown");
        }
        self.state.send_modify(|state| {
            state.loading = false;
            state.session = None;
        });
        tracing::info!(?reason, "session ended");
    }

    fn set_loading(&self, loading: bool) {
        self.state
            .send_if_modified(|state| std::mem::replace(&mut state.loading, loading) != loading);
    }

    fn set_signed_out(&self) {
        self.state.send_if_modified(|state| {
            let changed = state.loading || state.session.is_some();
            state.loading = false;
            state.session = None;
            changed
        });
    }
}

/// Cheap-to-clone handle to the authorization core.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    pub fn new(
        config: SessionConfig,
        store: Arc<dyn CredentialStore>,
        identity: Arc<dyn IdentityService>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::initial());
        Self {
            inner: Arc::new(Inner {
                config,
                store,
                identity,
                state,
                watchdog: ExpiryWatchdog::new(),
                epoch: AtomicU64::new(0),
                transition: Mutex::new(()),
            }),
        }
    }

    /// Wire the manager to the HTTP identity service and a file-backed store.
    ///
    /// Returns the shared HTTP client so callers can build an
    /// [`AuthorizedClient`](crate::AuthorizedClient) on the same connection pool.
    pub fn with_http(config: SessionConfig) -> anyhow::Result<(Self, reqwest::Client)> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        let store = match &config.credential_path {
            Some(path) => FileCredentialStore::new(path),
            None => FileCredentialStore::in_default_location()?,
        };
        tracing::debug!(path = %store.path().display(), "using file credential store");

        let identity = HttpIdentityService::new(http.clone(), config.clone());
        Ok((Self::new(config, Arc::new(store), Arc::new(identity)), http))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    pub fn session(&self) -> Option<Arc<Session>> {
        self.inner.state.borrow().session.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().loading
    }

    pub fn credential(&self) -> Option<Credential> {
        self.inner.load_credential()
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.inner.epoch.load(Ordering::SeqCst)
    }

    /// The stored credential together with the generation it belongs to.
    pub(crate) fn credential_snapshot(&self) -> (u64, Option<Credential>) {
        let _transition = self.inner.transition();
        let credential = self.inner.load_credential();
        (self.epoch(), credential)
    }

    /// Initial load for this process: arm the expiry timer for the stored
    /// token, then refresh with the loading indicator shown.
    pub async fn restore(&self) -> Result<Option<Arc<Session>>, SessionError> {
        let Some(credential) = self.inner.load_credential() else {
            self.inner.set_signed_out();
            return Ok(None);
        };

        self.arm_watchdog(&credential.token)?;
        self.refresh(false).await
    }

    /// Adopt a freshly issued token and load its identity.
    ///
    /// The previously persisted active role id is kept as a preference.
    pub async fn login(&self, token: impl Into<String>) -> Result<Option<Arc<Session>>, SessionError> {
        let token = token.into();
        self.inner.set_loading(true);
        {
            let _transition = self.inner.transition();
            let preferred = self.inner.load_credential().and_then(|c| c.active_role_id);
            if let Err(e) = self.inner.store.save(&token, preferred.as_ref()) {
                self.inner.set_loading(false);
                return Err(e.into());
            }
            self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        }
        tracing::info!("credential saved; loading identity");

        self.arm_watchdog(&token)?;
        self.refresh(true).await
    }

    /// Exchange email/password for a token, then [`login`](Self::login).
    pub async fn login_with_password(
        &self,
        request: &LoginRequest,
    ) -> Result<Option<Arc<Session>>, SessionError> {
        self.inner.set_loading(true);
        let token = match self.inner.identity.exchange_credentials(request).await {
            Ok(token) => token,
            Err(e) => {
                tracing::info!(error = %e, "credential exchange failed");
                self.inner.set_loading(false);
                return Err(e.into());
            }
        };
        self.login(token).await
    }

    pub fn logout(&self) {
        self.inner.teardown(TeardownReason::Logout);
    }

    /// Tear down only if no other login/logout happened since `epoch`.
    pub(crate) fn teardown_if_current(&self, epoch: u64, reason: TeardownReason) {
        let _transition = self.inner.transition();
        if self.inner.epoch.load(Ordering::SeqCst) == epoch {
            self.inner.teardown_locked(reason);
        } else {
            tracing::debug!(?reason, "ignoring teardown for a superseded credential");
        }
    }

    fn arm_watchdog(&self, token: &str) -> Result<(), SessionError> {
        let epoch = self.epoch();
        let weak = Arc::downgrade(&self.inner);

        let outcome = self.inner.watchdog.arm(token, move || {
            if let Some(inner) = weak.upgrade() {
                SessionManager { inner }.teardown_if_current(epoch, TeardownReason::Expired);
            }
        });

        match outcome {
            ArmOutcome::Armed { .. } => Ok(()),
            ArmOutcome::Expired => {
                self.inner.teardown(TeardownReason::Expired);
                Err(SessionError::ExpiredCredential)
            }
        }
    }

    /// Exchange the stored token for the identity document and publish the
    /// resulting session.
    ///
    /// - No token: `Ok(None)`, loading cleared.
    /// - Fetch failure: session torn down, store cleared, error returned.
    /// - Logout or a new login while the fetch was in flight: result discarded,
    ///   `Ok(None)`, state untouched.
    /// - Store unreadable after the fetch: session torn down, error returned.
    pub async fn refresh(&self, skip_loading: bool) -> Result<Option<Arc<Session>>, SessionError> {
        let inner = &self.inner;
        let epoch = self.epoch();

        let Some(credential) = inner.load_credential() else {
            inner.set_signed_out();
            return Ok(None);
        };

        if !skip_loading {
            inner.state.send_if_modified(|state| !std::mem::replace(&mut state.loading, true));
        }

        tracing::debug!("fetching identity");
        let fetched = inner
            .identity
            .fetch_identity(&credential.token, credential.active_role_id.as_ref())
            .await;

        let _transition = inner.transition();
        if inner.epoch.load(Ordering::SeqCst) != epoch {
            tracing::debug!("credential changed during refresh; discarding result");
            return Ok(None);
        }

        let identity = match fetched {
            Ok(identity) => identity,
            Err(e) => {
                tracing::warn!(error = %e, "identity fetch failed");
                inner.teardown_locked(TeardownReason::IdentityFetchFailed);
                return Err(e.into());
            }
        };

        // Re-read: a role switch may have changed the preference meanwhile.
        let current = match inner.store.load() {
            Ok(Some(current)) if current.token == credential.token => current,
            Ok(Some(_)) => {
                tracing::debug!("credential replaced during refresh; discarding result");
                inner.set_loading(false);
                return Ok(None);
            }
            Ok(None) => {
                tracing::debug!("credential cleared during refresh; discarding result");
                inner.set_signed_out();
                return Ok(None);
            }
            Err(e) => {
                tracing::error!(error = %e, "credential store unreadable after identity fetch");
                inner.teardown_locked(TeardownReason::CredentialStoreFailed);
                return Err(e.into());
            }
        };

        let registry = RoleRegistry::resolve(&identity, &inner.config.portal, current.active_role_id.as_ref());
        if registry.active_id() != current.active_role_id.as_ref() {
            if let Err(e) = inner.store.save(&current.token, registry.active_id()) {
                tracing::warn!(error = %e, "failed to persist resolved active role");
            }
        }

        let session = Arc::new(Session::new(identity, registry));
        inner.state.send_modify(|state| {
            state.loading = false;
            state.session = Some(Arc::clone(&session));
        });

        tracing::info!(
            identity = %session.identity().id,
            available_roles = session.available_roles().len(),
            active_role = session.active_role().map(|r| r.name.as_str()).unwrap_or("<none>"),
            "session loaded"
        );
        Ok(Some(session))
    }

    /// Make `role_id` the active role. Purely local: no identity re-fetch.
    ///
    /// Returns `false` (and changes nothing) for ids not in the available set.
    pub fn switch_role(&self, role_id: &str) -> bool {
        let inner = &self.inner;
        let _transition = inner.transition();

        let Some(current) = inner.state.borrow().session.clone() else {
            return false;
        };
        let Some(next) = current.switched_to(role_id) else {
            tracing::debug!(role_id, "ignoring switch to unavailable role");
            return false;
        };
        if next == *current {
            return true;
        }

        let Some(credential) = inner.load_credential() else {
            return false;
        };
        if let Err(e) = inner.store.save(&credential.token, next.active_role_id()) {
            tracing::warn!(error = %e, "failed to persist active role; switch aborted");
            return false;
        }

        let next = Arc::new(next);
        inner.state.send_modify(|state| state.session = Some(Arc::clone(&next)));
        tracing::info!(
            active_role = next.active_role().map(|r| r.name.as_str()).unwrap_or("<none>"),
            "active role switched"
        );
        true
    }

    pub fn active_role(&self) -> Option<Role> {
        self.inner.state.borrow().active_role().cloned()
    }

    pub fn has_permission(&self, code: &str) -> bool {
        self.session()
            .is_some_and(|s| s.has_permission(code, &self.inner.config.super_admin_role))
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.session().is_some_and(|s| s.has_role(name))
    }

    pub fn has_any_role<S: AsRef<str>>(&self, names: &[S]) -> bool {
        self.session().is_some_and(|s| s.has_any_role(names))
    }

    pub fn explain(&self, code: &str) -> AuthorizationExplanation {
        rolegate_auth::explain(
            self.active_role().as_ref(),
            code,
            &self.inner.config.super_admin_role,
        )
    }

    /// Evaluate a route guard against the current state.
    pub fn guard(&self, guard: &RouteGuard) -> GuardDecision {
        guard.evaluate(&self.inner.state.borrow(), &self.inner.config)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use rolegate_auth::{Identity, Permission};
    use rolegate_core::{IdentityId, PermissionId, RoleId};

    use super::*;
    use crate::credentials::{MemoryCredentialStore, StoreError};
    use crate::error::IdentityFetchError;
    use crate::watchdog::tests::token_expiring_in;

    /// In-process identity service with a scripted answer.
    struct StubIdentity {
        answer: Mutex<Result<Identity, u16>>,
        gate: Mutex<Option<Arc<Notify>>>,
        exchange_status: Mutex<Option<u16>>,
    }

    impl StubIdentity {
        fn answering(identity: Identity) -> Arc<Self> {
            Arc::new(Self {
                answer: Mutex::new(Ok(identity)),
                gate: Mutex::new(None),
                exchange_status: Mutex::new(None),
            })
        }

        fn fail_with(&self, status: u16) {
            *self.answer.lock().unwrap() = Err(status);
        }

        fn reject_exchange(&self, status: u16) {
            *self.exchange_status.lock().unwrap() = Some(status);
        }

        fn hold_until(&self, gate: Arc<Notify>) {
            *self.gate.lock().unwrap() = Some(gate);
        }
    }

    #[async_trait]
    impl IdentityService for StubIdentity {
        async fn fetch_identity(
            &self,
            _token: &str,
            _active_role: Option<&RoleId>,
        ) -> Result<Identity, IdentityFetchError> {
            let gate = self.gate.lock().unwrap().clone();
            if let Some(gate) = gate {
                gate.notified().await;
            }
            match &*self.answer.lock().unwrap() {
                Ok(identity) => Ok(identity.clone()),
                Err(status) => Err(IdentityFetchError::Status(*status, "boom".into())),
            }
        }

        async fn exchange_credentials(&self, _request: &LoginRequest) -> Result<String, IdentityFetchError> {
            match *self.exchange_status.lock().unwrap() {
                Some(401) => Err(IdentityFetchError::Unauthorized),
                Some(status) => Err(IdentityFetchError::Status(status, "boom".into())),
                None => Ok(token_expiring_in(3600)),
            }
        }
    }

    /// Memory store whose `fail_on`-th `load` (1-based) reports an io error.
    struct FlakyStore {
        inner: MemoryCredentialStore,
        loads: AtomicUsize,
        fail_on: usize,
    }

    impl FlakyStore {
        fn failing_on(fail_on: usize) -> Arc<Self> {
            Arc::new(Self {
                inner: MemoryCredentialStore::new(),
                loads: AtomicUsize::new(0),
                fail_on,
            })
        }
    }

    impl CredentialStore for FlakyStore {
        fn save(&self, token: &str, active_role_id: Option<&RoleId>) -> Result<(), StoreError> {
            self.inner.save(token, active_role_id)
        }

        fn load(&self) -> Result<Option<Credential>, StoreError> {
            if self.loads.fetch_add(1, Ordering::SeqCst) + 1 == self.fail_on {
                return Err(StoreError::Io(std::io::Error::other("disk hiccup")));
            }
            self.inner.load()
        }

        fn clear(&self) -> Result<(), StoreError> {
            self.inner.clear()
        }
    }

    fn role_id(id: &str) -> RoleId {
        RoleId::parse(id).unwrap()
    }

    fn role(id: &str, name: &'static str, codes: &[(&'static str, bool)]) -> Role {
        let perms = codes
            .iter()
            .enumerate()
            .map(|(i, (code, active))| {
                Permission::new(PermissionId::parse(format!("{id}-{i}")).unwrap(), *code, *active)
            })
            .collect();
        Role::new(role_id(id), name).with_permissions(perms)
    }

    fn identity(roles: Vec<Role>) -> Identity {
        Identity::new(IdentityId::parse("u-1").unwrap(), roles)
    }

    fn manager(
        identity: Identity,
    ) -> (SessionManager, Arc<MemoryCredentialStore>, Arc<StubIdentity>) {
        let store = Arc::new(MemoryCredentialStore::new());
        let service = StubIdentity::answering(identity);
        let manager = SessionManager::new(SessionConfig::default(), store.clone(), service.clone());
        (manager, store, service)
    }

    fn agent_and_admin() -> Identity {
        identity(vec![
            role("r-agent", "Agent", &[]),
            role("r-admin", "Admin", &[("bookings.read", true), ("bookings.create", false)]),
            role("r-finance", "Finance", &[("ledger.read", true)]),
        ])
    }

    #[tokio::test]
    async fn restore_without_credential_is_not_an_error() {
        let (manager, _, _) = manager(agent_and_admin());
        assert!(manager.is_loading());

        assert!(manager.restore().await.unwrap().is_none());
        assert!(!manager.is_loading());
        assert!(manager.session().is_none());
    }

    #[tokio::test]
    async fn login_filters_portal_roles_and_persists_default() {
        let (manager, store, _) = manager(agent_and_admin());

        let session = manager.login(token_expiring_in(3600)).await.unwrap().unwrap();

        let names: Vec<_> = session.available_roles().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Admin", "Finance"]);
        assert_eq!(session.active_role().map(|r| r.name.as_str()), Some("Admin"));
        assert_eq!(store.load().unwrap().unwrap().active_role_id, Some(role_id("r-admin")));
        assert!(!manager.is_loading());
    }

    #[tokio::test]
    async fn stale_persisted_role_self_heals() {
        let (manager, store, _) = manager(agent_and_admin());
        store.save(&token_expiring_in(3600), Some(&role_id("r-deleted"))).unwrap();

        let session = manager.restore().await.unwrap().unwrap();

        assert_eq!(session.active_role_id(), Some(&role_id("r-admin")));
        assert_eq!(store.load().unwrap().unwrap().active_role_id, Some(role_id("r-admin")));
    }

    #[tokio::test]
    async fn persisted_role_is_restored() {
        let (manager, store, _) = manager(agent_and_admin());
        store.save(&token_expiring_in(3600), Some(&role_id("r-finance"))).unwrap();

        manager.restore().await.unwrap();
        assert!(manager.has_role("Finance"));
        assert!(manager.has_permission("ledger.read"));
        assert!(!manager.has_permission("bookings.read"));
    }

    #[tokio::test]
    async fn inactive_permission_denies() {
        let (manager, _, _) = manager(agent_and_admin());
        manager.login(token_expiring_in(3600)).await.unwrap();

        assert!(manager.has_permission("bookings.read"));
        assert!(!manager.has_permission("bookings.create"));
        assert!(!manager.explain("bookings.create").granted);
    }

    #[tokio::test]
    async fn failed_refresh_tears_down_existing_session() {
        let (manager, store, service) = manager(agent_and_admin());
        manager.login(token_expiring_in(3600)).await.unwrap();
        assert!(manager.session().is_some());

        service.fail_with(500);
        let err = manager.refresh(false).await.unwrap_err();

        assert!(matches!(err, SessionError::IdentityFetch(IdentityFetchError::Status(500, _))));
        assert!(manager.session().is_none());
        assert!(!manager.is_loading());
        assert!(store.load().unwrap().is_none());
    }

    #[tokio::test]
    async fn switch_role_is_local_and_persisted() {
        let (manager, store, service) = manager(agent_and_admin());
        manager.login(token_expiring_in(3600)).await.unwrap();

        // Any re-fetch would now fail the session.
        service.fail_with(500);

        assert!(manager.switch_role("r-finance"));
        assert!(manager.has_role("Finance"));
        assert!(manager.has_permission("ledger.read"));
        assert!(!manager.has_permission("bookings.read"));
        assert_eq!(store.load().unwrap().unwrap().active_role_id, Some(role_id("r-finance")));
    }

    #[tokio::test]
    async fn switch_to_unknown_role_changes_nothing() {
        let (manager, store, _) = manager(agent_and_admin());
        manager.login(token_expiring_in(3600)).await.unwrap();
        let before = manager.state();
        let stored_before = store.load().unwrap();

        assert!(!manager.switch_role("nonexistent-id"));
        // Filtered-out roles are unknown too.
        assert!(!manager.switch_role("r-agent"));

        assert_eq!(manager.state(), before);
        assert_eq!(store.load().unwrap(), stored_before);
    }

    #[tokio::test]
    async fn switch_to_active_role_is_idempotent() {
        let (manager, _, _) = manager(agent_and_admin());
        manager.login(token_expiring_in(3600)).await.unwrap();
        let before = manager.state();
        let mut rx = manager.subscribe();
        rx.borrow_and_update();

        assert!(manager.switch_role("r-admin"));
        assert_eq!(manager.state(), before);
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn switch_without_session_fails() {
        let (manager, _, _) = manager(agent_and_admin());
        assert!(!manager.switch_role("r-admin"));
    }

    #[tokio::test]
    async fn super_admin_bypasses_permission_checks() {
        let (manager, _, _) = manager(identity(vec![role("r-root", "Super Admin", &[])]));
        manager.login(token_expiring_in(3600)).await.unwrap();

        assert!(manager.has_permission("settings.roles"));
        assert!(manager.has_permission(""));
        assert!(manager.guard(&RouteGuard::role("Finance")) == GuardDecision::Render);
    }

    #[tokio::test]
    async fn identity_without_portal_roles_has_no_active_role() {
        let (manager, _, _) = manager(identity(vec![role("r-agent", "Agent", &[])]));
        let session = manager.login(token_expiring_in(3600)).await.unwrap().unwrap();

        assert!(session.available_roles().is_empty());
        assert!(session.active_role().is_none());
        assert!(!manager.has_permission("anything"));
        assert_eq!(
            manager.guard(&RouteGuard::authenticated()),
            GuardDecision::RedirectToSignIn("/login".into())
        );
    }

    #[tokio::test]
    async fn expired_token_is_rejected_synchronously() {
        let (manager, store, _) = manager(agent_and_admin());

        let err = manager.login(token_expiring_in(-5)).await.unwrap_err();
        assert!(matches!(err, SessionError::ExpiredCredential));
        assert!(store.load().unwrap().is_none());
        assert!(manager.session().is_none());

        let err = manager.login("not-a-jwt").await.unwrap_err();
        assert!(matches!(err, SessionError::ExpiredCredential));
    }

    #[tokio::test]
    async fn logout_clears_everything() {
        let (manager, store, _) = manager(agent_and_admin());
        manager.login(token_expiring_in(3600)).await.unwrap();

        manager.logout();
        assert!(manager.session().is_none());
        assert!(store.load().unwrap().is_none());
        assert!(!manager.has_permission("bookings.read"));
    }

    #[tokio::test]
    async fn password_login_exchanges_then_loads() {
        let (manager, store, _) = manager(agent_and_admin());

        let session = manager
            .login_with_password(&LoginRequest::new("a@example.com", "pw"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(session.active_role().map(|r| r.name.as_str()), Some("Admin"));
        assert!(store.load().unwrap().is_some());
    }

    #[tokio::test]
    async fn logout_during_refresh_is_not_resurrected() {
        let (manager, store, service) = manager(agent_and_admin());
        store.save(&token_expiring_in(3600), None).unwrap();

        let gate = Arc::new(Notify::new());
        service.hold_until(gate.clone());

        let in_flight = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.refresh(false).await })
        };
        tokio::task::yield_now().await;

        manager.logout();
        gate.notify_one();

        assert!(in_flight.await.unwrap().unwrap().is_none());
        assert!(manager.session().is_none());
        assert!(store.load().unwrap().is_none());
    }

    #[tokio::test]
    async fn subscribers_see_login_and_logout() {
        let (manager, _, _) = manager(agent_and_admin());
        let mut rx = manager.subscribe();

        manager.login(token_expiring_in(3600)).await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_authenticated());

        manager.logout();
        assert!(rx.has_changed().unwrap());
        assert!(!rx.borrow_and_update().is_authenticated());
    }

    async fn advance(ms: u64) {
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_millis(ms)).await;
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn session_ends_at_token_expiry_and_not_before() {
        let (manager, store, _) = manager(agent_and_admin());
        manager.login(token_expiring_in(5)).await.unwrap();

        advance(3_900).await;
        assert!(manager.session().is_some());

        advance(1_200).await;
        assert!(manager.session().is_none());
        assert!(store.load().unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn relogin_rearms_the_watchdog() {
        let (manager, _, _) = manager(agent_and_admin());
        manager.login(token_expiring_in(2)).await.unwrap();
        manager.login(token_expiring_in(60)).await.unwrap();

        advance(5_000).await;
        assert!(manager.session().is_some());

        advance(60_000).await;
        assert!(manager.session().is_none());
    }

    #[tokio::test]
    async fn guard_shows_loading_while_login_is_in_flight() {
        let (manager, _, service) = manager(agent_and_admin());
        manager.restore().await.unwrap();
        assert!(!manager.is_loading());

        let gate = Arc::new(Notify::new());
        service.hold_until(gate.clone());

        let in_flight = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.login(token_expiring_in(3600)).await })
        };
        tokio::task::yield_now().await;

        assert!(manager.is_loading());
        assert_eq!(manager.guard(&RouteGuard::authenticated()), GuardDecision::Loading);

        gate.notify_one();
        assert!(in_flight.await.unwrap().unwrap().is_some());
        assert!(!manager.is_loading());
        assert_eq!(manager.guard(&RouteGuard::authenticated()), GuardDecision::Render);
    }

    #[tokio::test]
    async fn failed_login_fetch_clears_loading() {
        let (manager, _, service) = manager(agent_and_admin());
        manager.restore().await.unwrap();
        service.fail_with(503);

        manager.login(token_expiring_in(3600)).await.unwrap_err();
        assert!(!manager.is_loading());
        assert_eq!(
            manager.guard(&RouteGuard::authenticated()),
            GuardDecision::RedirectToSignIn("/login".into())
        );
    }

    #[tokio::test]
    async fn failed_password_exchange_clears_loading() {
        let (manager, store, service) = manager(agent_and_admin());
        manager.restore().await.unwrap();
        service.reject_exchange(401);

        let err = manager
            .login_with_password(&LoginRequest::new("a@example.com", "wrong"))
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::IdentityFetch(IdentityFetchError::Unauthorized)));
        assert!(!manager.is_loading());
        assert!(manager.session().is_none());
        assert!(store.load().unwrap().is_none());
    }

    #[tokio::test]
    async fn store_failure_after_fetch_ends_loading_and_reports() {
        // Load #1 is the refresh's own read, #2 the re-read after the fetch.
        let store = FlakyStore::failing_on(2);
        store.save(&token_expiring_in(3600), None).unwrap();
        let manager = SessionManager::new(
            SessionConfig::default(),
            store.clone(),
            StubIdentity::answering(agent_and_admin()),
        );

        let err = manager.refresh(false).await.unwrap_err();

        assert!(matches!(err, SessionError::Store(StoreError::Io(_))));
        assert!(!manager.is_loading());
        assert!(manager.session().is_none());
        assert!(store.load().unwrap().is_none());
        assert_eq!(
            manager.guard(&RouteGuard::authenticated()),
            GuardDecision::RedirectToSignIn("/login".into())
        );
    }

    #[tokio::test]
    async fn credential_cleared_during_refresh_signs_out() {
        let (manager, store, service) = manager(agent_and_admin());
        store.save(&token_expiring_in(3600), None).unwrap();

        let gate = Arc::new(Notify::new());
        service.hold_until(gate.clone());
        let in_flight = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.refresh(false).await })
        };
        tokio::task::yield_now().await;
        assert!(manager.is_loading());

        // Cleared behind the manager's back, without a teardown.
        store.clear().unwrap();
        gate.notify_one();

        assert!(in_flight.await.unwrap().unwrap().is_none());
        assert!(!manager.is_loading());
        assert!(manager.session().is_none());
    }

    #[tokio::test]
    async fn credential_snapshot_pairs_token_with_its_generation() {
        let (manager, _, _) = manager(agent_and_admin());
        let first = token_expiring_in(3600);
        let second = token_expiring_in(7200);

        manager.login(first.clone()).await.unwrap();
        let (old_epoch, credential) = manager.credential_snapshot();
        assert_eq!(credential.unwrap().token, first);

        manager.login(second.clone()).await.unwrap();
        let (epoch, credential) = manager.credential_snapshot();
        assert_eq!(credential.unwrap().token, second);
        assert_ne!(epoch, old_epoch);

        manager.teardown_if_current(old_epoch, TeardownReason::Unauthorized);
        assert!(manager.session().is_some());

        manager.teardown_if_current(epoch, TeardownReason::Unauthorized);
        assert!(manager.session().is_none());
    }
}
