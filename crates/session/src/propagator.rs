//! Outbound request decoration and central 401 handling.
//!
//! Every request to the backend carries `Authorization: Bearer <token>` and,
//! when a role is active, `X-Active-Role: <role id>`. The header is only a
//! suggestion; the backend verifies it against the token holder's roles.

use reqwest::{Method, RequestBuilder, StatusCode};

use rolegate_auth::ACTIVE_ROLE_HEADER;
use rolegate_core::RoleId;

use crate::error::ClientError;
use crate::manager::{SessionManager, TeardownReason};

pub fn decorate(req: RequestBuilder, token: &str, active_role: Option<&RoleId>) -> RequestBuilder {
    let req = req.bearer_auth(token);
    match active_role {
        Some(role_id) => req.header(ACTIVE_ROLE_HEADER, role_id.as_str()),
        None => req,
    }
}

/// A decorated request, tagged with the credential generation it was built for.
#[derive(Debug)]
pub struct AuthorizedRequest {
    inner: RequestBuilder,
    epoch: u64,
}

impl AuthorizedRequest {
    /// Customize the underlying request (body, query, extra headers).
    pub fn map(self, f: impl FnOnce(RequestBuilder) -> RequestBuilder) -> Self {
        Self {
            inner: f(self.inner),
            epoch: self.epoch,
        }
    }
}

/// HTTP client that propagates the session's credential and active role.
#[derive(Clone)]
pub struct AuthorizedClient {
    http: reqwest::Client,
    session: SessionManager,
}

impl AuthorizedClient {
    pub fn new(http: reqwest::Client, session: SessionManager) -> Self {
        Self { http, session }
    }

    pub fn request(&self, method: Method, path: &str) -> Result<AuthorizedRequest, ClientError> {
        let (epoch, credential) = self.session.credential_snapshot();
        let credential = credential.ok_or(ClientError::NotAuthenticated)?;

        // Prefer the live selection; fall back to the persisted one while loading.
        let active_role = self
            .session
            .session()
            .and_then(|s| s.active_role_id().cloned())
            .or(credential.active_role_id);

        let url = self.session.config().url(path);
        let inner = decorate(self.http.request(method, url), &credential.token, active_role.as_ref());
        Ok(AuthorizedRequest { inner, epoch })
    }

    pub fn get(&self, path: &str) -> Result<AuthorizedRequest, ClientError> {
        self.request(Method::GET, path)
    }

    pub fn post(&self, path: &str) -> Result<AuthorizedRequest, ClientError> {
        self.request(Method::POST, path)
    }

    /// Send a request. A 401 answer ends the session before returning.
    pub async fn send(&self, req: AuthorizedRequest) -> Result<reqwest::Response, ClientError> {
        let resp = req.inner.send().await?;

        if resp.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!(url = %resp.url(), "backend rejected credential");
            self.session
                .teardown_if_current(req.epoch, TeardownReason::Unauthorized);
            return Err(ClientError::Unauthorized);
        }

        Ok(resp)
    }
}
