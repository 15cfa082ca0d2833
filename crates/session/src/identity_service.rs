//! Seam to the identity service: token exchange and identity documents.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use rolegate_auth::Identity;
use rolegate_core::RoleId;

use crate::config::SessionConfig;
use crate::error::IdentityFetchError;
use crate::profile::parse_profile;
use crate::propagator::decorate;

/// Email/password pair exchanged for a bearer token.
#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl core::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Fetch the authoritative identity document for `token`.
    async fn fetch_identity(
        &self,
        token: &str,
        active_role: Option<&RoleId>,
    ) -> Result<Identity, IdentityFetchError>;

    /// Exchange login credentials for a bearer token.
    async fn exchange_credentials(&self, request: &LoginRequest) -> Result<String, IdentityFetchError>;
}

#[derive(Deserialize)]
struct TokenEnvelope {
    success: bool,
    data: Option<TokenData>,
}

#[derive(Deserialize)]
struct TokenData {
    token: String,
}

/// [`IdentityService`] over HTTP (`GET /profile`, `POST /auth/login`).
#[derive(Debug, Clone)]
pub struct HttpIdentityService {
    http: reqwest::Client,
    config: SessionConfig,
}

impl HttpIdentityService {
    pub fn new(http: reqwest::Client, config: SessionConfig) -> Self {
        Self { http, config }
    }
}

async fn error_for_status(resp: reqwest::Response) -> Result<reqwest::Response, IdentityFetchError> {
    let status = resp.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(IdentityFetchError::Unauthorized);
    }
    if !status.is_success() {
        return Err(IdentityFetchError::Status(
            status.as_u16(),
            resp.text().await.unwrap_or_default(),
        ));
    }
    Ok(resp)
}

#[async_trait]
impl IdentityService for HttpIdentityService {
    async fn fetch_identity(
        &self,
        token: &str,
        active_role: Option<&RoleId>,
    ) -> Result<Identity, IdentityFetchError> {
        let req = decorate(self.http.get(self.config.url("/profile")), token, active_role);
        let resp = error_for_status(req.send().await?).await?;
        let body = resp.bytes().await?;
        parse_profile(&body)
    }

    async fn exchange_credentials(&self, request: &LoginRequest) -> Result<String, IdentityFetchError> {
        let resp = self
            .http
            .post(self.config.url("/auth/login"))
            .json(request)
            .send()
            .await?;
        let resp = error_for_status(resp).await?;

        let envelope: TokenEnvelope = resp
            .json()
            .await
            .map_err(|e| IdentityFetchError::Malformed(e.to_string()))?;

        match envelope {
            TokenEnvelope {
                success: true,
                data: Some(TokenData { token }),
            } if !token.trim().is_empty() => Ok(token),
            _ => Err(IdentityFetchError::Malformed("login response carried no token".into())),
        }
    }
}
