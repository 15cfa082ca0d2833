//! Session core configuration.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

use rolegate_auth::{PortalPolicy, DEFAULT_SUPER_ADMIN_ROLE};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Base URL of the identity/authorization-aware backend (no trailing slash).
    pub base_url: String,
    /// Which assigned roles are relevant to this portal.
    pub portal: PortalPolicy,
    /// Role name that bypasses every permission check.
    pub super_admin_role: String,
    /// Where unauthenticated navigations are sent.
    pub sign_in_route: String,
    /// Where authenticated-but-unauthorized navigations go by default.
    pub default_fallback_route: String,
    pub request_timeout: Duration,
    /// Location of the persisted credential; `None` selects the OS data dir.
    pub credential_path: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            portal: PortalPolicy::admin(),
            super_admin_role: DEFAULT_SUPER_ADMIN_ROLE.to_string(),
            sign_in_route: "/login".to_string(),
            default_fallback_route: "/".to_string(),
            request_timeout: Duration::from_secs(30),
            credential_path: None,
        }
    }
}

impl SessionConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_portal(mut self, portal: PortalPolicy) -> Self {
        self.portal = portal;
        self
    }

    /// Read configuration from `ROLEGATE_*` environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();

        match std::env::var("ROLEGATE_API_URL") {
            Ok(url) => config = config.with_base_url(url),
            Err(_) => tracing::warn!(base_url = %config.base_url, "ROLEGATE_API_URL not set; using dev default"),
        }

        if let Ok(name) = std::env::var("ROLEGATE_PORTAL") {
            config.portal = PortalPolicy::from_name(&name)
                .with_context(|| format!("ROLEGATE_PORTAL must be one of admin, agent, all (got {name:?})"))?;
        }

        if let Ok(role) = std::env::var("ROLEGATE_SUPER_ADMIN_ROLE") {
            config.super_admin_role = role;
        }
        if let Ok(route) = std::env::var("ROLEGATE_SIGN_IN_ROUTE") {
            config.sign_in_route = route;
        }
        if let Ok(route) = std::env::var("ROLEGATE_FALLBACK_ROUTE") {
            config.default_fallback_route = route;
        }

        if let Ok(secs) = std::env::var("ROLEGATE_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .with_context(|| format!("ROLEGATE_REQUEST_TIMEOUT_SECS must be an integer (got {secs:?})"))?;
            config.request_timeout = Duration::from_secs(secs);
        }

        config.credential_path = std::env::var_os("ROLEGATE_CREDENTIALS_PATH").map(PathBuf::from);

        Ok(config)
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}
