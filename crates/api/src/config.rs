use chrono::Duration;

/// Settings for the reference backend.
#[derive(Clone)]
pub struct ApiConfig {
    pub jwt_secret: String,
    /// Lifetime of tokens issued by `POST /auth/login`.
    pub token_ttl: Duration,
}

impl ApiConfig {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            token_ttl: Duration::hours(8),
        }
    }

    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Read `JWT_SECRET` and `ROLEGATE_TOKEN_TTL_SECS`.
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            "dev-secret".to_string()
        });

        let mut config = Self::new(jwt_secret);
        if let Ok(raw) = std::env::var("ROLEGATE_TOKEN_TTL_SECS") {
            let secs: i64 = raw
                .parse()
                .map_err(|e| anyhow::anyhow!("ROLEGATE_TOKEN_TTL_SECS={raw:?}: {e}"))?;
            anyhow::ensure!(secs > 0, "ROLEGATE_TOKEN_TTL_SECS must be positive");
            config.token_ttl = Duration::seconds(secs);
        }
        Ok(config)
    }
}

impl core::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}
