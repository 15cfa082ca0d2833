//! Axum router and shared handler state.
//!
//! - `routes/`: handlers, one file per area
//! - `dto.rs`: response envelopes
//! - `errors.rs`: consistent JSON error bodies

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use rolegate_auth::{Hs256JwtValidator, DEFAULT_SUPER_ADMIN_ROLE};

use crate::config::ApiConfig;
use crate::directory::RoleDirectory;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub jwt: Arc<Hs256JwtValidator>,
    pub directory: Arc<dyn RoleDirectory>,
    pub token_ttl: chrono::Duration,
    pub super_admin_role: String,
}

/// Build the full HTTP router.
///
/// `/profile` sits behind token verification only: it must answer even when
/// the client's remembered active role no longer exists, so the client can
/// repair its preference. Every other protected route also verifies
/// `X-Active-Role`.
pub fn build_app(config: ApiConfig, directory: Arc<dyn RoleDirectory>) -> Router {
    let jwt = Arc::new(Hs256JwtValidator::new(config.jwt_secret.into_bytes()));
    let auth_state = middleware::AuthState {
        jwt: jwt.clone(),
        directory: directory.clone(),
    };
    let state = AppState {
        jwt,
        directory,
        token_ttl: config.token_ttl,
        super_admin_role: DEFAULT_SUPER_ADMIN_ROLE.to_string(),
    };

    let role_scoped = Router::new()
        .route("/whoami", get(routes::system::whoami))
        .route("/authorize/:code", get(routes::authorize::check))
        .route_layer(axum::middleware::from_fn(middleware::active_role_middleware));

    let protected = Router::new()
        .route("/profile", get(routes::profile::profile))
        .merge(role_scoped)
        .route_layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .route("/auth/login", post(routes::auth::login))
        .merge(protected)
        .with_state(state)
}
