use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use rolegate_auth::{JwtValidator, ACTIVE_ROLE_HEADER};
use rolegate_core::IdentityId;

use crate::app::errors::json_error;
use crate::context::{ActiveRoleContext, PrincipalContext};
use crate::directory::RoleDirectory;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
    pub directory: Arc<dyn RoleDirectory>,
}

/// Verify the bearer token and attach the holder's assigned roles.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_bearer(req.headers()).map_err(unauthorized)?;

    let claims = state.jwt.validate(token, Utc::now()).map_err(|e| {
        tracing::debug!(error = %e, "rejected bearer token");
        unauthorized(StatusCode::UNAUTHORIZED)
    })?;

    let identity_id = IdentityId::parse(claims.sub).map_err(|_| unauthorized(StatusCode::UNAUTHORIZED))?;
    let roles = state.directory.assigned_roles(&identity_id).ok_or_else(|| {
        tracing::debug!(identity = %identity_id, "token subject is not in the directory");
        unauthorized(StatusCode::UNAUTHORIZED)
    })?;

    req.extensions_mut()
        .insert(PrincipalContext::new(identity_id, roles));

    Ok(next.run(req).await)
}

/// Check a client-supplied `X-Active-Role` against the principal's assignments.
///
/// Must run inside [`auth_middleware`]. No header means no active-role
/// context; a header naming anything but an assigned, active role is a 403.
pub async fn active_role_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let Some(principal) = req.extensions().get::<PrincipalContext>() else {
        return Err(unauthorized(StatusCode::UNAUTHORIZED));
    };

    let Some(claimed) = req.headers().get(ACTIVE_ROLE_HEADER) else {
        return Ok(next.run(req).await);
    };

    let role = claimed
        .to_str()
        .ok()
        .map(str::trim)
        .and_then(|role_id| principal.assigned_role(role_id))
        .cloned();

    let Some(role) = role else {
        tracing::warn!(
            identity = %principal.identity_id(),
            claimed = ?claimed,
            "rejected active role not assigned to the token holder"
        );
        return Err(json_error(
            StatusCode::FORBIDDEN,
            "active_role_not_assigned",
            "the requested active role is not assigned to this identity",
        ));
    };

    req.extensions_mut().insert(ActiveRoleContext::new(role));
    Ok(next.run(req).await)
}

fn unauthorized(status: StatusCode) -> Response {
    json_error(status, "unauthorized", "missing or invalid bearer token")
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, StatusCode> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;

    let header = header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use axum::http::{header::AUTHORIZATION, HeaderValue};

    use super::*;

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(extract_bearer(&headers("Bearer abc.def.ghi")), Ok("abc.def.ghi"));
        assert_eq!(extract_bearer(&headers("Bearer   padded  ")), Ok("padded"));
    }

    #[test]
    fn rejects_missing_or_non_bearer_authorization() {
        assert_eq!(extract_bearer(&HeaderMap::new()), Err(StatusCode::UNAUTHORIZED));
        assert_eq!(extract_bearer(&headers("Basic dXNlcjpwdw==")), Err(StatusCode::UNAUTHORIZED));
        assert_eq!(extract_bearer(&headers("Bearer ")), Err(StatusCode::UNAUTHORIZED));
    }
}
