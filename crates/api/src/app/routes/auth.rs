use axum::{extract::State, http::StatusCode, response::Response, Json};
use chrono::Utc;

use rolegate_auth::TokenClaims;

use crate::app::dto::{Envelope, LoginRequestDto, TokenDto};
use crate::app::errors::{json_error, token_error_to_response};
use crate::app::AppState;

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequestDto>,
) -> Result<Json<Envelope<TokenDto>>, Response> {
    let Some(identity_id) = state.directory.authenticate(body.email.trim(), &body.password) else {
        tracing::info!("login rejected");
        return Err(json_error(
            StatusCode::UNAUTHORIZED,
            "invalid_credentials",
            "email or password is incorrect",
        ));
    };

    let now = Utc::now();
    let claims = TokenClaims {
        sub: identity_id.to_string(),
        exp: (now + state.token_ttl).timestamp(),
        iat: Some(now.timestamp()),
    };
    let token = state.jwt.issue(&claims).map_err(token_error_to_response)?;

    tracing::info!(identity = %identity_id, "token issued");
    Ok(Json(Envelope::ok(TokenDto { token })))
}
