use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use rolegate_auth::TokenValidationError;

pub fn token_error_to_response(err: TokenValidationError) -> axum::response::Response {
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "token_issue_failed", err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
