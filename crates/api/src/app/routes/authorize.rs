use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use rolegate_auth::explain;

use crate::app::AppState;
use crate::context::ActiveRoleContext;

/// Evaluate a permission code against the verified active role.
///
/// 200 with the explanation when granted, 403 with the same body otherwise.
pub async fn check(
    State(state): State<AppState>,
    Path(code): Path<String>,
    active: Option<Extension<ActiveRoleContext>>,
) -> Response {
    let active = active.as_ref().map(|Extension(active)| active.role());
    let explanation = explain(active, &code, &state.super_admin_role);

    let status = if explanation.granted {
        StatusCode::OK
    } else {
        StatusCode::FORBIDDEN
    };
    (status, Json(explanation)).into_response()
}
