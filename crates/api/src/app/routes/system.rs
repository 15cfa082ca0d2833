use axum::{extract::Extension, http::StatusCode, Json};

use crate::app::dto::{ActiveRoleDto, WhoAmIDto};
use crate::context::{ActiveRoleContext, PrincipalContext};

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Echo the verified principal and, if one was claimed, the verified active role.
pub async fn whoami(
    Extension(principal): Extension<PrincipalContext>,
    active: Option<Extension<ActiveRoleContext>>,
) -> Json<WhoAmIDto> {
    Json(WhoAmIDto {
        identity_id: principal.identity_id().clone(),
        active_role: active.map(|Extension(active)| ActiveRoleDto {
            id: active.role().id.clone(),
            name: active.role().name.to_string(),
        }),
        assigned_roles: principal.roles().iter().map(|r| r.name.to_string()).collect(),
    })
}
