//! Wire shapes shared by the route handlers.

use serde::{Deserialize, Serialize};

use rolegate_auth::Role;
use rolegate_core::{IdentityId, RoleId};

/// `{ "success": true, "data": ... }`
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileDto {
    pub id: IdentityId,
    pub roles: Vec<Role>,
}

#[derive(Deserialize)]
pub struct LoginRequestDto {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenDto {
    pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveRoleDto {
    pub id: RoleId,
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhoAmIDto {
    pub identity_id: IdentityId,
    pub active_role: Option<ActiveRoleDto>,
    pub assigned_roles: Vec<String>,
}
