//! Validation of the identity document returned by `GET /profile`.
//!
//! Success shape: `{ "success": true, "data": { "id", "roles": [Role] } }`.
//! A legacy single `role` object is upgraded to a one-element array.
//! Role and permission entries are coerced into closed structures here;
//! individual malformed entries are dropped, a malformed envelope is an error.

use serde::Deserialize;
use serde_json::Value;

use rolegate_auth::{Identity, Permission, Role};
use rolegate_core::{IdentityId, PermissionId, RoleId};

use crate::error::IdentityFetchError;

#[derive(Deserialize)]
struct Envelope {
    success: bool,
    data: Option<Value>,
}

#[derive(Deserialize)]
struct ProfileData {
    id: IdentityId,
    #[serde(default)]
    roles: Option<Vec<Value>>,
    #[serde(default)]
    role: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRole {
    id: Option<Value>,
    name: Option<String>,
    #[serde(default)]
    permissions: Option<Vec<Value>>,
    #[serde(default, alias = "is_active")]
    is_active: Option<bool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePermission {
    id: Option<Value>,
    code: Option<String>,
    #[serde(default, alias = "is_active")]
    is_active: Option<bool>,
}

pub fn parse_profile(body: &[u8]) -> Result<Identity, IdentityFetchError> {
    let envelope: Envelope =
        serde_json::from_slice(body).map_err(|e| IdentityFetchError::Malformed(e.to_string()))?;

    if !envelope.success {
        return Err(IdentityFetchError::Malformed("success flag is false".into()));
    }

    let data = envelope
        .data
        .ok_or_else(|| IdentityFetchError::Malformed("missing data".into()))?;
    let data: ProfileData =
        serde_json::from_value(data).map_err(|e| IdentityFetchError::Malformed(e.to_string()))?;

    let raw_roles = match (data.roles, data.role) {
        (Some(roles), _) => roles,
        (None, Some(legacy)) => vec![legacy],
        (None, None) => Vec::new(),
    };

    let roles = raw_roles.into_iter().filter_map(parse_role).collect();
    Ok(Identity::new(data.id, roles))
}

fn parse_role(value: Value) -> Option<Role> {
    let wire: WireRole = match serde_json::from_value(value) {
        Ok(wire) => wire,
        Err(e) => {
            tracing::warn!(error = %e, "dropping malformed role entry");
            return None;
        }
    };

    let id = wire.id.and_then(|v| serde_json::from_value::<RoleId>(v).ok());
    let name = wire.name.filter(|n| !n.trim().is_empty());
    let (Some(id), Some(name)) = (id, name) else {
        tracing::warn!("dropping role entry without id or name");
        return None;
    };

    let permissions = wire
        .permissions
        .unwrap_or_default()
        .into_iter()
        .filter_map(parse_permission)
        .collect();

    Some(
        Role::new(id, name)
            .with_permissions(permissions)
            .with_active(wire.is_active.unwrap_or(true)),
    )
}

fn parse_permission(value: Value) -> Option<Permission> {
    let wire: WirePermission = serde_json::from_value(value).ok()?;
    let id = wire.id.and_then(|v| serde_json::from_value::<PermissionId>(v).ok());
    let code = wire.code.filter(|c| !c.trim().is_empty());
    let (Some(id), Some(code)) = (id, code) else {
        tracing::warn!("dropping permission entry without id or code");
        return None;
    };

    // A permission without an explicit active flag grants nothing.
    Some(Permission::new(id, code, wire.is_active.unwrap_or(false)))
}
