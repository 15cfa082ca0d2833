use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use rolegate_core::{Entity, PermissionId};

/// Permission code: a stable string key identifying one grantable capability
/// (e.g. "bookings.create").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionCode(Cow<'static, str>);

impl PermissionCode {
    pub fn new(code: impl Into<Cow<'static, str>>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for PermissionCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A permission record attached to a role.
///
/// A permission only grants anything while `is_active` is true; an inactive
/// entry is treated as absent even when it is present on a cached role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub id: PermissionId,
    pub code: PermissionCode,
    pub is_active: bool,
}

impl Permission {
    pub fn new(id: PermissionId, code: impl Into<Cow<'static, str>>, is_active: bool) -> Self {
        Self {
            id,
            code: PermissionCode::new(code),
            is_active,
        }
    }

    /// True iff this entry is active and carries `code`.
    pub fn grants(&self, code: &str) -> bool {
        self.is_active && self.code.as_str() == code
    }
}

impl Entity for Permission {
    type Id = PermissionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
