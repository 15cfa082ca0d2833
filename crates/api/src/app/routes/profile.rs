use axum::{extract::Extension, Json};

use crate::app::dto::{Envelope, ProfileDto};
use crate::context::PrincipalContext;

/// The identity document: every assigned role, in assignment order.
/// Portal filtering is the client's job.
pub async fn profile(Extension(principal): Extension<PrincipalContext>) -> Json<Envelope<ProfileDto>> {
    Json(Envelope::ok(ProfileDto {
        id: principal.identity_id().clone(),
        roles: principal.roles().to_vec(),
    }))
}
