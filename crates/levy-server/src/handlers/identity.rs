use axum::{
    extract::{Path, State},
    Extension,
};
use tracing::info;

use crate::{
    envelope::{ApiError, ApiResult, Data},
    identity::IdentityProfile,
    session::Session,
    AppState,
};

pub async fn verify_identity(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(identifier): Path<String>,
) -> ApiResult<IdentityProfile> {
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return Err(ApiError::field("identifier", "identifier is required"));
    }

    let profile = state
        .identity
        .lookup(identifier)
        .await?
        .ok_or(ApiError::NotFound("identity"))?;

    info!(by = %session.user_id, "audit: identity.verify");
    Ok(Data::ok(profile))
}
