use axum::{extract::State, Extension};
use serde::Serialize;
use tracing::info;

use crate::{
    envelope::{ApiError, ApiResult, Data},
    format::format_datetime,
    role::{Capability, Role},
    session::Session,
    store::User,
    AppState,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub user_id: String,
    pub role: Role,
    pub expires_at: i64,
    pub expires_at_display: String,
    pub capabilities: Vec<Capability>,
    pub assignable_roles: Vec<Role>,
}

pub async fn current_session(Extension(session): Extension<Session>) -> ApiResult<SessionView> {
    Ok(Data::ok(SessionView {
        user_id: session.user_id,
        role: session.role,
        expires_at: session.expires_at,
        expires_at_display: format_datetime(session.expires_at),
        capabilities: session.role.capabilities(),
        assignable_roles: session.role.assignable_roles(),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshedSession {
    pub token: String,
    pub role: Role,
    pub expires_at: i64,
}

/// Reissues the caller's token with a fresh expiry. The role is re-read from
/// the user record so role changes take effect on the next refresh.
pub async fn refresh_session(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<RefreshedSession> {
    let user = state
        .store
        .find::<User>(&session.user_id)?
        .filter(User::may_sign_in)
        .ok_or(ApiError::Unauthenticated)?;

    let refreshed = Session {
        user_id: user.id,
        role: user.role,
        token: session.token,
        expires_at: crate::now() + state.session_ttl,
    };
    let token = state.session_key.issue(&refreshed);

    info!(user_id = %refreshed.user_id, role = %refreshed.role, "audit: session.refresh");
    Ok(Data::ok(RefreshedSession {
        token,
        role: refreshed.role,
        expires_at: refreshed.expires_at,
    }))
}
