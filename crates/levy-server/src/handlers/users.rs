use axum::{
    extract::{Path, State},
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::{found, matches_search};
use crate::{
    envelope::{ApiError, ApiResult, Data},
    extract::{Json, Query},
    role::Role,
    session::Session,
    store::{generate_id, Page, User, UserStatus},
    validation::{self, page_query, required},
    AppState,
};

// ── List ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
    pub blacklisted: Option<bool>,
    pub search: Option<String>,
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(q): Query<UserQuery>,
) -> ApiResult<Page<User>> {
    let search = q.search.filter(|s| !s.trim().is_empty());
    let page = state.store.page::<User>(page_query(q.page, q.per_page), |u| {
        q.role.map_or(true, |r| u.role == r)
            && q.status.map_or(true, |s| u.status == s)
            && q.blacklisted.map_or(true, |b| u.blacklisted == b)
            && search
                .as_deref()
                .map_or(true, |s| matches_search(&u.name, s) || matches_search(&u.email, s))
    })?;
    Ok(Data::ok(page))
}

// ── Create ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<Role>,
}

pub async fn create_user(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(body): Json<CreateUserRequest>,
) -> ApiResult<User> {
    let name = required("name", &body.name)?.to_owned();
    let email = validation::email(required("email", &body.email)?)?;
    let phone = body.phone.as_deref().map(validation::phone).transpose()?;
    let role = body
        .role
        .ok_or_else(|| ApiError::field("role", "role is required"))?;

    ensure_can_assign(&session, role)?;

    let user = User {
        id: generate_id(),
        name,
        email,
        phone,
        role,
        status: UserStatus::Active,
        blacklisted: false,
        created_at: crate::now(),
        deleted_at: None,
    };
    state.store.insert_checked(&user, |live: &[User]| {
        if live.iter().any(|u| u.email == user.email) {
            return Err(ApiError::Conflict(format!(
                "{} is already registered",
                user.email
            )));
        }
        Ok(())
    })?;

    info!(id = %user.id, role = %user.role, by = %session.user_id, "audit: user.create");
    state.revalidator.revalidate("/users");
    Ok(Data::created(user))
}

// ── Role ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: Option<Role>,
}

pub async fn change_role(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(body): Json<ChangeRoleRequest>,
) -> ApiResult<User> {
    let role = body
        .role
        .ok_or_else(|| ApiError::field("role", "role is required"))?;
    let target = managed_user(&state, &session, &id)?;
    ensure_can_assign(&session, role)?;

    let user = found(
        state.store.update::<User>(&target.id, |u| u.role = role)?,
        "user",
    )?;

    info!(%id, from = %target.role, to = %role, by = %session.user_id, "audit: user.role");
    state.revalidator.revalidate("/users");
    Ok(Data::ok(user))
}

// ── Status ────────────────────────────────────────────────────────────────────

pub async fn block_user(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> ApiResult<User> {
    let user = modify_user(&state, &session, &id, |u| u.status = UserStatus::Blocked)?;
    info!(%id, by = %session.user_id, "audit: user.block");
    Ok(Data::ok(user))
}

pub async fn unblock_user(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> ApiResult<User> {
    let user = modify_user(&state, &session, &id, |u| u.status = UserStatus::Active)?;
    info!(%id, by = %session.user_id, "audit: user.unblock");
    Ok(Data::ok(user))
}

pub async fn blacklist_user(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> ApiResult<User> {
    let user = modify_user(&state, &session, &id, |u| u.blacklisted = true)?;
    info!(%id, by = %session.user_id, "audit: user.blacklist");
    Ok(Data::ok(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    managed_user(&state, &session, &id)?;
    if !state.store.soft_delete::<User>(&id, crate::now())? {
        return Err(ApiError::NotFound("user"));
    }
    info!(%id, by = %session.user_id, "audit: user.delete");
    state.revalidator.revalidate("/users");
    Ok(Data::ok(json!({"deleted": true})))
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn ensure_can_assign(session: &Session, role: Role) -> Result<(), ApiError> {
    if session.role.can_assign(role) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!(
            "{} may not assign the {role} role",
            session.role
        )))
    }
}

/// A live user the caller has authority over: not themselves, and holding a
/// role the caller could have assigned.
fn managed_user(state: &AppState, session: &Session, id: &str) -> Result<User, ApiError> {
    if id == session.user_id {
        return Err(ApiError::Forbidden("you cannot modify your own account".into()));
    }
    let user = found(state.store.find::<User>(id)?, "user")?;
    ensure_can_assign(session, user.role)?;
    Ok(user)
}

fn modify_user(
    state: &AppState,
    session: &Session,
    id: &str,
    f: impl FnOnce(&mut User),
) -> Result<User, ApiError> {
    managed_user(state, session, id)?;
    let user = found(state.store.update::<User>(id, f)?, "user")?;
    state.revalidator.revalidate("/users");
    Ok(user)
}
