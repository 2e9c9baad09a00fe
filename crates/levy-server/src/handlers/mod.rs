pub mod auth;
pub mod dashboard;
pub mod identity;
pub mod payments;
pub mod settings;
pub mod stickers;
pub mod transactions;
pub mod users;
pub mod vehicles;
pub mod whitelist;

use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::envelope::{ApiError, ApiResult, Data};
use crate::gate::{SIGNIN_PATH, UNAUTHORIZED_PATH};

// ── Health ────────────────────────────────────────────────────────────────────

pub async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

// ── Redirect targets ──────────────────────────────────────────────────────────

pub async fn signin() -> ApiResult<serde_json::Value> {
    Ok(Data::ok(json!({
        "page": SIGNIN_PATH,
        "message": "sign in to continue",
    })))
}

pub async fn unauthorized() -> ApiResult<serde_json::Value> {
    Ok(Data::ok(json!({
        "page": UNAUTHORIZED_PATH,
        "message": "your role does not have access to that page",
    })))
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Turns a missing record into a 404.
pub(crate) fn found<T>(record: Option<T>, what: &'static str) -> Result<T, ApiError> {
    record.ok_or(ApiError::NotFound(what))
}

/// Case-insensitive substring match used by listing searches.
pub(crate) fn matches_search(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
