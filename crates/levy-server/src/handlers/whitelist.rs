use axum::{
    extract::{Path, State},
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::{
    envelope::{ApiError, ApiResult, Data},
    extract::{Json, Query},
    session::Session,
    store::{generate_id, Page, WhitelistedIp},
    validation::{self, page_query, required},
    AppState,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhitelistQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

pub async fn list_whitelisted_ips(
    State(state): State<AppState>,
    Query(q): Query<WhitelistQuery>,
) -> ApiResult<Page<WhitelistedIp>> {
    let page = state
        .store
        .page::<WhitelistedIp>(page_query(q.page, q.per_page), |_| true)?;
    Ok(Data::ok(page))
}

#[derive(Debug, Default, Deserialize)]
pub struct WhitelistRequest {
    pub ip: Option<String>,
}

pub async fn create_whitelisted_ip(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(body): Json<WhitelistRequest>,
) -> ApiResult<WhitelistedIp> {
    let ip = validation::ipv4("ip", required("ip", &body.ip)?)?.to_string();

    let now = crate::now();
    let entry = WhitelistedIp {
        id: generate_id(),
        ip,
        created_at: now,
        updated_at: now,
    };
    state.store.insert_checked(&entry, |live: &[WhitelistedIp]| {
        if live.iter().any(|w| w.ip == entry.ip) {
            return Err(ApiError::Conflict(format!("{} is already whitelisted", entry.ip)));
        }
        Ok(())
    })?;

    info!(id = %entry.id, ip = %entry.ip, by = %session.user_id, "audit: whitelist.create");
    state.revalidator.revalidate("/whitelisted-ips");
    Ok(Data::created(entry))
}

/// Whitelist entries are removed outright; there is nothing to restore.
pub async fn delete_whitelisted_ip(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    if !state.store.delete::<WhitelistedIp>(&id)? {
        return Err(ApiError::NotFound("whitelisted IP"));
    }
    info!(%id, by = %session.user_id, "audit: whitelist.delete");
    state.revalidator.revalidate("/whitelisted-ips");
    Ok(Data::ok(json!({"deleted": true})))
}
