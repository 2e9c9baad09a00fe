use axum::{
    extract::{Path, State},
    Extension,
};
use serde::Deserialize;
use tracing::info;

use super::found;
use crate::{
    envelope::{ApiError, ApiResult, Data},
    extract::{Json, Query},
    session::Session,
    store::{generate_id, Page, Vehicle, VehicleSetting},
    validation::{page_query, required},
    AppState,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub active: Option<bool>,
}

pub async fn list_settings(
    State(state): State<AppState>,
    Query(q): Query<SettingQuery>,
) -> ApiResult<Page<VehicleSetting>> {
    let page = state
        .store
        .page::<VehicleSetting>(page_query(q.page, q.per_page), |s| {
            q.active.map_or(true, |a| s.active == a)
        })?;
    Ok(Data::ok(page))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub active: Option<bool>,
    pub vehicle_ids: Option<Vec<String>>,
    pub exemption_types: Option<Vec<String>>,
}

pub async fn create_setting(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(body): Json<SettingRequest>,
) -> ApiResult<VehicleSetting> {
    let name = required("name", &body.name)?.to_owned();
    let vehicle_ids = body.vehicle_ids.unwrap_or_default();
    ensure_vehicles(&state, &vehicle_ids)?;

    let now = crate::now();
    let setting = VehicleSetting {
        id: generate_id(),
        name,
        description: body.description,
        active: body.active.unwrap_or(true),
        vehicle_ids,
        exemption_types: normalise_exemptions(body.exemption_types.unwrap_or_default()),
        created_at: now,
        updated_at: now,
    };
    state
        .store
        .insert_checked(&setting, |live| name_free(live, &setting.name))?;

    info!(id = %setting.id, name = %setting.name, by = %session.user_id, "audit: vehicle_setting.create");
    state.revalidator.revalidate("/vehicle-settings");
    Ok(Data::created(setting))
}

pub async fn update_setting(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(body): Json<SettingRequest>,
) -> ApiResult<VehicleSetting> {
    let name = match &body.name {
        Some(_) => Some(required("name", &body.name)?.to_owned()),
        None => None,
    };
    if let Some(ids) = &body.vehicle_ids {
        ensure_vehicles(&state, ids)?;
    }

    let now = crate::now();
    let updated = state.store.try_update_among::<VehicleSetting, ApiError>(&id, |s, others| {
        if let Some(name) = name {
            name_free(others, &name)?;
            s.name = name;
        }
        if body.description.is_some() {
            s.description = body.description;
        }
        if let Some(active) = body.active {
            s.active = active;
        }
        if let Some(ids) = body.vehicle_ids {
            s.vehicle_ids = ids;
        }
        if let Some(types) = body.exemption_types {
            s.exemption_types = normalise_exemptions(types);
        }
        s.updated_at = now;
        Ok(())
    })?;
    let setting = found(updated, "vehicle setting")?;

    info!(%id, by = %session.user_id, "audit: vehicle_setting.update");
    state.revalidator.revalidate("/vehicle-settings");
    Ok(Data::ok(setting))
}

/// Setting names are unique, ignoring case.
fn name_free(live: &[VehicleSetting], name: &str) -> Result<(), ApiError> {
    if live.iter().any(|s| s.name.eq_ignore_ascii_case(name)) {
        return Err(ApiError::Conflict(format!("a setting named {name} already exists")));
    }
    Ok(())
}

fn ensure_vehicles(state: &AppState, ids: &[String]) -> Result<(), ApiError> {
    for id in ids {
        if state.store.find::<Vehicle>(id)?.is_none() {
            return Err(ApiError::field(
                "vehicleIds",
                format!("vehicle {id} does not exist"),
            ));
        }
    }
    Ok(())
}

/// Trimmed, upper-cased, de-duplicated, order preserved.
fn normalise_exemptions(types: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(types.len());
    for t in types {
        let t = t.trim().to_ascii_uppercase();
        if !t.is_empty() && !out.contains(&t) {
            out.push(t);
        }
    }
    out
}
