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
    store::{generate_id, Page, User, Vehicle, VehicleStatus},
    validation::{self, page_query, required},
    AppState,
};

// ── List ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<VehicleStatus>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub owner_id: Option<String>,
}

/// Vehicle owners only ever see their own vehicles.
fn owner_scope(session: &Session, requested: Option<String>) -> Option<String> {
    if session.role == Role::VehicleOwner {
        Some(session.user_id.clone())
    } else {
        requested
    }
}

pub async fn list_vehicles(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(q): Query<VehicleQuery>,
) -> ApiResult<Page<Vehicle>> {
    let owner = owner_scope(&session, q.owner_id);
    let search = q.search.filter(|s| !s.trim().is_empty());

    let page = state.store.page::<Vehicle>(page_query(q.page, q.per_page), |v| {
        q.status.map_or(true, |s| v.status == s)
            && q
                .category
                .as_deref()
                .map_or(true, |c| v.category.eq_ignore_ascii_case(c))
            && owner
                .as_deref()
                .map_or(true, |o| v.owner_id.as_deref() == Some(o))
            && search.as_deref().map_or(true, |s| {
                matches_search(&v.plate_number, s)
                    || v.vin.as_deref().is_some_and(|vin| matches_search(vin, s))
            })
    })?;
    Ok(Data::ok(page))
}

// ── Get ───────────────────────────────────────────────────────────────────────

pub async fn get_vehicle(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> ApiResult<Vehicle> {
    let vehicle = found(state.store.find::<Vehicle>(&id)?, "vehicle")?;
    if session.role == Role::VehicleOwner && vehicle.owner_id.as_deref() != Some(session.user_id.as_str()) {
        return Err(ApiError::NotFound("vehicle"));
    }
    Ok(Data::ok(vehicle))
}

// ── Create ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVehicleRequest {
    pub plate_number: Option<String>,
    pub vin: Option<String>,
    pub category: Option<String>,
    pub vehicle_type: Option<String>,
    pub owner_id: Option<String>,
    pub group_id: Option<String>,
}

pub async fn create_vehicle(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(body): Json<CreateVehicleRequest>,
) -> ApiResult<Vehicle> {
    let plate = validation::plate_number(required("plateNumber", &body.plate_number)?)?;
    let category = required("category", &body.category)?.to_ascii_uppercase();
    let vin = body.vin.as_deref().map(validation::vin).transpose()?;

    if let Some(owner) = &body.owner_id {
        ensure_owner(&state, owner)?;
    }

    let vehicle = Vehicle {
        id: generate_id(),
        plate_number: plate,
        vin,
        category,
        vehicle_type: body.vehicle_type,
        status: VehicleStatus::Active,
        owner_id: body.owner_id,
        group_id: body.group_id,
        security_code: generate_security_code(),
        created_at: crate::now(),
        deleted_at: None,
    };
    state
        .store
        .insert_checked(&vehicle, |live| plate_free(live, &vehicle.plate_number))?;

    info!(
        id = %vehicle.id,
        plate = %vehicle.plate_number,
        by = %session.user_id,
        "audit: vehicle.create"
    );
    state.revalidator.revalidate("/vehicles");
    Ok(Data::created(vehicle))
}

// ── Update ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVehicleRequest {
    pub plate_number: Option<String>,
    pub vin: Option<String>,
    pub category: Option<String>,
    pub vehicle_type: Option<String>,
    pub status: Option<VehicleStatus>,
    pub owner_id: Option<String>,
    pub group_id: Option<String>,
}

pub async fn update_vehicle(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(body): Json<UpdateVehicleRequest>,
) -> ApiResult<Vehicle> {
    let plate = body
        .plate_number
        .as_deref()
        .map(validation::plate_number)
        .transpose()?;
    let vin = body.vin.as_deref().map(validation::vin).transpose()?;
    if let Some(owner) = &body.owner_id {
        ensure_owner(&state, owner)?;
    }

    let updated = state.store.try_update_among::<Vehicle, ApiError>(&id, |v, others| {
        if let Some(plate) = plate {
            plate_free(others, &plate)?;
            v.plate_number = plate;
        }
        if vin.is_some() {
            v.vin = vin;
        }
        if let Some(category) = body.category {
            v.category = category.trim().to_ascii_uppercase();
        }
        if body.vehicle_type.is_some() {
            v.vehicle_type = body.vehicle_type;
        }
        if let Some(status) = body.status {
            v.status = status;
        }
        if body.owner_id.is_some() {
            v.owner_id = body.owner_id;
        }
        if body.group_id.is_some() {
            v.group_id = body.group_id;
        }
        Ok(())
    })?;
    let vehicle = found(updated, "vehicle")?;

    info!(id = %vehicle.id, by = %session.user_id, "audit: vehicle.update");
    state.revalidator.revalidate("/vehicles");
    Ok(Data::ok(vehicle))
}

// ── Delete ────────────────────────────────────────────────────────────────────

pub async fn delete_vehicle(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    if !state.store.soft_delete::<Vehicle>(&id, crate::now())? {
        return Err(ApiError::NotFound("vehicle"));
    }
    info!(%id, by = %session.user_id, "audit: vehicle.delete");
    state.revalidator.revalidate("/vehicles");
    Ok(Data::ok(json!({"deleted": true})))
}

// ── Remote: virtual account ───────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualAccountRequest {
    pub vehicle_id: Option<String>,
    pub wallet_id: Option<String>,
}

pub async fn create_virtual_account(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(body): Json<VirtualAccountRequest>,
) -> ApiResult<Value> {
    let vehicle_id = required("vehicleId", &body.vehicle_id)?;
    let wallet_id = required("walletId", &body.wallet_id)?;
    found(state.store.find::<Vehicle>(vehicle_id)?, "vehicle")?;

    let remote = state.remote()?;
    let data = remote
        .post(
            &remote.paths.create_virtual_account,
            Some(session.token.as_str()),
            &json!({ "vehicleId": vehicle_id, "walletId": wallet_id }),
        )
        .await?;

    info!(%vehicle_id, %wallet_id, by = %session.user_id, "audit: vehicle.virtual_account");
    state.revalidator.revalidate(&format!("/vehicles/{vehicle_id}"));
    Ok(Data::created(data))
}

// ── Remote: net total ─────────────────────────────────────────────────────────

pub async fn recalculate_net_total(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    found(state.store.find::<Vehicle>(&id)?, "vehicle")?;

    let remote = state.remote()?;
    let data = remote
        .post(
            &remote.paths.recalculate_net_total,
            Some(session.token.as_str()),
            &json!({ "vehicleId": id }),
        )
        .await?;

    info!(%id, by = %session.user_id, "audit: vehicle.net_total");
    state.revalidator.revalidate(&format!("/vehicles/{id}"));
    Ok(Data::ok(data))
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Plates are unique among live vehicles.
fn plate_free(live: &[Vehicle], plate: &str) -> Result<(), ApiError> {
    if live.iter().any(|v| v.plate_number == plate) {
        Err(ApiError::Conflict(format!(
            "plate number {plate} is already registered"
        )))
    } else {
        Ok(())
    }
}

fn ensure_owner(state: &AppState, owner_id: &str) -> Result<(), ApiError> {
    match state.store.find::<User>(owner_id)? {
        Some(_) => Ok(()),
        None => Err(ApiError::field("ownerId", "ownerId does not match a user")),
    }
}

/// Eight-digit code printed alongside the sticker for manual verification.
fn generate_security_code() -> String {
    use rand::Rng;
    format!("{:08}", rand::thread_rng().gen_range(0..100_000_000u32))
}
