use axum::{
    extract::{Path, State},
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::found;
use crate::{
    envelope::{ApiError, ApiResult, Data},
    extract::{Json, Query},
    role::Role,
    session::Session,
    store::{
        generate_id, Page, StickerRequest, StickerRequestStatus, Vehicle, VehicleStatus,
    },
    validation::{page_query, required},
    AppState,
};

// ── Remote: attach ────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachStickerRequest {
    pub vehicle_id: Option<String>,
    pub sticker_code: Option<String>,
}

pub async fn attach_sticker(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(body): Json<AttachStickerRequest>,
) -> ApiResult<Value> {
    let vehicle_id = required("vehicleId", &body.vehicle_id)?;
    let sticker_code = required("stickerCode", &body.sticker_code)?;
    found(state.store.find::<Vehicle>(vehicle_id)?, "vehicle")?;

    let remote = state.remote()?;
    let data = remote
        .post(
            &remote.paths.attach_sticker,
            Some(session.token.as_str()),
            &json!({ "vehicleId": vehicle_id, "stickerCode": sticker_code }),
        )
        .await?;

    info!(%vehicle_id, %sticker_code, by = %session.user_id, "audit: sticker.attach");
    state.revalidator.revalidate("/vehicles");
    Ok(Data::ok(data))
}

// ── Remote: barcode ───────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBarcodeRequest {
    pub sticker_id: Option<String>,
    pub barcode: Option<String>,
}

pub async fn update_barcode(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(body): Json<UpdateBarcodeRequest>,
) -> ApiResult<Value> {
    let sticker_id = required("stickerId", &body.sticker_id)?;
    let barcode = required("barcode", &body.barcode)?;

    let remote = state.remote()?;
    let data = remote
        .patch(
            &remote.paths.update_sticker_barcode,
            Some(session.token.as_str()),
            &json!({ "stickerId": sticker_id, "barcode": barcode }),
        )
        .await?;

    info!(%sticker_id, by = %session.user_id, "audit: sticker.barcode");
    state.revalidator.revalidate("/stickers");
    Ok(Data::ok(data))
}

// ── Sticker requests ──────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StickerRequestQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<StickerRequestStatus>,
    pub vehicle_id: Option<String>,
}

pub async fn list_sticker_requests(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(q): Query<StickerRequestQuery>,
) -> ApiResult<Page<StickerRequest>> {
    let mine_only = session.role == Role::VehicleOwner;
    let page = state
        .store
        .page::<StickerRequest>(page_query(q.page, q.per_page), |r| {
            q.status.map_or(true, |s| r.status == s)
                && q.vehicle_id.as_deref().map_or(true, |v| r.vehicle_id == v)
                && (!mine_only || r.requested_by == session.user_id)
        })?;
    Ok(Data::ok(page))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStickerRequest {
    pub vehicle_id: Option<String>,
}

pub async fn create_sticker_request(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(body): Json<CreateStickerRequest>,
) -> ApiResult<StickerRequest> {
    let vehicle_id = required("vehicleId", &body.vehicle_id)?;
    let vehicle = found(state.store.find::<Vehicle>(vehicle_id)?, "vehicle")?;

    if session.role == Role::VehicleOwner
        && vehicle.owner_id.as_deref() != Some(session.user_id.as_str())
    {
        return Err(ApiError::NotFound("vehicle"));
    }
    if vehicle.status != VehicleStatus::Active {
        return Err(ApiError::field(
            "vehicleId",
            "stickers can only be requested for active vehicles",
        ));
    }
    let request = StickerRequest {
        id: generate_id(),
        vehicle_id: vehicle.id,
        requested_by: session.user_id.clone(),
        status: StickerRequestStatus::Pending,
        approved_by: None,
        approved_at: None,
        created_at: crate::now(),
        deleted_at: None,
    };
    state.store.insert_checked(&request, |live: &[StickerRequest]| {
        let pending = live.iter().any(|r| {
            r.vehicle_id == request.vehicle_id && r.status == StickerRequestStatus::Pending
        });
        if pending {
            return Err(ApiError::Conflict(
                "a sticker request for this vehicle is already pending".into(),
            ));
        }
        Ok(())
    })?;

    info!(id = %request.id, vehicle_id = %request.vehicle_id, by = %session.user_id, "audit: sticker_request.create");
    state.revalidator.revalidate("/sticker-requests");
    Ok(Data::created(request))
}

pub async fn approve_sticker_request(
    state: State<AppState>,
    session: Extension<Session>,
    id: Path<String>,
) -> ApiResult<StickerRequest> {
    decide_sticker_request(state, session, id, StickerRequestStatus::Approved).await
}

pub async fn reject_sticker_request(
    state: State<AppState>,
    session: Extension<Session>,
    id: Path<String>,
) -> ApiResult<StickerRequest> {
    decide_sticker_request(state, session, id, StickerRequestStatus::Rejected).await
}

async fn decide_sticker_request(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    outcome: StickerRequestStatus,
) -> ApiResult<StickerRequest> {
    let now = crate::now();
    let decided = state.store.try_update::<StickerRequest, ApiError>(&id, |r| {
        if r.status != StickerRequestStatus::Pending {
            return Err(ApiError::Conflict(
                format!("sticker request is already {:?}", r.status).to_lowercase(),
            ));
        }
        r.status = outcome;
        r.approved_by = Some(session.user_id.clone());
        r.approved_at = (outcome == StickerRequestStatus::Approved).then_some(now);
        Ok(())
    })?;
    let decided = found(decided, "sticker request")?;

    info!(%id, outcome = ?outcome, by = %session.user_id, "audit: sticker_request.decide");
    state.revalidator.revalidate("/sticker-requests");
    Ok(Data::ok(decided))
}

pub async fn delete_sticker_request(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    if !state.store.soft_delete::<StickerRequest>(&id, crate::now())? {
        return Err(ApiError::NotFound("sticker request"));
    }
    info!(%id, by = %session.user_id, "audit: sticker_request.delete");
    state.revalidator.revalidate("/sticker-requests");
    Ok(Data::ok(json!({"deleted": true})))
}
