use axum::{
    extract::{Path, State},
    Extension,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::found;
use crate::{
    commission::{non_negative, CommissionRates, PayableMode, Quote},
    envelope::{ApiError, ApiResult, Data},
    extract::{Json, Query},
    format::{format_datetime, format_naira},
    role::Role,
    session::Session,
    store::{generate_id, Page, Transaction, TransactionStatus, Vehicle},
    validation::{page_query, required},
    AppState,
};

/// Listing row with display strings alongside the raw values.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub payable_display: String,
    pub created_at_display: String,
}

impl From<Transaction> for TransactionView {
    fn from(transaction: Transaction) -> Self {
        Self {
            payable_display: format_naira(transaction.payable_amount),
            created_at_display: format_datetime(transaction.created_at),
            transaction,
        }
    }
}

/// Who a caller may see transactions for.
enum Scope {
    All,
    Agent(String),
    Owner(Vec<String>),
}

impl Scope {
    fn for_session(state: &AppState, session: &Session) -> Result<Self, ApiError> {
        Ok(match session.role {
            Role::VehicleOwner => Scope::Owner(
                state
                    .store
                    .list::<Vehicle>(|v| v.owner_id.as_deref() == Some(session.user_id.as_str()))?
                    .into_iter()
                    .map(|v| v.id)
                    .collect(),
            ),
            Role::EirsAgent | Role::LgaAgent | Role::LgaCAgent | Role::PosAgent => {
                Scope::Agent(session.user_id.clone())
            }
            _ => Scope::All,
        })
    }

    fn admits(&self, t: &Transaction) -> bool {
        match self {
            Scope::All => true,
            Scope::Agent(id) => &t.agent_id == id,
            Scope::Owner(vehicles) => vehicles.contains(&t.vehicle_id),
        }
    }
}

// ── List ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<TransactionStatus>,
    pub vehicle_id: Option<String>,
    pub agent_id: Option<String>,
}

pub async fn list_transactions(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(q): Query<TransactionQuery>,
) -> ApiResult<Page<TransactionView>> {
    let scope = Scope::for_session(&state, &session)?;
    let page = state
        .store
        .page::<Transaction>(page_query(q.page, q.per_page), |t| {
            scope.admits(t)
                && q.status.map_or(true, |s| t.status == s)
                && q.vehicle_id.as_deref().map_or(true, |v| t.vehicle_id == v)
                && q.agent_id.as_deref().map_or(true, |a| t.agent_id == a)
        })?;
    Ok(Data::ok(page.map(TransactionView::from)))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> ApiResult<TransactionView> {
    let transaction = found(state.store.find::<Transaction>(&id)?, "transaction")?;
    if !Scope::for_session(&state, &session)?.admits(&transaction) {
        return Err(ApiError::NotFound("transaction"));
    }
    Ok(Data::ok(transaction.into()))
}

// ── Quote ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub amount: Option<f64>,
    pub rate: Option<f64>,
    pub agent_share: Option<f64>,
    pub agency_share: Option<f64>,
    #[serde(default)]
    pub mode: PayableMode,
}

/// Computes a commission split; omitted rates fall back to the configured
/// ones.
pub async fn quote(
    State(state): State<AppState>,
    Json(body): Json<QuoteRequest>,
) -> ApiResult<Quote> {
    let amount = non_negative(
        "amount",
        body.amount
            .ok_or_else(|| ApiError::field("amount", "amount is required"))?,
    )?;
    let rates = CommissionRates {
        rate: body.rate.unwrap_or(state.commission.rate),
        agent_share: body.agent_share.unwrap_or(state.commission.agent_share),
        agency_share: body.agency_share.unwrap_or(state.commission.agency_share),
    };
    rates.validate()?;
    Ok(Data::ok(rates.quote(amount, body.mode)))
}

// ── Create ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionRequest {
    pub vehicle_id: Option<String>,
    pub amount: Option<f64>,
    #[serde(default)]
    pub mode: PayableMode,
}

pub async fn create_transaction(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(body): Json<CreateTransactionRequest>,
) -> ApiResult<TransactionView> {
    let vehicle_id = required("vehicleId", &body.vehicle_id)?;
    let amount = non_negative(
        "amount",
        body.amount
            .ok_or_else(|| ApiError::field("amount", "amount is required"))?,
    )?;
    let vehicle = found(state.store.find::<Vehicle>(vehicle_id)?, "vehicle")?;

    let quote = state.commission.quote(amount, body.mode);
    let now = crate::now();
    let transaction = Transaction {
        id: generate_id(),
        vehicle_id: vehicle.id,
        agent_id: session.user_id.clone(),
        requested_amount: amount,
        payable_amount: quote.payable_amount,
        commission_amount: quote.split.total_commission,
        agent_commission: quote.split.agent_commission,
        agency_commission: quote.split.agency_commission,
        mode: body.mode,
        status: TransactionStatus::Pending,
        payment_reference: generate_payment_reference(),
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };
    state.store.insert(&transaction)?;

    info!(
        id = %transaction.id,
        reference = %transaction.payment_reference,
        amount,
        by = %session.user_id,
        "audit: transaction.create"
    );
    state.revalidator.revalidate("/transactions");
    Ok(Data::created(transaction.into()))
}

// ── Status ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct StatusRequest {
    pub status: Option<TransactionStatus>,
}

pub async fn update_status(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(body): Json<StatusRequest>,
) -> ApiResult<TransactionView> {
    let next = body
        .status
        .ok_or_else(|| ApiError::field("status", "status is required"))?;
    let now = crate::now();
    let updated = state.store.try_update::<Transaction, ApiError>(&id, |t| {
        if !can_move(t.status, next) {
            return Err(ApiError::Conflict(format!(
                "cannot move a {:?} transaction to {:?}",
                t.status, next
            )));
        }
        t.status = next;
        t.updated_at = now;
        Ok(())
    })?;
    let transaction = found(updated, "transaction")?;

    info!(%id, status = ?next, by = %session.user_id, "audit: transaction.status");
    state.revalidator.revalidate("/transactions");
    Ok(Data::ok(transaction.into()))
}

/// SUCCESS and FAILED are final.
fn can_move(from: TransactionStatus, to: TransactionStatus) -> bool {
    use crate::store::TransactionStatus::*;
    matches!(
        (from, to),
        (Pending, Processing | Success | Failed) | (Processing, Success | Failed)
    )
}

fn generate_payment_reference() -> String {
    use rand::Rng;
    let bytes: [u8; 6] = rand::thread_rng().gen();
    format!("LVY-{}", hex::encode_upper(bytes))
}
