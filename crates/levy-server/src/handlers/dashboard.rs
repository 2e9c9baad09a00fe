use axum::{extract::State, Extension};
use serde::Serialize;

use crate::{
    envelope::{ApiResult, Data},
    format::format_naira,
    role::Role,
    session::Session,
    store::{
        StickerRequest, StickerRequestStatus, Transaction, TransactionStatus, User, Vehicle,
        VehicleStatus,
    },
    AppState,
};

#[derive(Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionCounts {
    pub pending: usize,
    pub processing: usize,
    pub success: usize,
    pub failed: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub vehicles: usize,
    pub active_vehicles: usize,
    /// Absent for vehicle owners.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<usize>,
    pub transactions: TransactionCounts,
    pub successful_total: f64,
    pub successful_total_display: String,
    pub pending_sticker_requests: usize,
}

/// Headline counts. Vehicle owners see figures for their own vehicles only.
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Dashboard> {
    let owner = (session.role == Role::VehicleOwner).then_some(session.user_id.as_str());

    let vehicles = state
        .store
        .list::<Vehicle>(|v| owner.map_or(true, |o| v.owner_id.as_deref() == Some(o)))?;
    let vehicle_ids: Vec<&str> = vehicles.iter().map(|v| v.id.as_str()).collect();
    let in_scope = |vehicle_id: &str| owner.is_none() || vehicle_ids.iter().any(|id| *id == vehicle_id);

    let transactions = state
        .store
        .list::<Transaction>(|t| in_scope(&t.vehicle_id))?;
    let pending_sticker_requests = state.store.count::<StickerRequest>(|r| {
        r.status == StickerRequestStatus::Pending && in_scope(&r.vehicle_id)
    })?;
    let users = match owner {
        Some(_) => None,
        None => Some(state.store.count::<User>(|_| true)?),
    };

    let (counts, successful_total) = tally(&transactions);
    Ok(Data::ok(Dashboard {
        vehicles: vehicles.len(),
        active_vehicles: vehicles
            .iter()
            .filter(|v| v.status == VehicleStatus::Active)
            .count(),
        users,
        transactions: counts,
        successful_total,
        successful_total_display: format_naira(successful_total),
        pending_sticker_requests,
    }))
}

fn tally(transactions: &[Transaction]) -> (TransactionCounts, f64) {
    let mut counts = TransactionCounts::default();
    let mut total = 0.0;
    for t in transactions {
        match t.status {
            TransactionStatus::Pending => counts.pending += 1,
            TransactionStatus::Processing => counts.processing += 1,
            TransactionStatus::Failed => counts.failed += 1,
            TransactionStatus::Success => {
                counts.success += 1;
                total += t.payable_amount;
            }
        }
    }
    (counts, total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commission::PayableMode;

    fn tx(status: TransactionStatus, payable: f64) -> Transaction {
        Transaction {
            id: "t".into(),
            vehicle_id: "v".into(),
            agent_id: "a".into(),
            requested_amount: payable,
            payable_amount: payable,
            commission_amount: 0.0,
            agent_commission: 0.0,
            agency_commission: 0.0,
            mode: PayableMode::Full,
            status,
            payment_reference: "LVY-0".into(),
            created_at: 0,
            updated_at: 0,
            deleted_at: None,
        }
    }

    #[test]
    fn only_successful_transactions_count_towards_total() {
        let (counts, total) = tally(&[
            tx(TransactionStatus::Success, 950.0),
            tx(TransactionStatus::Success, 50.0),
            tx(TransactionStatus::Pending, 1000.0),
            tx(TransactionStatus::Failed, 1000.0),
        ]);
        assert_eq!(
            counts,
            TransactionCounts {
                pending: 1,
                processing: 0,
                success: 2,
                failed: 1
            }
        );
        assert_eq!(total, 1000.0);
    }
}
