use std::collections::BTreeMap;

use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    commission::non_negative,
    envelope::{ApiError, ApiResult, Data},
    extract::{Json, Query},
    format::format_naira,
    store::{generate_id, Page, PaymentNotification},
    validation::{page_query, required},
    AppState,
};

// ── Ingest ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentNotificationRequest {
    pub amount: Option<f64>,
    pub customer_name: Option<String>,
    pub revenue_name: Option<String>,
    pub revenue_category: Option<String>,
}

/// Callback from the payment collector. Gated by the IP whitelist.
pub async fn ingest_notification(
    State(state): State<AppState>,
    Json(body): Json<PaymentNotificationRequest>,
) -> ApiResult<PaymentNotification> {
    let amount = non_negative(
        "amount",
        body.amount
            .ok_or_else(|| ApiError::field("amount", "amount is required"))?,
    )?;
    let notification = PaymentNotification {
        id: generate_id(),
        amount,
        customer_name: required("customerName", &body.customer_name)?.to_owned(),
        revenue_name: required("revenueName", &body.revenue_name)?.to_owned(),
        revenue_category: required("revenueCategory", &body.revenue_category)?.to_owned(),
        created_at: crate::now(),
    };
    state.store.insert(&notification)?;

    info!(
        id = %notification.id,
        amount,
        category = %notification.revenue_category,
        "audit: payment_notification.create"
    );
    state.revalidator.revalidate("/payment-notifications");
    Ok(Data::created(notification))
}

// ── List ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub category: Option<String>,
    pub from: Option<i64>,
    pub to: Option<i64>,
}

impl NotificationQuery {
    fn admits(&self, n: &PaymentNotification) -> bool {
        self.category
            .as_deref()
            .map_or(true, |c| n.revenue_category.eq_ignore_ascii_case(c))
            && self.from.map_or(true, |from| n.created_at >= from)
            && self.to.map_or(true, |to| n.created_at < to)
    }
}

pub async fn list_notifications(
    State(state): State<AppState>,
    Query(q): Query<NotificationQuery>,
) -> ApiResult<Page<PaymentNotification>> {
    let page = state
        .store
        .page::<PaymentNotification>(page_query(q.page, q.per_page), |n| q.admits(n))?;
    Ok(Data::ok(page))
}

// ── Summary ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotal {
    pub category: String,
    pub count: usize,
    pub total: f64,
    pub total_display: String,
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
    pub count: usize,
    pub total: f64,
    pub total_display: String,
    pub by_category: Vec<CategoryTotal>,
}

pub fn summarise(notifications: &[PaymentNotification]) -> PaymentSummary {
    let mut by_category: BTreeMap<&str, CategoryTotal> = BTreeMap::new();
    for n in notifications {
        let entry = by_category
            .entry(n.revenue_category.as_str())
            .or_insert_with(|| CategoryTotal {
                category: n.revenue_category.clone(),
                ..Default::default()
            });
        entry.count += 1;
        entry.total += n.amount;
    }

    let total: f64 = notifications.iter().map(|n| n.amount).sum();
    PaymentSummary {
        count: notifications.len(),
        total,
        total_display: format_naira(total),
        by_category: by_category
            .into_values()
            .map(|mut c| {
                c.total_display = format_naira(c.total);
                c
            })
            .collect(),
    }
}

pub async fn notification_summary(
    State(state): State<AppState>,
    Query(q): Query<NotificationQuery>,
) -> ApiResult<PaymentSummary> {
    let notifications = state.store.list::<PaymentNotification>(|n| q.admits(n))?;
    Ok(Data::ok(summarise(&notifications)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(amount: f64, category: &str) -> PaymentNotification {
        PaymentNotification {
            id: generate_id(),
            amount,
            customer_name: "Ada".into(),
            revenue_name: "Levy".into(),
            revenue_category: category.into(),
            created_at: 0,
        }
    }

    #[test]
    fn summary_totals_by_category() {
        let s = summarise(&[note(1000.0, "ROAD"), note(250.5, "PARKING"), note(500.0, "ROAD")]);
        assert_eq!(s.count, 3);
        assert_eq!(s.total, 1750.5);
        assert_eq!(s.total_display, "₦1,750.50");
        assert_eq!(
            s.by_category
                .iter()
                .map(|c| (c.category.as_str(), c.count, c.total))
                .collect::<Vec<_>>(),
            vec![("PARKING", 1, 250.5), ("ROAD", 2, 1500.0)]
        );
    }

    #[test]
    fn empty_summary_is_zero() {
        let s = summarise(&[]);
        assert_eq!(s.count, 0);
        assert_eq!(s.total_display, "₦0.00");
        assert!(s.by_category.is_empty());
    }

    #[test]
    fn query_filters_by_window() {
        let q = NotificationQuery {
            from: Some(10),
            to: Some(20),
            ..Default::default()
        };
        let mut n = note(1.0, "ROAD");
        n.created_at = 15;
        assert!(q.admits(&n));
        n.created_at = 20;
        assert!(!q.admits(&n));
    }
}
