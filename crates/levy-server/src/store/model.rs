use serde::{Deserialize, Serialize};

use crate::commission::PayableMode;
use crate::role::Role;

// ── Users ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Active,
    Blocked,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub status: UserStatus,
    pub blacklisted: bool,
    pub created_at: i64,
    pub deleted_at: Option<i64>,
}

impl User {
    /// Whether a session for this user may be refreshed.
    pub fn may_sign_in(&self) -> bool {
        self.deleted_at.is_none() && !self.blacklisted && self.status == UserStatus::Active
    }
}

// ── Vehicles ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleStatus {
    Active,
    Inactive,
    Impounded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: String,
    pub plate_number: String,
    pub vin: Option<String>,
    pub category: String,
    pub vehicle_type: Option<String>,
    pub status: VehicleStatus,
    pub owner_id: Option<String>,
    pub group_id: Option<String>,
    pub security_code: String,
    pub created_at: i64,
    pub deleted_at: Option<i64>,
}

// ── Transactions ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
    Processing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub vehicle_id: String,
    pub agent_id: String,
    pub requested_amount: f64,
    pub payable_amount: f64,
    pub commission_amount: f64,
    pub agent_commission: f64,
    pub agency_commission: f64,
    pub mode: PayableMode,
    pub status: TransactionStatus,
    pub payment_reference: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

// ── Sticker requests ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StickerRequestStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StickerRequest {
    pub id: String,
    pub vehicle_id: String,
    pub requested_by: String,
    pub status: StickerRequestStatus,
    pub approved_by: Option<String>,
    pub approved_at: Option<i64>,
    pub created_at: i64,
    pub deleted_at: Option<i64>,
}

// ── Payment notifications ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentNotification {
    pub id: String,
    pub amount: f64,
    pub customer_name: String,
    pub revenue_name: String,
    pub revenue_category: String,
    pub created_at: i64,
}

// ── IP whitelist ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhitelistedIp {
    pub id: String,
    pub ip: String,
    pub created_at: i64,
    pub updated_at: i64,
}

// ── Vehicle settings ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleSetting {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
    pub vehicle_ids: Vec<String>,
    pub exemption_types: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}
