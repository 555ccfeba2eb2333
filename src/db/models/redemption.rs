//! Redemption ledger rows.
//!
//! One row per (voucher, user) while the redeeming order is non-cancelled;
//! the unique index on that pair is what enforces single use under
//! concurrent checkouts. Rows are deleted when the order is cancelled.

use super::order::OrderId;
use super::serde_helpers;
use super::user::UserId;
use super::voucher::VoucherId;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Redemption {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "serde_helpers::option_record_id"
    )]
    pub id: Option<RecordId>,
    #[serde(with = "serde_helpers::record_id")]
    pub promo_id: VoucherId,
    #[serde(with = "serde_helpers::record_id")]
    pub user_id: UserId,
    #[serde(with = "serde_helpers::record_id")]
    pub order_id: OrderId,
    /// Copied from the voucher at redemption time so first-order eligibility
    /// is answerable from the ledger alone.
    pub first_order_only: bool,
    pub redeemed_at: i64,
}

/// A `mark_used` attempt that failed after the payment committed; retried by
/// the reconciler, never allowed to fail the order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedemptionBacklogEntry {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "serde_helpers::option_record_id"
    )]
    pub id: Option<RecordId>,
    #[serde(with = "serde_helpers::record_id")]
    pub promo_id: VoucherId,
    #[serde(with = "serde_helpers::record_id")]
    pub user_id: UserId,
    #[serde(with = "serde_helpers::record_id")]
    pub order_id: OrderId,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub created_at: i64,
}
