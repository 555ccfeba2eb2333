//! Voucher (Promotion) Model
//!
//! Vouchers are authored by administrators (out of scope) and read by the
//! voucher engine at order creation and cancellation time. Redemption is
//! tracked in the dedicated ledger (`redemption.rs`), not on the voucher.

use super::restaurant::RestaurantId;
use super::serde_helpers;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

/// Voucher ID type
pub type VoucherId = RecordId;

/// Discount shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoucherKind {
    /// Percentage of the subtotal, optionally capped by `max_discount`.
    Percent,
    /// Fixed amount, never exceeding the subtotal.
    Fixed,
    /// Shipping-fee discount, capped by `max_discount` or the fee itself.
    Freeship,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voucher {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "serde_helpers::option_record_id"
    )]
    pub id: Option<VoucherId>,
    /// Unique code the user types in.
    pub code: String,
    pub promo_name: String,
    pub kind: VoucherKind,
    /// Percentage for `Percent`, amount for `Fixed`/`Freeship`.
    pub value: f64,
    pub max_discount: Option<f64>,
    pub min_order_amount: Option<f64>,
    /// None = platform-wide.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "serde_helpers::option_record_id"
    )]
    pub restaurant_id: Option<RestaurantId>,
    #[serde(default, deserialize_with = "serde_helpers::bool_false")]
    pub first_order_only: bool,
    #[serde(
        default = "default_true",
        deserialize_with = "serde_helpers::bool_true"
    )]
    pub active: bool,
    /// Validity window, Unix millis inclusive.
    pub start_date: i64,
    pub end_date: i64,
    pub description: Option<String>,
    #[serde(default)]
    pub usage_count: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

fn default_true() -> bool {
    true
}

impl Voucher {
    /// Whether `now` falls inside the validity window.
    pub fn is_date_active(&self, now: i64) -> bool {
        self.start_date <= now && now <= self.end_date
    }
}

/// Authoring payload (admin surface / fixtures).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoucherCreate {
    pub code: String,
    pub promo_name: String,
    pub kind: VoucherKind,
    pub value: f64,
    pub max_discount: Option<f64>,
    pub min_order_amount: Option<f64>,
    pub restaurant_id: Option<RestaurantId>,
    pub first_order_only: bool,
    pub active: bool,
    pub start_date: i64,
    pub end_date: i64,
    pub description: Option<String>,
}
