//! Order Model
//!
//! The central document of the checkout engine. Buyer and restaurant contact
//! fields are denormalized at creation time so shippers keep seeing the
//! data the order was placed with, regardless of later profile edits.

use super::payment::{PaymentId, PaymentMethod};
use super::restaurant::RestaurantId;
use super::serde_helpers;
use super::user::UserId;
use super::voucher::VoucherId;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;
use validator::Validate;

/// Order ID type
pub type OrderId = RecordId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Shipping,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Shipping => "Shipping",
            OrderStatus::Completed => "Completed",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// Completed and Cancelled admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OrderItemStatus {
    #[default]
    Active,
    Cancelled,
}

/// One priced line of an order. `unit_price` comes from the restaurant menu
/// at creation time, never from the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub food_name: String,
    pub quantity: i32,
    pub unit_price: f64,
    pub subtotal: f64,
    #[serde(default)]
    pub status: OrderItemStatus,
}

/// One rejection by a shipper; the list persists for the order's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipperRejection {
    #[serde(with = "serde_helpers::record_id")]
    pub shipper_id: UserId,
    pub reason: Option<String>,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CancelActor {
    User,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "serde_helpers::option_record_id"
    )]
    pub id: Option<OrderId>,
    #[serde(with = "serde_helpers::record_id")]
    pub user_id: UserId,
    #[serde(with = "serde_helpers::record_id")]
    pub restaurant_id: RestaurantId,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "serde_helpers::option_record_id"
    )]
    pub shipper_id: Option<UserId>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "serde_helpers::option_record_id"
    )]
    pub payment_id: Option<PaymentId>,
    pub payment_method: Option<PaymentMethod>,

    // Snapshot: buyer contact for the shipper.
    pub user_fullname: String,
    pub user_phone: String,

    // Snapshot: pickup point for the shipper.
    pub restaurant_name: String,
    pub restaurant_address: String,
    pub restaurant_hotline: Option<String>,

    pub items: Vec<OrderItem>,
    pub address: String,
    pub note: Option<String>,

    pub subtotal: f64,
    pub shipping_fee: f64,
    pub discount: f64,
    /// Always `subtotal + shipping_fee - discount`, recomputed server-side.
    pub total_amount: f64,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "serde_helpers::option_record_id"
    )]
    pub promo_id: Option<VoucherId>,

    pub status: OrderStatus,
    #[serde(default, deserialize_with = "serde_helpers::bool_false")]
    pub is_reviewed: bool,
    #[serde(default, deserialize_with = "serde_helpers::bool_false")]
    pub refunded: bool,
    #[serde(default)]
    pub refunded_amount: f64,
    pub refund_at: Option<i64>,

    #[serde(default)]
    pub shipper_rejections: Vec<ShipperRejection>,

    pub cancelled_by: Option<CancelActor>,
    pub cancellation_reason: Option<String>,

    pub picked_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

// =============================================================================
// Request / response payloads
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OrderItemRequest {
    #[validate(length(min = 1, message = "food name must not be empty"))]
    pub food_name: String,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: i32,
}

/// Checkout payload. Prices and totals are intentionally absent: the server
/// resolves them from the menu.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[serde(with = "serde_helpers::record_id")]
    pub restaurant_id: RestaurantId,
    #[validate(
        length(min = 1, message = "order must contain at least one item"),
        nested
    )]
    pub items: Vec<OrderItemRequest>,
    #[validate(length(min = 1, message = "delivery address must not be empty"))]
    pub address: String,
    pub note: Option<String>,
    pub shipping_fee: f64,
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub promo_id: Option<VoucherId>,
    pub payment_method: PaymentMethod,
}

/// Assigned-shipper contact, hydrated on demand for full order views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipperInfo {
    #[serde(with = "serde_helpers::record_id")]
    pub shipper_id: UserId,
    pub fullname: String,
    pub phone_number: Option<String>,
}

/// Full order view returned by the lifecycle engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub shipper: Option<ShipperInfo>,
}

/// Per-status counts and completed-order earnings for one shipper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipperStats {
    pub total_orders: i64,
    pub shipping_orders: i64,
    pub completed_orders: i64,
    pub cancelled_orders: i64,
    pub total_revenue: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_as_plain_variant_names() {
        assert_eq!(
            serde_json::to_value(OrderStatus::Pending).unwrap(),
            serde_json::json!("Pending")
        );
        assert_eq!(
            serde_json::to_value(CancelActor::Admin).unwrap(),
            serde_json::json!("admin")
        );
    }

    #[test]
    fn rejection_entries_store_ids_as_strings() {
        let rejection = ShipperRejection {
            shipper_id: "users:shipper1".parse().unwrap(),
            reason: Some("too far".to_string()),
            timestamp: 1_700_000_000_000,
        };
        let value = serde_json::to_value(&rejection).unwrap();
        assert_eq!(value["shipper_id"], "users:shipper1");
        assert_eq!(value["reason"], "too far");
    }

    #[test]
    fn create_request_validation_catches_bad_input() {
        use validator::Validate;

        let req = CreateOrderRequest {
            restaurant_id: "restaurants:r1".parse().unwrap(),
            items: vec![],
            address: "12 Hang Bai".to_string(),
            note: None,
            shipping_fee: 15_000.0,
            promo_id: None,
            payment_method: PaymentMethod::Cod,
        };
        assert!(req.validate().is_err());

        let req = CreateOrderRequest {
            items: vec![OrderItemRequest {
                food_name: "Pho Ga".to_string(),
                quantity: 0,
            }],
            ..req
        };
        assert!(req.validate().is_err());

        let req = CreateOrderRequest {
            items: vec![OrderItemRequest {
                food_name: "Pho Ga".to_string(),
                quantity: 1,
            }],
            ..req
        };
        assert!(req.validate().is_ok());
    }
}
