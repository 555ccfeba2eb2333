//! Voucher validation and discount computation.
//!
//! Validation runs the six eligibility checks in a fixed order and fails
//! fast with the specific reason. Redemption state lives in the ledger
//! table; `mark_used` / `refund_used` are idempotent and never double count.

use crate::common::error::{CoreError, CoreResult};
use crate::common::money::{to_decimal, to_f64};
use crate::common::time::now_millis;
use crate::db::models::{Redemption, Voucher, VoucherKind};
use crate::db::repository::redemption::InsertOutcome;
use crate::db::repository::{RedemptionRepository, VoucherRepository};
use rust_decimal::Decimal;

/// Lookup key for a voucher: by id or by the user-typed code.
#[derive(Debug, Clone, Copy)]
pub enum VoucherRef<'a> {
    Id(&'a str),
    Code(&'a str),
}

/// What a voucher would do to an order, before committing anything.
#[derive(Debug, Clone)]
pub struct DiscountPreview {
    pub voucher: Voucher,
    pub discount: f64,
    pub subtotal: f64,
    pub shipping_fee: f64,
    pub total_after_discount: f64,
}

#[derive(Clone)]
pub struct VoucherEngine {
    vouchers: VoucherRepository,
    redemptions: RedemptionRepository,
}

impl VoucherEngine {
    pub fn new(vouchers: VoucherRepository, redemptions: RedemptionRepository) -> Self {
        Self {
            vouchers,
            redemptions,
        }
    }

    pub(crate) async fn find(&self, voucher: VoucherRef<'_>) -> CoreResult<Voucher> {
        let found = match voucher {
            VoucherRef::Id(id) => self.vouchers.find_by_id(id).await?,
            VoucherRef::Code(code) => self.vouchers.find_by_code(code).await?,
        };
        found.ok_or_else(|| CoreError::not_found("Voucher not found"))
    }

    /// Validate a voucher against the order context and compute the
    /// discount. Nothing is persisted.
    pub async fn preview(
        &self,
        user_id: &str,
        restaurant_id: &str,
        subtotal: f64,
        shipping_fee: f64,
        voucher: VoucherRef<'_>,
    ) -> CoreResult<DiscountPreview> {
        let voucher = self.find(voucher).await?;
        self.validate(&voucher, user_id, restaurant_id, subtotal, now_millis())
            .await?;

        let discount = calculate_discount(&voucher, subtotal, shipping_fee);
        let total = to_decimal(subtotal) + to_decimal(shipping_fee) - to_decimal(discount);
        Ok(DiscountPreview {
            voucher,
            discount,
            subtotal,
            shipping_fee,
            total_after_discount: to_f64(total.max(Decimal::ZERO)),
        })
    }

    /// The six eligibility checks, in order, each independently fatal.
    async fn validate(
        &self,
        voucher: &Voucher,
        user_id: &str,
        restaurant_id: &str,
        subtotal: f64,
        now: i64,
    ) -> CoreResult<()> {
        if !voucher.active {
            return Err(CoreError::voucher("Voucher is not active"));
        }
        if !voucher.is_date_active(now) {
            return Err(CoreError::voucher("Voucher is outside its validity window"));
        }
        if let Some(scope) = &voucher.restaurant_id {
            if scope.to_string() != restaurant_id {
                return Err(CoreError::voucher(
                    "Voucher does not apply to this restaurant",
                ));
            }
        }
        if let Some(min) = voucher.min_order_amount {
            if subtotal < min {
                return Err(CoreError::voucher(
                    "Order subtotal is below the voucher minimum",
                ));
            }
        }
        if voucher.first_order_only
            && self.redemptions.has_first_order_redemption(user_id).await?
        {
            return Err(CoreError::voucher(
                "Voucher is restricted to a user's first order",
            ));
        }
        if self
            .redemptions
            .exists(&voucher_id(voucher)?, user_id)
            .await?
        {
            return Err(CoreError::voucher("Voucher was already used by this user"));
        }
        Ok(())
    }

    /// Record a redemption after the order's payment committed. Idempotent:
    /// a concurrent or repeated call lands on the unique index and is
    /// treated as success without touching the usage counter again.
    pub async fn mark_used(&self, promo_id: &str, user_id: &str, order_id: &str) -> CoreResult<()> {
        let voucher = self.find(VoucherRef::Id(promo_id)).await?;
        let promo = voucher
            .id
            .clone()
            .ok_or_else(|| CoreError::internal("Voucher record is missing its id"))?;
        let outcome = self
            .redemptions
            .try_insert(Redemption {
                id: None,
                promo_id: promo,
                user_id: user_id
                    .parse()
                    .map_err(|_| CoreError::validation(format!("Invalid user ID: {}", user_id)))?,
                order_id: order_id
                    .parse()
                    .map_err(|_| CoreError::validation(format!("Invalid order ID: {}", order_id)))?,
                first_order_only: voucher.first_order_only,
                redeemed_at: now_millis(),
            })
            .await?;

        if outcome == InsertOutcome::Inserted {
            self.vouchers.adjust_usage_count(promo_id, 1).await?;
            tracing::debug!(voucher = %promo_id, user = %user_id, order = %order_id, "Voucher redeemed");
        }
        Ok(())
    }

    /// Reverse a redemption when the order is cancelled. Idempotent: the
    /// usage counter only moves when a ledger row was actually removed.
    pub async fn refund_used(&self, promo_id: &str, user_id: &str) -> CoreResult<()> {
        if self.redemptions.remove(promo_id, user_id).await? {
            self.vouchers.adjust_usage_count(promo_id, -1).await?;
            tracing::debug!(voucher = %promo_id, user = %user_id, "Voucher redemption reversed");
        }
        Ok(())
    }

    /// Active, in-window, in-scope vouchers the user has not redeemed yet.
    pub async fn available_for(
        &self,
        user_id: &str,
        restaurant_id: Option<&str>,
    ) -> CoreResult<Vec<Voucher>> {
        let active = self
            .vouchers
            .list_active(now_millis(), restaurant_id)
            .await?;
        let redeemed: std::collections::HashSet<String> = self
            .redemptions
            .promo_ids_of(user_id)
            .await?
            .into_iter()
            .collect();
        Ok(active
            .into_iter()
            .filter(|v| {
                v.id.as_ref()
                    .map(|id| !redeemed.contains(&id.to_string()))
                    .unwrap_or(false)
            })
            .collect())
    }

    /// Active vouchers regardless of user (admin view).
    pub async fn all_available(&self, restaurant_id: Option<&str>) -> CoreResult<Vec<Voucher>> {
        Ok(self
            .vouchers
            .list_active(now_millis(), restaurant_id)
            .await?)
    }
}

fn voucher_id(voucher: &Voucher) -> CoreResult<String> {
    voucher
        .id
        .as_ref()
        .map(|id| id.to_string())
        .ok_or_else(|| CoreError::internal("Voucher record is missing its id"))
}

/// Discount for a validated voucher. Always >= 0 and never more than
/// `subtotal + shipping_fee`.
pub fn calculate_discount(voucher: &Voucher, subtotal: f64, shipping_fee: f64) -> f64 {
    let subtotal_d = to_decimal(subtotal);
    let fee_d = to_decimal(shipping_fee);
    let value = to_decimal(voucher.value);

    let discount = match voucher.kind {
        VoucherKind::Percent => {
            let mut d = subtotal_d * value / Decimal::from(100);
            if let Some(cap) = voucher.max_discount {
                d = d.min(to_decimal(cap));
            }
            d
        }
        VoucherKind::Fixed => value.min(subtotal_d),
        VoucherKind::Freeship => {
            let cap = voucher.max_discount.map(to_decimal).unwrap_or(fee_d);
            fee_d.min(cap)
        }
    };

    to_f64(discount.clamp(Decimal::ZERO, subtotal_d + fee_d))
}
