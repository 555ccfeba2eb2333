//! Order lifecycle operations.
//!
//! Creation follows a fixed sequence: validate, snapshot buyer and
//! restaurant, resolve prices, preview the voucher, persist the order, then
//! settle payment. Any failure up to and including settlement rolls the
//! whole creation back; voucher bookkeeping afterwards is best-effort and
//! retried out of band, so a paid order is never lost to it.

use crate::common::error::{CoreError, CoreResult};
use crate::common::money::{round_money, to_decimal, to_f64};
use crate::common::time::now_millis;
use crate::db::models::{
    CreateOrderRequest, Order, OrderDetail, OrderStatus, Payment, PaymentMethod, PaymentStatus,
    RedemptionBacklogEntry, Role, ShipperInfo, ShipperRejection, ShipperStats, User, VoucherId,
};
use crate::db::repository::{
    OrderRepository, RedemptionRepository, RestaurantRepository, UserRepository,
};
use crate::payments::PaymentLedger;
use crate::pricing;
use crate::vouchers::{VoucherEngine, VoucherRef};
use rust_decimal::Decimal;
use validator::Validate;

#[derive(Clone)]
pub struct OrderLifecycle {
    orders: OrderRepository,
    users: UserRepository,
    restaurants: RestaurantRepository,
    vouchers: VoucherEngine,
    redemptions: RedemptionRepository,
    payments: PaymentLedger,
}

impl OrderLifecycle {
    pub fn new(
        orders: OrderRepository,
        users: UserRepository,
        restaurants: RestaurantRepository,
        vouchers: VoucherEngine,
        redemptions: RedemptionRepository,
        payments: PaymentLedger,
    ) -> Self {
        Self {
            orders,
            users,
            restaurants,
            vouchers,
            redemptions,
            payments,
        }
    }

    // ==================== Checkout ====================

    /// Create an order for `buyer_id` and settle its payment.
    ///
    /// The order and its payment either both exist afterwards or neither
    /// does; a debit that cannot be attached to a payment record is
    /// re-credited during rollback.
    pub async fn create_order(
        &self,
        buyer_id: &str,
        req: CreateOrderRequest,
    ) -> CoreResult<OrderDetail> {
        req.validate()
            .map_err(|e| CoreError::validation(e.to_string()))?;
        if !req.shipping_fee.is_finite() || req.shipping_fee < 0.0 {
            return Err(CoreError::validation("Shipping fee must be non-negative"));
        }

        let buyer = self.require_user(buyer_id).await?;
        if buyer.role == Role::Shipper {
            return Err(CoreError::validation("Shippers cannot place orders"));
        }
        if !buyer.active {
            return Err(CoreError::validation("User account is deactivated"));
        }

        let restaurant_id = req.restaurant_id.to_string();
        let restaurant = self
            .restaurants
            .find_by_id(&restaurant_id)
            .await?
            .ok_or_else(|| {
                CoreError::not_found(format!("Restaurant {} not found", restaurant_id))
            })?;

        // Authoritative prices from the menu; any unknown item aborts.
        let priced = pricing::resolve(&restaurant, &req.items)?;

        // Voucher preview happens before anything is persisted, so an
        // ineligible voucher aborts the whole creation.
        let discount = match &req.promo_id {
            Some(promo) => {
                self.vouchers
                    .preview(
                        buyer_id,
                        &restaurant_id,
                        priced.subtotal,
                        req.shipping_fee,
                        VoucherRef::Id(&promo.to_string()),
                    )
                    .await?
                    .discount
            }
            None => 0.0,
        };

        let total = to_decimal(priced.subtotal) + to_decimal(req.shipping_fee)
            - to_decimal(discount);
        let total_amount = to_f64(total.max(Decimal::ZERO));

        let now = now_millis();
        let order = Order {
            id: None,
            user_id: buyer.id.clone().ok_or_else(|| {
                CoreError::internal("Buyer record is missing its id")
            })?,
            restaurant_id: req.restaurant_id.clone(),
            shipper_id: None,
            payment_id: None,
            payment_method: Some(req.payment_method),
            user_fullname: buyer.fullname.clone(),
            user_phone: buyer
                .phone_number
                .clone()
                .unwrap_or_else(|| "Unknown".to_string()),
            restaurant_name: restaurant.restaurant_name.clone(),
            restaurant_address: restaurant
                .address
                .clone()
                .unwrap_or_else(|| "Unknown".to_string()),
            restaurant_hotline: restaurant.hotline.clone(),
            items: priced.items,
            address: req.address.clone(),
            note: req.note.clone(),
            subtotal: priced.subtotal,
            shipping_fee: round_money(req.shipping_fee),
            discount,
            total_amount,
            promo_id: req.promo_id.clone(),
            status: OrderStatus::Pending,
            is_reviewed: false,
            refunded: false,
            refunded_amount: 0.0,
            refund_at: None,
            shipper_rejections: Vec::new(),
            cancelled_by: None,
            cancellation_reason: None,
            picked_at: None,
            created_at: now,
            updated_at: now,
        };

        let created = self.orders.create(order).await?;
        let order_id = created
            .id
            .clone()
            .ok_or_else(|| CoreError::internal("Created order is missing its id"))?
            .to_string();

        // Settle payment; any failure from here rolls the creation back.
        let payment = match self
            .payments
            .create_payment(&order_id, buyer_id, total_amount, req.payment_method)
            .await
        {
            Ok(payment) => payment,
            Err(e) => {
                self.rollback_creation(&order_id, None).await;
                return Err(e);
            }
        };

        let payment_id = match &payment.id {
            Some(id) => id.to_string(),
            None => {
                self.rollback_creation(&order_id, Some(&payment)).await;
                return Err(CoreError::internal("Created payment is missing its id"));
            }
        };

        let attached = match self.orders.set_payment(&order_id, &payment_id).await {
            Ok(Some(order)) => order,
            Ok(None) => {
                self.rollback_creation(&order_id, Some(&payment)).await;
                return Err(CoreError::internal(
                    "Order disappeared while attaching its payment",
                ));
            }
            Err(e) => {
                self.rollback_creation(&order_id, Some(&payment)).await;
                return Err(e.into());
            }
        };

        // Payment is settled; voucher bookkeeping must not undo it.
        if let Some(promo) = &req.promo_id {
            self.redeem_voucher_best_effort(promo, &attached).await;
        }

        tracing::info!(
            order = %order_id,
            buyer = %buyer_id,
            total = total_amount,
            method = ?req.payment_method,
            "Order created"
        );
        Ok(self.detail(attached).await)
    }

    /// Compensating delete of a half-created order (and its payment).
    async fn rollback_creation(&self, order_id: &str, payment: Option<&Payment>) {
        if let Some(payment) = payment {
            self.payments.rollback_created(payment).await;
        }
        if let Err(e) = self.orders.delete(order_id).await {
            tracing::error!(order = %order_id, error = %e, "Failed to delete order during creation rollback");
        } else {
            tracing::warn!(order = %order_id, "Order creation rolled back");
        }
    }

    async fn redeem_voucher_best_effort(&self, promo: &VoucherId, order: &Order) {
        let promo_id = promo.to_string();
        let user_id = order.user_id.to_string();
        let order_rid = match &order.id {
            Some(id) => id.clone(),
            None => return,
        };
        let order_id = order_rid.to_string();

        if let Err(e) = self
            .vouchers
            .mark_used(&promo_id, &user_id, &order_id)
            .await
        {
            tracing::warn!(
                voucher = %promo_id,
                order = %order_id,
                error = %e,
                "Voucher bookkeeping failed, queueing for retry"
            );
            let entry = RedemptionBacklogEntry {
                id: None,
                promo_id: promo.clone(),
                user_id: order.user_id.clone(),
                order_id: order_rid,
                attempts: 1,
                last_error: Some(e.to_string()),
                created_at: now_millis(),
            };
            if let Err(push_err) = self.redemptions.backlog_push(entry).await {
                tracing::error!(
                    voucher = %promo_id,
                    order = %order_id,
                    error = %push_err,
                    "Failed to queue voucher redemption for retry"
                );
            }
        }
    }

    // ==================== Shipper state machine ====================

    /// Shipper accepts a pending order: Pending -> Shipping.
    pub async fn accept_order(&self, order_id: &str, shipper_id: &str) -> CoreResult<OrderDetail> {
        let shipper = self.require_user(shipper_id).await?;
        if shipper.role != Role::Shipper {
            return Err(CoreError::validation("Only shippers can accept orders"));
        }

        match self.orders.try_accept(order_id, shipper_id).await? {
            Some(order) => {
                tracing::info!(order = %order_id, shipper = %shipper_id, "Order accepted");
                Ok(self.detail(order).await)
            }
            None => {
                let current = self.require_order(order_id).await?;
                if current.status.is_terminal() {
                    return Err(CoreError::guard("accept order", current.status));
                }
                // Another shipper accepted it first (or it bounced through
                // a reject cycle between our read and write).
                Err(CoreError::conflict(format!(
                    "Order is already {}",
                    current.status
                )))
            }
        }
    }

    /// Assigned shipper completes delivery: Shipping -> Completed.
    ///
    /// A COD payment still pending is marked paid on completion;
    /// a failure there never blocks the completed delivery.
    pub async fn complete_order(
        &self,
        order_id: &str,
        shipper_id: &str,
    ) -> CoreResult<OrderDetail> {
        match self.orders.try_complete(order_id, shipper_id).await? {
            Some(order) => {
                if order.payment_method == Some(PaymentMethod::Cod) {
                    self.settle_cod_payment(order_id).await;
                }
                tracing::info!(order = %order_id, shipper = %shipper_id, "Order completed");
                Ok(self.detail(order).await)
            }
            None => Err(self.diagnose_shipper_guard(order_id, shipper_id, "complete order").await?),
        }
    }

    async fn settle_cod_payment(&self, order_id: &str) {
        match self.payments.find_by_order(order_id).await {
            Ok(Some(payment)) if payment.status == PaymentStatus::Pending => {
                if let Some(id) = &payment.id {
                    if let Err(e) = self.payments.mark_paid(&id.to_string()).await {
                        tracing::warn!(order = %order_id, error = %e, "Failed to settle COD payment on completion");
                    }
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(order = %order_id, error = %e, "Failed to look up COD payment on completion");
            }
        }
    }

    /// Assigned shipper hands the order back: Shipping -> Pending, with the
    /// rejection recorded so the order stops appearing in their feed.
    pub async fn reject_order(
        &self,
        order_id: &str,
        shipper_id: &str,
        reason: Option<String>,
    ) -> CoreResult<OrderDetail> {
        let rejection = ShipperRejection {
            shipper_id: shipper_id
                .parse()
                .map_err(|_| CoreError::validation(format!("Invalid user ID: {}", shipper_id)))?,
            reason,
            timestamp: now_millis(),
        };

        match self
            .orders
            .try_release(order_id, shipper_id, rejection)
            .await?
        {
            Some(order) => {
                tracing::info!(order = %order_id, shipper = %shipper_id, "Order rejected by shipper");
                Ok(self.detail(order).await)
            }
            None => Err(self.diagnose_shipper_guard(order_id, shipper_id, "reject order").await?),
        }
    }

    /// Why a shipper-guarded transition returned no row.
    async fn diagnose_shipper_guard(
        &self,
        order_id: &str,
        shipper_id: &str,
        action: &str,
    ) -> CoreResult<CoreError> {
        let order = self.require_order(order_id).await?;
        if order.status != OrderStatus::Shipping {
            return Ok(CoreError::guard(action, order.status));
        }
        let assigned = order
            .shipper_id
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_default();
        if assigned != shipper_id {
            return Ok(CoreError::validation(format!(
                "Only the assigned shipper can {}",
                action
            )));
        }
        // Guard failed but the re-read looks fine: we raced a concurrent
        // transition between the two statements.
        Ok(CoreError::conflict(format!(
            "Order changed concurrently while trying to {}",
            action
        )))
    }

    // ==================== Cancellation ====================

    /// Buyer cancels their own pending order.
    pub async fn cancel_order(
        &self,
        order_id: &str,
        user_id: &str,
        reason: Option<String>,
    ) -> CoreResult<OrderDetail> {
        match self
            .orders
            .try_cancel_by_user(order_id, user_id, reason)
            .await?
        {
            Some(order) => {
                self.compensate_cancelled(&order).await?;
                tracing::info!(order = %order_id, user = %user_id, "Order cancelled by buyer");
                let refreshed = self.require_order(order_id).await?;
                Ok(self.detail(refreshed).await)
            }
            None => {
                let order = self.require_order(order_id).await?;
                if order.status != OrderStatus::Pending {
                    return Err(CoreError::guard("cancel order", order.status));
                }
                Err(CoreError::validation(
                    "Only the buyer who placed this order can cancel it",
                ))
            }
        }
    }

    /// Administrator cancels any non-terminal order.
    pub async fn admin_cancel_order(
        &self,
        order_id: &str,
        reason: Option<String>,
    ) -> CoreResult<OrderDetail> {
        match self.orders.try_cancel_by_admin(order_id, reason).await? {
            Some(order) => {
                self.compensate_cancelled(&order).await?;
                tracing::info!(order = %order_id, "Order cancelled by admin");
                let refreshed = self.require_order(order_id).await?;
                Ok(self.detail(refreshed).await)
            }
            None => {
                let order = self.require_order(order_id).await?;
                Err(CoreError::guard("cancel order", order.status))
            }
        }
    }

    /// Compensation after a committed cancel: settle the payment (refund a
    /// paid one, fail a pending one) and reverse the voucher redemption.
    async fn compensate_cancelled(&self, order: &Order) -> CoreResult<()> {
        let order_id = match &order.id {
            Some(id) => id.to_string(),
            None => return Ok(()),
        };

        if let Some(payment) = self.payments.find_by_order(&order_id).await? {
            let payment_id = payment
                .id
                .as_ref()
                .map(|id| id.to_string())
                .unwrap_or_default();
            match payment.status {
                PaymentStatus::Paid => {
                    self.payments.refund(&payment_id).await?;
                }
                PaymentStatus::Pending => {
                    self.payments.mark_failed(&payment_id).await?;
                }
                PaymentStatus::Failed | PaymentStatus::Refunded => {}
            }
        }

        // Voucher reversal is bookkeeping; it never blocks the cancel.
        if let Some(promo) = &order.promo_id {
            let promo_id = promo.to_string();
            let user_id = order.user_id.to_string();
            if let Err(e) = self.vouchers.refund_used(&promo_id, &user_id).await {
                tracing::warn!(
                    voucher = %promo_id,
                    order = %order_id,
                    error = %e,
                    "Failed to reverse voucher redemption on cancel"
                );
            }
        }

        Ok(())
    }

    // ==================== Payment pass-through ====================

    /// Mark the order's payment paid (e.g. out-of-band settlement).
    pub async fn mark_paid(&self, order_id: &str) -> CoreResult<OrderDetail> {
        let order = self.require_order(order_id).await?;
        let payment = self
            .payments
            .find_by_order(order_id)
            .await?
            .ok_or_else(|| {
                CoreError::not_found(format!("No payment found for order {}", order_id))
            })?;
        let payment_id = payment
            .id
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_default();
        self.payments.mark_paid(&payment_id).await?;
        Ok(self.detail(order).await)
    }

    // ==================== Queries ====================

    /// Full order view, shipper contact hydrated best-effort.
    pub async fn get_order(&self, order_id: &str) -> CoreResult<OrderDetail> {
        let order = self.require_order(order_id).await?;
        Ok(self.detail(order).await)
    }

    /// A buyer's orders, optionally filtered by status, newest first.
    pub async fn get_user_orders(
        &self,
        user_id: &str,
        status: Option<OrderStatus>,
    ) -> CoreResult<Vec<Order>> {
        Ok(self.orders.find_by_user(user_id, status).await?)
    }

    /// Orders for a restaurant, newest first.
    pub async fn get_restaurant_orders(&self, restaurant_id: &str) -> CoreResult<Vec<Order>> {
        Ok(self.orders.find_by_restaurant(restaurant_id, None).await?)
    }

    /// Pending orders a shipper may pick up: unassigned, and never rejected
    /// by this shipper.
    pub async fn get_pending_orders_for_shipper(
        &self,
        shipper_id: &str,
    ) -> CoreResult<Vec<Order>> {
        Ok(self.orders.find_pending_visible_to(shipper_id).await?)
    }

    /// A shipper's own orders, optionally filtered by status.
    pub async fn get_shipper_orders(
        &self,
        shipper_id: &str,
        status: Option<OrderStatus>,
    ) -> CoreResult<Vec<Order>> {
        Ok(self.orders.find_by_shipper(shipper_id, status).await?)
    }

    /// Shipper view of one order; assigned orders are visible only to their
    /// shipper.
    pub async fn get_shipper_order_detail(
        &self,
        order_id: &str,
        shipper_id: &str,
    ) -> CoreResult<OrderDetail> {
        let order = self.require_order(order_id).await?;
        if let Some(assigned) = &order.shipper_id {
            if assigned.to_string() != shipper_id {
                return Err(CoreError::validation(
                    "You are not allowed to view this order",
                ));
            }
        }
        Ok(self.detail(order).await)
    }

    /// All orders (admin), optionally filtered by status.
    pub async fn get_all_orders(&self, status: Option<OrderStatus>) -> CoreResult<Vec<Order>> {
        Ok(self.orders.find_all(status).await?)
    }

    /// Delivery counts and earnings for a shipper.
    pub async fn get_shipper_stats(&self, shipper_id: &str) -> CoreResult<ShipperStats> {
        Ok(self.orders.stats_for_shipper(shipper_id).await?)
    }

    // ==================== Helpers ====================

    async fn require_user(&self, user_id: &str) -> CoreResult<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("User {} not found", user_id)))
    }

    async fn require_order(&self, order_id: &str) -> CoreResult<Order> {
        self.orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("Order {} not found", order_id)))
    }

    async fn detail(&self, order: Order) -> OrderDetail {
        let shipper = match &order.shipper_id {
            Some(shipper_id) => {
                let id = shipper_id.to_string();
                match self.users.find_by_id(&id).await {
                    Ok(Some(user)) => Some(ShipperInfo {
                        shipper_id: shipper_id.clone(),
                        fullname: user.fullname,
                        phone_number: user.phone_number,
                    }),
                    Ok(None) => None,
                    Err(e) => {
                        // Shipper contact is decoration; never fail the view.
                        tracing::warn!(shipper = %id, error = %e, "Failed to hydrate shipper info");
                        None
                    }
                }
            }
            None => None,
        };
        OrderDetail { order, shipper }
    }
}
