//! Order Repository
//!
//! Every state transition is a single `UPDATE ... WHERE <guard> RETURN AFTER`
//! statement: the guard is evaluated at write time by the engine, so two
//! racing actors get exactly one winner. A `None` return means the guard
//! failed; diagnosing why (missing order, wrong state, wrong actor) is the
//! service layer's job.

use super::{parse_record_id, BaseRepository, RepoError, RepoResult};
use crate::common::time::now_millis;
use crate::db::models::{CancelActor, Order, OrderStatus, ShipperRejection, ShipperStats};
use serde::Deserialize;
use surrealdb::engine::local::Db;
use surrealdb::Surreal;

#[derive(Clone)]
pub struct OrderRepository {
    base: BaseRepository,
}

#[derive(Debug, Deserialize, Default)]
struct CountRow {
    #[serde(default)]
    count: i64,
}

#[derive(Debug, Deserialize, Default)]
struct RevenueRow {
    #[serde(default)]
    revenue: f64,
}

impl OrderRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Persist a new order document (status Pending, id engine-assigned).
    pub async fn create(&self, order: Order) -> RepoResult<Order> {
        let created: Option<Order> = self.base.db().create("orders").content(order).await?;
        created.ok_or_else(|| RepoError::Database("Failed to create order".to_string()))
    }

    /// Find an order by id
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Order>> {
        let thing = parse_record_id(id, "order")?;
        let order: Option<Order> = self.base.db().select(thing).await?;
        Ok(order)
    }

    /// Hard delete; only used as creation-rollback compensation.
    pub async fn delete(&self, id: &str) -> RepoResult<()> {
        let thing = parse_record_id(id, "order")?;
        let _: Option<Order> = self.base.db().delete(thing).await?;
        Ok(())
    }

    /// Attach the payment created alongside the order.
    pub async fn set_payment(&self, id: &str, payment_id: &str) -> RepoResult<Option<Order>> {
        let thing = parse_record_id(id, "order")?;
        let mut result = self
            .base
            .db()
            .query("UPDATE $order SET payment_id = $payment, updated_at = $now RETURN AFTER")
            .bind(("order", thing))
            .bind(("payment", payment_id.to_string()))
            .bind(("now", now_millis()))
            .await?;
        Ok(result.take::<Option<Order>>(0)?)
    }

    /// Pending -> Shipping, guarded on the order still being Pending.
    pub async fn try_accept(&self, id: &str, shipper_id: &str) -> RepoResult<Option<Order>> {
        let thing = parse_record_id(id, "order")?;
        let mut result = self
            .base
            .db()
            .query(
                r#"UPDATE $order SET
                    status = 'Shipping',
                    shipper_id = $shipper,
                    picked_at = $now,
                    updated_at = $now
                WHERE status = 'Pending'
                RETURN AFTER"#,
            )
            .bind(("order", thing))
            .bind(("shipper", shipper_id.to_string()))
            .bind(("now", now_millis()))
            .await?;
        Ok(result.take::<Option<Order>>(0)?)
    }

    /// Shipping -> Pending (shipper reject), appending the rejection entry.
    pub async fn try_release(
        &self,
        id: &str,
        shipper_id: &str,
        rejection: ShipperRejection,
    ) -> RepoResult<Option<Order>> {
        let thing = parse_record_id(id, "order")?;
        let mut result = self
            .base
            .db()
            .query(
                r#"UPDATE $order SET
                    status = 'Pending',
                    shipper_id = NONE,
                    picked_at = NONE,
                    shipper_rejections += $rejection,
                    updated_at = $now
                WHERE status = 'Shipping' AND shipper_id = $shipper
                RETURN AFTER"#,
            )
            .bind(("order", thing))
            .bind(("shipper", shipper_id.to_string()))
            .bind(("rejection", rejection))
            .bind(("now", now_millis()))
            .await?;
        Ok(result.take::<Option<Order>>(0)?)
    }

    /// Shipping -> Completed, guarded on the requester being the assignee.
    pub async fn try_complete(&self, id: &str, shipper_id: &str) -> RepoResult<Option<Order>> {
        let thing = parse_record_id(id, "order")?;
        let mut result = self
            .base
            .db()
            .query(
                r#"UPDATE $order SET
                    status = 'Completed',
                    updated_at = $now
                WHERE status = 'Shipping' AND shipper_id = $shipper
                RETURN AFTER"#,
            )
            .bind(("order", thing))
            .bind(("shipper", shipper_id.to_string()))
            .bind(("now", now_millis()))
            .await?;
        Ok(result.take::<Option<Order>>(0)?)
    }

    /// Pending -> Cancelled by the owning buyer.
    pub async fn try_cancel_by_user(
        &self,
        id: &str,
        user_id: &str,
        reason: Option<String>,
    ) -> RepoResult<Option<Order>> {
        let thing = parse_record_id(id, "order")?;
        let mut result = self
            .base
            .db()
            .query(
                r#"UPDATE $order SET
                    status = 'Cancelled',
                    cancelled_by = $actor,
                    cancellation_reason = $reason,
                    updated_at = $now
                WHERE status = 'Pending' AND user_id = $user
                RETURN AFTER"#,
            )
            .bind(("order", thing))
            .bind(("user", user_id.to_string()))
            .bind(("actor", CancelActor::User))
            .bind(("reason", reason))
            .bind(("now", now_millis()))
            .await?;
        Ok(result.take::<Option<Order>>(0)?)
    }

    /// Pending/Shipping -> Cancelled by an administrator.
    pub async fn try_cancel_by_admin(
        &self,
        id: &str,
        reason: Option<String>,
    ) -> RepoResult<Option<Order>> {
        let thing = parse_record_id(id, "order")?;
        let mut result = self
            .base
            .db()
            .query(
                r#"UPDATE $order SET
                    status = 'Cancelled',
                    cancelled_by = $actor,
                    cancellation_reason = $reason,
                    updated_at = $now
                WHERE status = 'Pending' OR status = 'Shipping'
                RETURN AFTER"#,
            )
            .bind(("order", thing))
            .bind(("actor", CancelActor::Admin))
            .bind(("reason", reason))
            .bind(("now", now_millis()))
            .await?;
        Ok(result.take::<Option<Order>>(0)?)
    }

    /// Record a completed refund on the order document.
    pub async fn mark_refunded(&self, id: &str, amount: f64) -> RepoResult<Option<Order>> {
        let thing = parse_record_id(id, "order")?;
        let mut result = self
            .base
            .db()
            .query(
                r#"UPDATE $order SET
                    refunded = true,
                    refunded_amount = $amount,
                    refund_at = $now,
                    updated_at = $now
                RETURN AFTER"#,
            )
            .bind(("order", thing))
            .bind(("amount", amount))
            .bind(("now", now_millis()))
            .await?;
        Ok(result.take::<Option<Order>>(0)?)
    }

    /// Orders placed by a user, newest first.
    pub async fn find_by_user(
        &self,
        user_id: &str,
        status: Option<OrderStatus>,
    ) -> RepoResult<Vec<Order>> {
        self.find_filtered("user_id = $key", user_id, status).await
    }

    /// Orders for a restaurant, newest first.
    pub async fn find_by_restaurant(
        &self,
        restaurant_id: &str,
        status: Option<OrderStatus>,
    ) -> RepoResult<Vec<Order>> {
        self.find_filtered("restaurant_id = $key", restaurant_id, status)
            .await
    }

    /// Orders assigned to a shipper, newest first.
    pub async fn find_by_shipper(
        &self,
        shipper_id: &str,
        status: Option<OrderStatus>,
    ) -> RepoResult<Vec<Order>> {
        self.find_filtered("shipper_id = $key", shipper_id, status)
            .await
    }

    async fn find_filtered(
        &self,
        key_clause: &str,
        key: &str,
        status: Option<OrderStatus>,
    ) -> RepoResult<Vec<Order>> {
        let mut sql = format!("SELECT * FROM orders WHERE {}", key_clause);
        if status.is_some() {
            sql.push_str(" AND status = $status");
        }
        sql.push_str(" ORDER BY created_at DESC");

        let mut query = self.base.db().query(sql).bind(("key", key.to_string()));
        if let Some(status) = status {
            query = query.bind(("status", status.as_str().to_string()));
        }
        let orders: Vec<Order> = query.await?.take(0)?;
        Ok(orders)
    }

    /// All orders, optionally by status, newest first (admin views).
    pub async fn find_all(&self, status: Option<OrderStatus>) -> RepoResult<Vec<Order>> {
        let mut sql = String::from("SELECT * FROM orders");
        if status.is_some() {
            sql.push_str(" WHERE status = $status");
        }
        sql.push_str(" ORDER BY created_at DESC");

        let mut query = self.base.db().query(sql);
        if let Some(status) = status {
            query = query.bind(("status", status.as_str().to_string()));
        }
        let orders: Vec<Order> = query.await?.take(0)?;
        Ok(orders)
    }

    /// Pending, unassigned orders this shipper has never rejected.
    pub async fn find_pending_visible_to(&self, shipper_id: &str) -> RepoResult<Vec<Order>> {
        let orders: Vec<Order> = self
            .base
            .db()
            .query(
                r#"SELECT * FROM orders
                WHERE status = 'Pending'
                  AND shipper_id = NONE
                  AND $shipper NOTINSIDE shipper_rejections.shipper_id
                ORDER BY created_at DESC"#,
            )
            .bind(("shipper", shipper_id.to_string()))
            .await?
            .take(0)?;
        Ok(orders)
    }

    /// Per-status counts and completed-order earnings for one shipper.
    pub async fn stats_for_shipper(&self, shipper_id: &str) -> RepoResult<ShipperStats> {
        let mut result = self
            .base
            .db()
            .query("SELECT count() FROM orders WHERE shipper_id = $shipper GROUP ALL")
            .query("SELECT count() FROM orders WHERE shipper_id = $shipper AND status = 'Shipping' GROUP ALL")
            .query("SELECT count() FROM orders WHERE shipper_id = $shipper AND status = 'Completed' GROUP ALL")
            .query("SELECT count() FROM orders WHERE shipper_id = $shipper AND status = 'Cancelled' GROUP ALL")
            .query("SELECT math::sum(shipping_fee) AS revenue FROM orders WHERE shipper_id = $shipper AND status = 'Completed' GROUP ALL")
            .bind(("shipper", shipper_id.to_string()))
            .await?;

        let total: Option<CountRow> = result.take(0)?;
        let shipping: Option<CountRow> = result.take(1)?;
        let completed: Option<CountRow> = result.take(2)?;
        let cancelled: Option<CountRow> = result.take(3)?;
        let revenue: Option<RevenueRow> = result.take(4)?;

        Ok(ShipperStats {
            total_orders: total.unwrap_or_default().count,
            shipping_orders: shipping.unwrap_or_default().count,
            completed_orders: completed.unwrap_or_default().count,
            cancelled_orders: cancelled.unwrap_or_default().count,
            total_revenue: revenue.unwrap_or_default().revenue,
        })
    }
}
