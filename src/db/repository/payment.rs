//! Payment Repository
//!
//! Status transitions carry their expected source status in the `WHERE`
//! clause, which is what makes the Pending -> {Paid, Failed} / Paid ->
//! Refunded DAG hold under concurrent writers.

use super::{parse_record_id, BaseRepository, RepoError, RepoResult};
use crate::common::time::now_millis;
use crate::db::models::{Payment, PaymentStatus};
use surrealdb::engine::local::Db;
use surrealdb::Surreal;

#[derive(Clone)]
pub struct PaymentRepository {
    base: BaseRepository,
}

impl PaymentRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Persist a new payment record (id engine-assigned).
    pub async fn create(&self, payment: Payment) -> RepoResult<Payment> {
        let created: Option<Payment> = self.base.db().create("payments").content(payment).await?;
        created.ok_or_else(|| RepoError::Database("Failed to create payment".to_string()))
    }

    /// Find a payment by id
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Payment>> {
        let thing = parse_record_id(id, "payment")?;
        let payment: Option<Payment> = self.base.db().select(thing).await?;
        Ok(payment)
    }

    /// The payment tied to an order (one per order by construction).
    pub async fn find_by_order(&self, order_id: &str) -> RepoResult<Option<Payment>> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM payments WHERE order_id = $order LIMIT 1")
            .bind(("order", order_id.to_string()))
            .await?;
        let payments: Vec<Payment> = result.take(0)?;
        Ok(payments.into_iter().next())
    }

    /// Payments made by a user, optionally filtered by status, newest first.
    pub async fn find_by_user(
        &self,
        user_id: &str,
        status: Option<PaymentStatus>,
    ) -> RepoResult<Vec<Payment>> {
        let mut sql = String::from("SELECT * FROM payments WHERE user_id = $user");
        if status.is_some() {
            sql.push_str(" AND status = $status");
        }
        sql.push_str(" ORDER BY created_at DESC");

        let mut query = self.base.db().query(sql).bind(("user", user_id.to_string()));
        if let Some(status) = status {
            query = query.bind(("status", status.as_str().to_string()));
        }
        let payments: Vec<Payment> = query.await?.take(0)?;
        Ok(payments)
    }

    /// Guarded status transition; `None` when the payment was not in `from`.
    pub async fn try_transition(
        &self,
        id: &str,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> RepoResult<Option<Payment>> {
        let thing = parse_record_id(id, "payment")?;
        let mut result = self
            .base
            .db()
            .query(
                r#"UPDATE $payment SET
                    status = $to,
                    updated_at = $now
                WHERE status = $from
                RETURN AFTER"#,
            )
            .bind(("payment", thing))
            .bind(("from", from.as_str().to_string()))
            .bind(("to", to.as_str().to_string()))
            .bind(("now", now_millis()))
            .await?;
        Ok(result.take::<Option<Payment>>(0)?)
    }

    /// Hard delete; only used as creation-rollback compensation.
    pub async fn delete(&self, id: &str) -> RepoResult<()> {
        let thing = parse_record_id(id, "payment")?;
        let _: Option<Payment> = self.base.db().delete(thing).await?;
        Ok(())
    }
}
