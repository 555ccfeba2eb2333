//! Payment creation, status transitions and refunds.
//!
//! Settlement is transactional with the balance account: a balance payment
//! is only recorded `Paid` after the debit committed, and a refund is only
//! recorded `Refunded` after the credit committed. A debit left behind by a
//! failed record insert is compensated before the error propagates.

use crate::accounts::BalanceService;
use crate::common::error::{CoreError, CoreResult};
use crate::common::time::now_millis;
use crate::db::models::{Payment, PaymentMethod, PaymentStatus};
use crate::db::repository::{OrderRepository, PaymentRepository};

#[derive(Clone)]
pub struct PaymentLedger {
    payments: PaymentRepository,
    orders: OrderRepository,
    balances: BalanceService,
}

impl PaymentLedger {
    pub fn new(
        payments: PaymentRepository,
        orders: OrderRepository,
        balances: BalanceService,
    ) -> Self {
        Self {
            payments,
            orders,
            balances,
        }
    }

    /// Create the payment for a freshly created order.
    ///
    /// Balance payments debit the payer first; `InsufficientFunds` (or any
    /// debit failure) propagates to the caller, which rolls the order back.
    pub async fn create_payment(
        &self,
        order_id: &str,
        user_id: &str,
        amount: f64,
        method: PaymentMethod,
    ) -> CoreResult<Payment> {
        let order_rid = order_id
            .parse()
            .map_err(|_| CoreError::validation(format!("Invalid order ID: {}", order_id)))?;
        let user_rid = user_id
            .parse()
            .map_err(|_| CoreError::validation(format!("Invalid user ID: {}", user_id)))?;

        let status = match method {
            PaymentMethod::Balance => {
                self.balances.debit(user_id, amount).await?;
                PaymentStatus::Paid
            }
            PaymentMethod::Cod => PaymentStatus::Pending,
        };

        let now = now_millis();
        let payment = Payment {
            id: None,
            order_id: order_rid,
            user_id: user_rid,
            amount,
            method,
            status,
            created_at: now,
            updated_at: now,
        };

        match self.payments.create(payment).await {
            Ok(created) => Ok(created),
            Err(e) => {
                // The debit already committed; give the money back before
                // reporting the failure.
                if status == PaymentStatus::Paid {
                    if let Err(credit_err) = self.balances.credit(user_id, amount).await {
                        tracing::error!(
                            user = %user_id,
                            amount,
                            error = %credit_err,
                            "Failed to compensate debit after payment insert failure"
                        );
                    }
                }
                Err(e.into())
            }
        }
    }

    /// Mark a payment paid. Idempotent when already Paid; otherwise only
    /// valid from Pending.
    pub async fn mark_paid(&self, payment_id: &str) -> CoreResult<Payment> {
        let payment = self.require(payment_id).await?;
        if payment.status == PaymentStatus::Paid {
            return Ok(payment);
        }
        self.payments
            .try_transition(payment_id, PaymentStatus::Pending, PaymentStatus::Paid)
            .await?
            .ok_or_else(|| CoreError::guard("mark payment paid", payment.status))
    }

    /// Mark a pending payment failed.
    pub async fn mark_failed(&self, payment_id: &str) -> CoreResult<Payment> {
        let payment = self.require(payment_id).await?;
        self.payments
            .try_transition(payment_id, PaymentStatus::Pending, PaymentStatus::Failed)
            .await?
            .ok_or_else(|| CoreError::guard("mark payment failed", payment.status))
    }

    /// Refund a paid payment: credit the payer the exact original amount,
    /// record the refund on the order, then flip the status. Calling refund
    /// on an already refunded payment is a no-op success.
    pub async fn refund(&self, payment_id: &str) -> CoreResult<Payment> {
        let payment = self.require(payment_id).await?;
        match payment.status {
            PaymentStatus::Refunded => return Ok(payment),
            PaymentStatus::Paid => {}
            other => return Err(CoreError::guard("refund payment", other)),
        }

        let user_id = payment.user_id.to_string();
        let order_id = payment.order_id.to_string();

        self.balances.credit(&user_id, payment.amount).await?;

        if let Err(e) = self.orders.mark_refunded(&order_id, payment.amount).await {
            tracing::error!(order = %order_id, error = %e, "Failed to flag order as refunded");
        }

        match self
            .payments
            .try_transition(payment_id, PaymentStatus::Paid, PaymentStatus::Refunded)
            .await?
        {
            Some(updated) => {
                tracing::info!(payment = %payment_id, amount = payment.amount, "Payment refunded");
                Ok(updated)
            }
            // Lost a race against another refund of the same payment; the
            // end state is what the caller asked for.
            None => self.require(payment_id).await,
        }
    }

    /// The payment tied to an order.
    pub async fn find_by_order(&self, order_id: &str) -> CoreResult<Option<Payment>> {
        Ok(self.payments.find_by_order(order_id).await?)
    }

    /// Payment detail by id.
    pub async fn get_payment(&self, payment_id: &str) -> CoreResult<Payment> {
        self.require(payment_id).await
    }

    /// A user's payment history, optionally filtered by status.
    pub async fn payments_of_user(
        &self,
        user_id: &str,
        status: Option<PaymentStatus>,
    ) -> CoreResult<Vec<Payment>> {
        Ok(self.payments.find_by_user(user_id, status).await?)
    }

    /// Delete a payment record (creation rollback only).
    pub(crate) async fn delete(&self, payment_id: &str) -> CoreResult<()> {
        Ok(self.payments.delete(payment_id).await?)
    }

    /// Undo a payment created moments ago, as part of order-creation
    /// rollback: give a committed balance debit back, then drop the record.
    pub(crate) async fn rollback_created(&self, payment: &Payment) {
        if payment.method == PaymentMethod::Balance && payment.status == PaymentStatus::Paid {
            let user_id = payment.user_id.to_string();
            if let Err(e) = self.balances.credit(&user_id, payment.amount).await {
                tracing::error!(
                    user = %user_id,
                    amount = payment.amount,
                    error = %e,
                    "Failed to re-credit balance during creation rollback"
                );
            }
        }
        if let Some(id) = &payment.id {
            let id = id.to_string();
            if let Err(e) = self.delete(&id).await {
                tracing::error!(payment = %id, error = %e, "Failed to delete payment during creation rollback");
            }
        }
    }

    async fn require(&self, payment_id: &str) -> CoreResult<Payment> {
        self.payments
            .find_by_id(payment_id)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("Payment {} not found", payment_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_memory;
    use crate::db::models::{Role, UserCreate};
    use crate::db::repository::UserRepository;

    struct Fixture {
        ledger: PaymentLedger,
        users: UserRepository,
        user_id: String,
    }

    async fn fixture(balance: f64) -> Fixture {
        let db = connect_memory().await.unwrap();
        let users = UserRepository::new(db.clone());
        let user = users
            .create(UserCreate {
                fullname: "Thu Pham".to_string(),
                phone_number: None,
                email: None,
                role: Role::User,
                balance,
            })
            .await
            .unwrap();
        let user_id = user.id.unwrap().to_string();
        let ledger = PaymentLedger::new(
            PaymentRepository::new(db.clone()),
            OrderRepository::new(db.clone()),
            BalanceService::new(users.clone()),
        );
        Fixture {
            ledger,
            users,
            user_id,
        }
    }

    #[tokio::test]
    async fn balance_payment_debits_and_is_paid() {
        let f = fixture(200_000.0).await;
        let payment = f
            .ledger
            .create_payment("orders:o1", &f.user_id, 120_000.0, PaymentMethod::Balance)
            .await
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Paid);

        let user = f.users.find_by_id(&f.user_id).await.unwrap().unwrap();
        assert_eq!(user.balance, 80_000.0);
    }

    #[tokio::test]
    async fn insufficient_balance_creates_nothing() {
        let f = fixture(50_000.0).await;
        let err = f
            .ledger
            .create_payment("orders:o1", &f.user_id, 105_000.0, PaymentMethod::Balance)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InsufficientFunds));
        assert!(f.ledger.find_by_order("orders:o1").await.unwrap().is_none());

        let user = f.users.find_by_id(&f.user_id).await.unwrap().unwrap();
        assert_eq!(user.balance, 50_000.0);
    }

    #[tokio::test]
    async fn cod_payment_starts_pending_then_marks_paid() {
        let f = fixture(0.0).await;
        let payment = f
            .ledger
            .create_payment("orders:o1", &f.user_id, 60_000.0, PaymentMethod::Cod)
            .await
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);

        let id = payment.id.unwrap().to_string();
        let paid = f.ledger.mark_paid(&id).await.unwrap();
        assert_eq!(paid.status, PaymentStatus::Paid);

        // Idempotent second call.
        let paid = f.ledger.mark_paid(&id).await.unwrap();
        assert_eq!(paid.status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn mark_failed_requires_pending() {
        let f = fixture(200_000.0).await;
        let payment = f
            .ledger
            .create_payment("orders:o1", &f.user_id, 60_000.0, PaymentMethod::Balance)
            .await
            .unwrap();
        let id = payment.id.unwrap().to_string();

        let err = f.ledger.mark_failed(&id).await.unwrap_err();
        assert!(matches!(err, CoreError::Guard { .. }));
    }

    #[tokio::test]
    async fn refund_credits_exactly_once() {
        let f = fixture(200_000.0).await;
        let payment = f
            .ledger
            .create_payment("orders:o1", &f.user_id, 120_000.0, PaymentMethod::Balance)
            .await
            .unwrap();
        let id = payment.id.unwrap().to_string();

        let refunded = f.ledger.refund(&id).await.unwrap();
        assert_eq!(refunded.status, PaymentStatus::Refunded);
        let user = f.users.find_by_id(&f.user_id).await.unwrap().unwrap();
        assert_eq!(user.balance, 200_000.0);

        // Second refund is a no-op, not a double credit.
        let refunded = f.ledger.refund(&id).await.unwrap();
        assert_eq!(refunded.status, PaymentStatus::Refunded);
        let user = f.users.find_by_id(&f.user_id).await.unwrap().unwrap();
        assert_eq!(user.balance, 200_000.0);
    }

    #[tokio::test]
    async fn refund_requires_paid() {
        let f = fixture(0.0).await;
        let payment = f
            .ledger
            .create_payment("orders:o1", &f.user_id, 60_000.0, PaymentMethod::Cod)
            .await
            .unwrap();
        let id = payment.id.unwrap().to_string();

        let err = f.ledger.refund(&id).await.unwrap_err();
        assert!(matches!(err, CoreError::Guard { .. }));

        f.ledger.mark_failed(&id).await.unwrap();
        let err = f.ledger.refund(&id).await.unwrap_err();
        assert!(matches!(err, CoreError::Guard { .. }));
    }
}
