//! Balance Account service.
//!
//! Per-user monetary balance used for checkout debits, refund credits,
//! top-ups and shipper earnings withdrawal. Amount validation happens here;
//! the actual mutation is a single guarded statement in the user
//! repository, so the balance can never go negative under concurrency.

use crate::common::error::{CoreError, CoreResult};
use crate::db::models::{Role, User};
use crate::db::repository::UserRepository;

#[derive(Clone)]
pub struct BalanceService {
    users: UserRepository,
}

impl BalanceService {
    pub fn new(users: UserRepository) -> Self {
        Self { users }
    }

    /// Debit `amount` from the user; `InsufficientFunds` when the
    /// server-side guard rejects it.
    pub async fn debit(&self, user_id: &str, amount: f64) -> CoreResult<User> {
        validate_amount(amount)?;
        match self.users.try_debit(user_id, amount).await? {
            Some(user) => {
                tracing::debug!(user = %user_id, amount, balance = user.balance, "Balance debited");
                Ok(user)
            }
            None => {
                // Guard failure: distinguish a missing user from a short one.
                match self.users.find_by_id(user_id).await? {
                    Some(_) => Err(CoreError::InsufficientFunds),
                    None => Err(CoreError::not_found(format!("User {} not found", user_id))),
                }
            }
        }
    }

    /// Credit `amount` to the user.
    pub async fn credit(&self, user_id: &str, amount: f64) -> CoreResult<User> {
        validate_amount(amount)?;
        let user = self
            .users
            .credit(user_id, amount)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("User {} not found", user_id)))?;
        tracing::debug!(user = %user_id, amount, balance = user.balance, "Balance credited");
        Ok(user)
    }

    /// Self-service top-up.
    pub async fn top_up(&self, user_id: &str, amount: f64) -> CoreResult<User> {
        let user = self.credit(user_id, amount).await?;
        tracing::info!(user = %user_id, amount, "Balance topped up");
        Ok(user)
    }

    /// Shipper earnings payout; only shippers may withdraw.
    pub async fn withdraw(&self, shipper_id: &str, amount: f64) -> CoreResult<User> {
        validate_amount(amount)?;
        let user = self
            .users
            .find_by_id(shipper_id)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("User {} not found", shipper_id)))?;
        if user.role != Role::Shipper {
            return Err(CoreError::validation(
                "Only shippers can withdraw delivery earnings",
            ));
        }
        let user = self.debit(shipper_id, amount).await?;
        tracing::info!(shipper = %shipper_id, amount, "Earnings withdrawn");
        Ok(user)
    }
}

fn validate_amount(amount: f64) -> CoreResult<()> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(CoreError::InvalidAmount(amount));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_memory;
    use crate::db::models::UserCreate;

    async fn service_with_user(role: Role, balance: f64) -> (BalanceService, String) {
        let db = connect_memory().await.unwrap();
        let users = UserRepository::new(db);
        let user = users
            .create(UserCreate {
                fullname: "Minh Nguyen".to_string(),
                phone_number: None,
                email: None,
                role,
                balance,
            })
            .await
            .unwrap();
        let id = user.id.unwrap().to_string();
        (BalanceService::new(users), id)
    }

    #[tokio::test]
    async fn debit_and_credit_round_trip() {
        let (service, id) = service_with_user(Role::User, 100_000.0).await;
        let after = service.debit(&id, 60_000.0).await.unwrap();
        assert_eq!(after.balance, 40_000.0);
        let after = service.credit(&id, 10_000.0).await.unwrap();
        assert_eq!(after.balance, 50_000.0);
    }

    #[tokio::test]
    async fn debit_beyond_balance_is_rejected() {
        let (service, id) = service_with_user(Role::User, 50_000.0).await;
        let err = service.debit(&id, 105_000.0).await.unwrap_err();
        assert!(matches!(err, CoreError::InsufficientFunds));
    }

    #[tokio::test]
    async fn non_positive_amounts_are_rejected() {
        let (service, id) = service_with_user(Role::User, 100.0).await;
        assert!(matches!(
            service.debit(&id, 0.0).await.unwrap_err(),
            CoreError::InvalidAmount(_)
        ));
        assert!(matches!(
            service.credit(&id, -5.0).await.unwrap_err(),
            CoreError::InvalidAmount(_)
        ));
    }

    #[tokio::test]
    async fn withdrawal_requires_the_shipper_role() {
        let (service, id) = service_with_user(Role::User, 100_000.0).await;
        let err = service.withdraw(&id, 10_000.0).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        let (service, shipper) = service_with_user(Role::Shipper, 100_000.0).await;
        let after = service.withdraw(&shipper, 10_000.0).await.unwrap();
        assert_eq!(after.balance, 90_000.0);
    }
}
