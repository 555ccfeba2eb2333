//! User Repository
//!
//! Profile reads plus the two balance mutations the core owns. Both
//! mutations are single guarded statements so concurrent checkouts can
//! never both spend the same funds.

use super::{parse_record_id, BaseRepository, RepoError, RepoResult};
use crate::common::time::now_millis;
use crate::db::models::{User, UserCreate};
use surrealdb::engine::local::Db;
use surrealdb::Surreal;

#[derive(Clone)]
pub struct UserRepository {
    base: BaseRepository,
}

impl UserRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find a user by id
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<User>> {
        let thing = parse_record_id(id, "user")?;
        let user: Option<User> = self.base.db().select(thing).await?;
        Ok(user)
    }

    /// Seed a user record (tests / collaborator bootstrap)
    pub async fn create(&self, data: UserCreate) -> RepoResult<User> {
        let now = now_millis();
        let mut result = self
            .base
            .db()
            .query(
                r#"CREATE users SET
                    fullname = $fullname,
                    phone_number = $phone_number,
                    email = $email,
                    role = $role,
                    balance = $balance,
                    active = true,
                    created_at = $now,
                    updated_at = $now
                RETURN AFTER"#,
            )
            .bind(("fullname", data.fullname))
            .bind(("phone_number", data.phone_number))
            .bind(("email", data.email))
            .bind(("role", data.role))
            .bind(("balance", data.balance))
            .bind(("now", now))
            .await?;

        let created: Option<User> = result.take(0)?;
        created.ok_or_else(|| RepoError::Database("Failed to create user".to_string()))
    }

    /// Atomic debit: succeeds only while `balance >= amount` at write time.
    ///
    /// Returns `None` when the guard fails (insufficient funds) or the user
    /// does not exist; the caller distinguishes the two.
    pub async fn try_debit(&self, id: &str, amount: f64) -> RepoResult<Option<User>> {
        let thing = parse_record_id(id, "user")?;
        let mut result = self
            .base
            .db()
            .query(
                r#"UPDATE $user SET
                    balance = balance - $amount,
                    updated_at = $now
                WHERE balance >= $amount
                RETURN AFTER"#,
            )
            .bind(("user", thing))
            .bind(("amount", amount))
            .bind(("now", now_millis()))
            .await?;
        Ok(result.take::<Option<User>>(0)?)
    }

    /// Atomic credit.
    pub async fn credit(&self, id: &str, amount: f64) -> RepoResult<Option<User>> {
        let thing = parse_record_id(id, "user")?;
        let mut result = self
            .base
            .db()
            .query(
                r#"UPDATE $user SET
                    balance = balance + $amount,
                    updated_at = $now
                RETURN AFTER"#,
            )
            .bind(("user", thing))
            .bind(("amount", amount))
            .bind(("now", now_millis()))
            .await?;
        Ok(result.take::<Option<User>>(0)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_memory;
    use crate::db::models::Role;

    fn user_fixture(balance: f64) -> UserCreate {
        UserCreate {
            fullname: "Linh Tran".to_string(),
            phone_number: Some("0901000001".to_string()),
            email: None,
            role: Role::User,
            balance,
        }
    }

    #[tokio::test]
    async fn debit_respects_server_side_guard() {
        let repo = UserRepository::new(connect_memory().await.unwrap());
        let user = repo.create(user_fixture(100.0)).await.unwrap();
        let id = user.id.unwrap().to_string();

        let after = repo.try_debit(&id, 60.0).await.unwrap().unwrap();
        assert_eq!(after.balance, 40.0);

        // Second debit exceeds the remaining balance: guard fails, no change.
        assert!(repo.try_debit(&id, 60.0).await.unwrap().is_none());
        let unchanged = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(unchanged.balance, 40.0);
    }

    #[tokio::test]
    async fn credit_increments_balance() {
        let repo = UserRepository::new(connect_memory().await.unwrap());
        let user = repo.create(user_fixture(10.0)).await.unwrap();
        let id = user.id.unwrap().to_string();

        let after = repo.credit(&id, 25.5).await.unwrap().unwrap();
        assert_eq!(after.balance, 35.5);
    }

    #[tokio::test]
    async fn missing_user_yields_none() {
        let repo = UserRepository::new(connect_memory().await.unwrap());
        assert!(repo.find_by_id("users:nope").await.unwrap().is_none());
        assert!(repo.credit("users:nope", 5.0).await.unwrap().is_none());
    }
}
