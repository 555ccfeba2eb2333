//! Redemption Repository
//!
//! The ledger behind voucher single-use: one row per (voucher, user) with a
//! unique index arbitrating concurrent redemptions, plus the retry backlog
//! for bookkeeping that failed after a committed payment.

use super::{is_unique_violation, parse_record_id, BaseRepository, RepoError, RepoResult};
use crate::common::time::now_millis;
use crate::db::models::{Redemption, RedemptionBacklogEntry};
use surrealdb::engine::local::Db;
use surrealdb::Surreal;

/// Outcome of a ledger insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The (voucher, user) pair already holds a row; callers treat this as
    /// success so `mark_used` stays idempotent.
    Duplicate,
}

#[derive(Clone)]
pub struct RedemptionRepository {
    base: BaseRepository,
}

impl RedemptionRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Insert a ledger row; the unique (promo, user) index decides races.
    pub async fn try_insert(&self, redemption: Redemption) -> RepoResult<InsertOutcome> {
        let result: Result<Option<Redemption>, surrealdb::Error> = self
            .base
            .db()
            .create("redemptions")
            .content(redemption)
            .await;
        match result {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(e) if is_unique_violation(&e) => Ok(InsertOutcome::Duplicate),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove the (voucher, user) row; returns whether one existed.
    pub async fn remove(&self, promo_id: &str, user_id: &str) -> RepoResult<bool> {
        let mut result = self
            .base
            .db()
            .query(
                "DELETE FROM redemptions WHERE promo_id = $promo AND user_id = $user RETURN BEFORE",
            )
            .bind(("promo", promo_id.to_string()))
            .bind(("user", user_id.to_string()))
            .await?;
        let removed: Vec<Redemption> = result.take(0)?;
        Ok(!removed.is_empty())
    }

    /// Whether the user already redeemed this exact voucher.
    pub async fn exists(&self, promo_id: &str, user_id: &str) -> RepoResult<bool> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM redemptions WHERE promo_id = $promo AND user_id = $user LIMIT 1")
            .bind(("promo", promo_id.to_string()))
            .bind(("user", user_id.to_string()))
            .await?;
        let rows: Vec<Redemption> = result.take(0)?;
        Ok(!rows.is_empty())
    }

    /// Whether the user holds any active first-order-only redemption.
    pub async fn has_first_order_redemption(&self, user_id: &str) -> RepoResult<bool> {
        let mut result = self
            .base
            .db()
            .query(
                "SELECT * FROM redemptions \
                 WHERE user_id = $user AND first_order_only = true LIMIT 1",
            )
            .bind(("user", user_id.to_string()))
            .await?;
        let rows: Vec<Redemption> = result.take(0)?;
        Ok(!rows.is_empty())
    }

    /// All voucher ids the user has redeemed (availability filtering).
    pub async fn promo_ids_of(&self, user_id: &str) -> RepoResult<Vec<String>> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM redemptions WHERE user_id = $user")
            .bind(("user", user_id.to_string()))
            .await?;
        let rows: Vec<Redemption> = result.take(0)?;
        Ok(rows.into_iter().map(|r| r.promo_id.to_string()).collect())
    }

    // ========== Retry backlog ==========

    /// Queue a failed `mark_used` attempt for the reconciler.
    pub async fn backlog_push(&self, entry: RedemptionBacklogEntry) -> RepoResult<()> {
        let _: Option<RedemptionBacklogEntry> = self
            .base
            .db()
            .create("redemption_backlog")
            .content(entry)
            .await?;
        Ok(())
    }

    /// Oldest pending entries, bounded.
    pub async fn backlog_list(&self, limit: usize) -> RepoResult<Vec<RedemptionBacklogEntry>> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM redemption_backlog ORDER BY created_at ASC LIMIT $limit")
            .bind(("limit", limit as i64))
            .await?;
        let rows: Vec<RedemptionBacklogEntry> = result.take(0)?;
        Ok(rows)
    }

    /// Record one more failed attempt.
    pub async fn backlog_touch(&self, id: &str, last_error: &str) -> RepoResult<()> {
        let thing = parse_record_id(id, "backlog entry")?;
        self.base
            .db()
            .query("UPDATE $entry SET attempts += 1, last_error = $error")
            .bind(("entry", thing))
            .bind(("error", last_error.to_string()))
            .await?;
        Ok(())
    }

    /// Drop a settled (or abandoned) entry.
    pub async fn backlog_remove(&self, id: &str) -> RepoResult<()> {
        let thing = parse_record_id(id, "backlog entry")?;
        let _: Option<RedemptionBacklogEntry> = self.base.db().delete(thing).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_memory;

    fn redemption(promo: &str, user: &str, first_order: bool) -> Redemption {
        Redemption {
            id: None,
            promo_id: promo.parse().unwrap(),
            user_id: user.parse().unwrap(),
            order_id: "orders:o1".parse().unwrap(),
            first_order_only: first_order,
            redeemed_at: now_millis(),
        }
    }

    #[tokio::test]
    async fn unique_index_arbitrates_double_redemption() {
        let repo = RedemptionRepository::new(connect_memory().await.unwrap());
        let first = repo
            .try_insert(redemption("vouchers:v1", "users:u1", false))
            .await
            .unwrap();
        assert_eq!(first, InsertOutcome::Inserted);

        let second = repo
            .try_insert(redemption("vouchers:v1", "users:u1", false))
            .await
            .unwrap();
        assert_eq!(second, InsertOutcome::Duplicate);

        // A different user is unaffected.
        let other = repo
            .try_insert(redemption("vouchers:v1", "users:u2", false))
            .await
            .unwrap();
        assert_eq!(other, InsertOutcome::Inserted);
    }

    #[tokio::test]
    async fn remove_reports_whether_a_row_existed() {
        let repo = RedemptionRepository::new(connect_memory().await.unwrap());
        repo.try_insert(redemption("vouchers:v1", "users:u1", true))
            .await
            .unwrap();

        assert!(repo.has_first_order_redemption("users:u1").await.unwrap());
        assert!(repo.remove("vouchers:v1", "users:u1").await.unwrap());
        assert!(!repo.remove("vouchers:v1", "users:u1").await.unwrap());
        assert!(!repo.has_first_order_redemption("users:u1").await.unwrap());
    }

    #[tokio::test]
    async fn backlog_lifecycle() {
        let repo = RedemptionRepository::new(connect_memory().await.unwrap());
        repo.backlog_push(RedemptionBacklogEntry {
            id: None,
            promo_id: "vouchers:v1".parse().unwrap(),
            user_id: "users:u1".parse().unwrap(),
            order_id: "orders:o1".parse().unwrap(),
            attempts: 1,
            last_error: Some("boom".to_string()),
            created_at: now_millis(),
        })
        .await
        .unwrap();

        let entries = repo.backlog_list(10).await.unwrap();
        assert_eq!(entries.len(), 1);
        let id = entries[0].id.clone().unwrap().to_string();

        repo.backlog_touch(&id, "boom again").await.unwrap();
        let entries = repo.backlog_list(10).await.unwrap();
        assert_eq!(entries[0].attempts, 2);

        repo.backlog_remove(&id).await.unwrap();
        assert!(repo.backlog_list(10).await.unwrap().is_empty());
    }
}
