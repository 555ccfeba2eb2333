//! Redemption reconciler.
//!
//! `mark_used` after a committed payment is best-effort: a failure must
//! never undo the paid order. Instead of swallowing it, the lifecycle engine
//! queues a backlog row and this task retries on an interval until the
//! ledger insert lands or the attempt budget is spent.

use crate::common::error::{CoreError, CoreResult};
use crate::db::repository::RedemptionRepository;
use crate::vouchers::VoucherEngine;
use std::time::Duration;
use tokio::task::JoinHandle;

/// How many backlog rows one pass picks up.
const DRAIN_BATCH: usize = 64;

#[derive(Clone)]
pub struct RedemptionReconciler {
    engine: VoucherEngine,
    redemptions: RedemptionRepository,
    interval: Duration,
    max_attempts: i64,
}

impl RedemptionReconciler {
    pub fn new(
        engine: VoucherEngine,
        redemptions: RedemptionRepository,
        interval: Duration,
        max_attempts: i64,
    ) -> Self {
        Self {
            engine,
            redemptions,
            interval,
            max_attempts,
        }
    }

    /// Run the reconciler until the process exits.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match self.run_once().await {
                    Ok(0) => {}
                    Ok(settled) => {
                        tracing::info!(settled, "Redemption backlog drained");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Redemption reconciliation pass failed");
                    }
                }
            }
        })
    }

    /// One reconciliation pass; returns how many entries were settled
    /// (either recorded in the ledger or abandoned).
    pub async fn run_once(&self) -> CoreResult<usize> {
        let entries = self.redemptions.backlog_list(DRAIN_BATCH).await?;
        let mut settled = 0;

        for entry in entries {
            let entry_id = match &entry.id {
                Some(id) => id.to_string(),
                None => continue,
            };
            let promo = entry.promo_id.to_string();
            let user = entry.user_id.to_string();
            let order = entry.order_id.to_string();

            match self.engine.mark_used(&promo, &user, &order).await {
                Ok(()) => {
                    self.redemptions.backlog_remove(&entry_id).await?;
                    settled += 1;
                }
                Err(CoreError::NotFound(_)) => {
                    // Voucher deleted since the order was placed; nothing
                    // left to record.
                    tracing::warn!(voucher = %promo, order = %order, "Dropping backlog entry for missing voucher");
                    self.redemptions.backlog_remove(&entry_id).await?;
                    settled += 1;
                }
                Err(e) if entry.attempts + 1 >= self.max_attempts => {
                    tracing::error!(
                        voucher = %promo,
                        user = %user,
                        order = %order,
                        attempts = entry.attempts + 1,
                        error = %e,
                        "Abandoning voucher redemption after repeated failures"
                    );
                    self.redemptions.backlog_remove(&entry_id).await?;
                    settled += 1;
                }
                Err(e) => {
                    self.redemptions
                        .backlog_touch(&entry_id, &e.to_string())
                        .await?;
                }
            }
        }

        Ok(settled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::time::now_millis;
    use crate::db::connect_memory;
    use crate::db::models::{RedemptionBacklogEntry, VoucherCreate, VoucherKind};
    use crate::db::repository::VoucherRepository;
    use crate::vouchers::VoucherRef;

    #[tokio::test]
    async fn drains_backlog_into_the_ledger() {
        let db = connect_memory().await.unwrap();
        let vouchers = VoucherRepository::new(db.clone());
        let redemptions = RedemptionRepository::new(db);
        let voucher = vouchers
            .create(VoucherCreate {
                code: "LATE".to_string(),
                promo_name: "Late bookkeeping".to_string(),
                kind: VoucherKind::Fixed,
                value: 5_000.0,
                max_discount: None,
                min_order_amount: None,
                restaurant_id: None,
                first_order_only: false,
                active: true,
                start_date: 0,
                end_date: i64::MAX,
                description: None,
            })
            .await
            .unwrap();
        let promo_id = voucher.id.unwrap();

        redemptions
            .backlog_push(RedemptionBacklogEntry {
                id: None,
                promo_id: promo_id.clone(),
                user_id: "users:u1".parse().unwrap(),
                order_id: "orders:o1".parse().unwrap(),
                attempts: 1,
                last_error: Some("transient".to_string()),
                created_at: now_millis(),
            })
            .await
            .unwrap();

        let engine = VoucherEngine::new(vouchers, redemptions.clone());
        let reconciler = RedemptionReconciler::new(
            engine.clone(),
            redemptions.clone(),
            Duration::from_secs(60),
            5,
        );

        assert_eq!(reconciler.run_once().await.unwrap(), 1);
        assert!(redemptions.backlog_list(10).await.unwrap().is_empty());
        assert!(redemptions
            .exists(&promo_id.to_string(), "users:u1")
            .await
            .unwrap());
        let voucher = engine
            .find(VoucherRef::Id(&promo_id.to_string()))
            .await
            .unwrap();
        assert_eq!(voucher.usage_count, 1);

        // A second pass finds nothing to do.
        assert_eq!(reconciler.run_once().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn drops_entries_for_deleted_vouchers() {
        let db = connect_memory().await.unwrap();
        let vouchers = VoucherRepository::new(db.clone());
        let redemptions = RedemptionRepository::new(db);

        redemptions
            .backlog_push(RedemptionBacklogEntry {
                id: None,
                promo_id: "vouchers:gone".parse().unwrap(),
                user_id: "users:u1".parse().unwrap(),
                order_id: "orders:o1".parse().unwrap(),
                attempts: 1,
                last_error: None,
                created_at: now_millis(),
            })
            .await
            .unwrap();

        let reconciler = RedemptionReconciler::new(
            VoucherEngine::new(vouchers, redemptions.clone()),
            redemptions.clone(),
            Duration::from_secs(60),
            5,
        );

        assert_eq!(reconciler.run_once().await.unwrap(), 1);
        assert!(redemptions.backlog_list(10).await.unwrap().is_empty());
    }
}
