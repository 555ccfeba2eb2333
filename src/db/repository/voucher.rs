//! Voucher Repository
//!
//! Reads for the voucher engine plus the authoring insert (admin surface /
//! fixtures). `usage_count` moves through atomic increments only.

use super::{is_unique_violation, parse_record_id, BaseRepository, RepoError, RepoResult};
use crate::common::time::now_millis;
use crate::db::models::{Voucher, VoucherCreate};
use surrealdb::engine::local::Db;
use surrealdb::Surreal;

#[derive(Clone)]
pub struct VoucherRepository {
    base: BaseRepository,
}

impl VoucherRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find a voucher by id
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Voucher>> {
        let thing = parse_record_id(id, "voucher")?;
        let voucher: Option<Voucher> = self.base.db().select(thing).await?;
        Ok(voucher)
    }

    /// Find a voucher by its user-facing code
    pub async fn find_by_code(&self, code: &str) -> RepoResult<Option<Voucher>> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM vouchers WHERE code = $code LIMIT 1")
            .bind(("code", code.to_string()))
            .await?;
        let vouchers: Vec<Voucher> = result.take(0)?;
        Ok(vouchers.into_iter().next())
    }

    /// Create a voucher; the unique code index rejects duplicates.
    pub async fn create(&self, data: VoucherCreate) -> RepoResult<Voucher> {
        let now = now_millis();
        let result = self
            .base
            .db()
            .query(
                r#"CREATE vouchers SET
                    code = $code,
                    promo_name = $promo_name,
                    kind = $kind,
                    value = $value,
                    max_discount = $max_discount,
                    min_order_amount = $min_order_amount,
                    restaurant_id = $restaurant_id,
                    first_order_only = $first_order_only,
                    active = $active,
                    start_date = $start_date,
                    end_date = $end_date,
                    description = $description,
                    usage_count = 0,
                    created_at = $now,
                    updated_at = $now
                RETURN AFTER"#,
            )
            .bind(("code", data.code.clone()))
            .bind(("promo_name", data.promo_name))
            .bind(("kind", data.kind))
            .bind(("value", data.value))
            .bind(("max_discount", data.max_discount))
            .bind(("min_order_amount", data.min_order_amount))
            .bind((
                "restaurant_id",
                data.restaurant_id.map(|id| id.to_string()),
            ))
            .bind(("first_order_only", data.first_order_only))
            .bind(("active", data.active))
            .bind(("start_date", data.start_date))
            .bind(("end_date", data.end_date))
            .bind(("description", data.description))
            .bind(("now", now))
            .await;

        let mut result = match result {
            Ok(r) => r,
            Err(e) if is_unique_violation(&e) => {
                return Err(RepoError::Duplicate(format!(
                    "Voucher code '{}' already exists",
                    data.code
                )));
            }
            Err(e) => return Err(e.into()),
        };

        match result.take::<Option<Voucher>>(0) {
            Ok(Some(created)) => Ok(created),
            Ok(None) => Err(RepoError::Database("Failed to create voucher".to_string())),
            Err(e) if is_unique_violation(&e) => Err(RepoError::Duplicate(format!(
                "Voucher code '{}' already exists",
                data.code
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Active vouchers inside their validity window, optionally scoped to a
    /// restaurant (platform-wide vouchers always included), newest first.
    pub async fn list_active(
        &self,
        now: i64,
        restaurant_id: Option<&str>,
    ) -> RepoResult<Vec<Voucher>> {
        let mut sql = String::from(
            "SELECT * FROM vouchers \
             WHERE active = true AND start_date <= $now AND end_date >= $now",
        );
        if restaurant_id.is_some() {
            // Truthiness check: platform-wide vouchers carry no restaurant.
            sql.push_str(" AND (!restaurant_id OR restaurant_id = $restaurant)");
        }
        sql.push_str(" ORDER BY created_at DESC");

        let mut query = self.base.db().query(sql).bind(("now", now));
        if let Some(restaurant) = restaurant_id {
            query = query.bind(("restaurant", restaurant.to_string()));
        }
        let vouchers: Vec<Voucher> = query.await?.take(0)?;
        Ok(vouchers)
    }

    /// Atomic `usage_count` bump; `delta` is +1 on redemption, -1 on refund.
    pub async fn adjust_usage_count(&self, id: &str, delta: i64) -> RepoResult<()> {
        let thing = parse_record_id(id, "voucher")?;
        self.base
            .db()
            .query("UPDATE $voucher SET usage_count += $delta, updated_at = $now")
            .bind(("voucher", thing))
            .bind(("delta", delta))
            .bind(("now", now_millis()))
            .await?;
        Ok(())
    }
}
