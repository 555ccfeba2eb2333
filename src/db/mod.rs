//! Database Module
//!
//! Embedded SurrealDB: RocksDB-backed for real deployments, in-memory for
//! tests. Collections are schemaless documents; the few invariants the
//! engine must arbitrate (voucher single-use, unique codes) are declared as
//! unique indexes here so they hold under concurrent writers.

pub mod models;
pub mod repository;

use crate::common::error::{CoreError, CoreResult};
use std::path::Path;
use surrealdb::engine::local::{Db, Mem, RocksDb};
use surrealdb::Surreal;

const NAMESPACE: &str = "mekong";
const DATABASE: &str = "core";

/// Schema applied at startup. `IF NOT EXISTS` keeps it re-runnable.
const SCHEMA: &str = r#"
    DEFINE TABLE IF NOT EXISTS users SCHEMALESS;
    DEFINE TABLE IF NOT EXISTS restaurants SCHEMALESS;
    DEFINE TABLE IF NOT EXISTS orders SCHEMALESS;
    DEFINE TABLE IF NOT EXISTS payments SCHEMALESS;
    DEFINE TABLE IF NOT EXISTS vouchers SCHEMALESS;
    DEFINE INDEX IF NOT EXISTS voucher_code_unique ON TABLE vouchers COLUMNS code UNIQUE;
    DEFINE TABLE IF NOT EXISTS redemptions SCHEMALESS;
    DEFINE INDEX IF NOT EXISTS redemption_once ON TABLE redemptions COLUMNS promo_id, user_id UNIQUE;
    DEFINE TABLE IF NOT EXISTS redemption_backlog SCHEMALESS;
"#;

/// Open the RocksDB-backed database at `path` and apply the schema.
pub async fn connect(path: &Path) -> CoreResult<Surreal<Db>> {
    let db = Surreal::new::<RocksDb>(path.to_path_buf())
        .await
        .map_err(|e| CoreError::database(format!("Failed to open database: {e}")))?;
    init(&db).await?;
    tracing::info!(path = %path.display(), "Database opened (embedded RocksDB)");
    Ok(db)
}

/// Open an in-memory database (tests, ephemeral tooling).
pub async fn connect_memory() -> CoreResult<Surreal<Db>> {
    let db = Surreal::new::<Mem>(())
        .await
        .map_err(|e| CoreError::database(format!("Failed to open in-memory database: {e}")))?;
    init(&db).await?;
    Ok(db)
}

async fn init(db: &Surreal<Db>) -> CoreResult<()> {
    db.use_ns(NAMESPACE)
        .use_db(DATABASE)
        .await
        .map_err(|e| CoreError::database(format!("Failed to select namespace: {e}")))?;
    db.query(SCHEMA)
        .await
        .map_err(|e| CoreError::database(format!("Failed to apply schema: {e}")))?;
    Ok(())
}
