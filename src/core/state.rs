//! Application state - the single construction point for every repository
//! and service.
//!
//! Services are built once at process start and handed out by cheap clones
//! (every repository is a thin wrapper over the shared database handle);
//! nothing in the crate reaches for a global.

use std::sync::Arc;
use std::time::Duration;

use surrealdb::engine::local::Db;
use surrealdb::Surreal;

use crate::accounts::BalanceService;
use crate::common::error::CoreResult;
use crate::core::Config;
use crate::db;
use crate::db::repository::{
    OrderRepository, PaymentRepository, RedemptionRepository, RestaurantRepository,
    UserRepository, VoucherRepository,
};
use crate::orders::OrderLifecycle;
use crate::payments::PaymentLedger;
use crate::vouchers::{RedemptionReconciler, VoucherEngine};

/// Holds every service of the checkout core.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub db: Surreal<Db>,
    /// Unique id per process start, for log correlation across restarts.
    pub epoch: Arc<String>,

    pub users: UserRepository,
    pub restaurants: RestaurantRepository,
    pub balances: BalanceService,
    pub vouchers: VoucherEngine,
    pub payments: PaymentLedger,
    pub orders: OrderLifecycle,

    reconciler: RedemptionReconciler,
}

impl AppState {
    /// Initialize against the RocksDB database under the configured
    /// working directory.
    pub async fn initialize(config: &Config) -> CoreResult<Self> {
        config
            .ensure_work_dir_structure()
            .map_err(|e| crate::common::error::CoreError::internal(format!(
                "Failed to create work directory structure: {e}"
            )))?;
        let db_path = config.database_dir().join("mekong.db");
        let db = db::connect(&db_path).await?;
        Ok(Self::with_db(config.clone(), db))
    }

    /// Initialize against an in-memory database (tests, tooling).
    pub async fn initialize_in_memory(config: &Config) -> CoreResult<Self> {
        let db = db::connect_memory().await?;
        Ok(Self::with_db(config.clone(), db))
    }

    fn with_db(config: Config, db: Surreal<Db>) -> Self {
        let epoch = Arc::new(uuid::Uuid::new_v4().to_string());
        tracing::info!(epoch = %epoch, "Checkout core started with new epoch");

        let users = UserRepository::new(db.clone());
        let restaurants = RestaurantRepository::new(db.clone());
        let order_repo = OrderRepository::new(db.clone());
        let payment_repo = PaymentRepository::new(db.clone());
        let voucher_repo = VoucherRepository::new(db.clone());
        let redemptions = RedemptionRepository::new(db.clone());

        let balances = BalanceService::new(users.clone());
        let vouchers = VoucherEngine::new(voucher_repo, redemptions.clone());
        let payments = PaymentLedger::new(payment_repo, order_repo.clone(), balances.clone());
        let orders = OrderLifecycle::new(
            order_repo,
            users.clone(),
            restaurants.clone(),
            vouchers.clone(),
            redemptions.clone(),
            payments.clone(),
        );

        let reconciler = RedemptionReconciler::new(
            vouchers.clone(),
            redemptions,
            Duration::from_secs(config.reconcile_interval_secs),
            config.reconcile_max_attempts,
        );

        Self {
            config,
            db,
            epoch,
            users,
            restaurants,
            balances,
            vouchers,
            payments,
            orders,
            reconciler,
        }
    }

    /// Start background tasks (currently the redemption reconciler).
    pub fn start_background_tasks(&self) -> tokio::task::JoinHandle<()> {
        self.reconciler.clone().spawn()
    }

    /// The reconciler, for driving passes manually in tests and tooling.
    pub fn reconciler(&self) -> &RedemptionReconciler {
        &self.reconciler
    }
}
