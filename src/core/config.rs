//! Core configuration.
//!
//! # Environment variables
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | WORK_DIR | /var/lib/mekong/core | working directory (database, logs) |
//! | ENVIRONMENT | development | development / staging / production |
//! | LOG_LEVEL | info | default tracing filter |
//! | LOG_JSON | false | JSON log output |
//! | RECONCILE_INTERVAL_SECS | 60 | redemption reconciler cadence |
//! | RECONCILE_MAX_ATTEMPTS | 10 | attempts before a backlog entry is abandoned |
//!
//! # Examples
//!
//! ```ignore
//! WORK_DIR=/data/mekong LOG_LEVEL=debug cargo run
//! ```

use std::fs;
use std::io;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory holding the database and log files.
    pub work_dir: String,
    /// development | staging | production
    pub environment: String,
    /// Default tracing filter when RUST_LOG is unset.
    pub log_level: String,
    /// JSON log output (production).
    pub log_json: bool,
    /// Redemption reconciler cadence in seconds.
    pub reconcile_interval_secs: u64,
    /// Attempts before a backlog entry is abandoned.
    pub reconcile_max_attempts: i64,
}

impl Config {
    /// Load from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self {
            work_dir: std::env::var("WORK_DIR")
                .unwrap_or_else(|_| "/var/lib/mekong/core".into()),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: std::env::var("LOG_JSON")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            reconcile_interval_secs: std::env::var("RECONCILE_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            reconcile_max_attempts: std::env::var("RECONCILE_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
        }
    }

    pub fn database_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("database")
    }

    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }

    /// Create the working directory layout if it does not exist yet.
    pub fn ensure_work_dir_structure(&self) -> io::Result<()> {
        fs::create_dir_all(self.database_dir())?;
        fs::create_dir_all(self.log_dir())?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            work_dir: "/var/lib/mekong/core".into(),
            environment: "development".into(),
            log_level: "info".into(),
            log_json: false,
            reconcile_interval_secs: 60,
            reconcile_max_attempts: 10,
        }
    }
}
