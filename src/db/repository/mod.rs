//! Repository Module
//!
//! CRUD and guarded-update access to the SurrealDB collections. One
//! repository struct per collection, all sharing a [`BaseRepository`] that
//! holds the database handle.
//!
//! Conventions:
//! - the primary `id` is a native record id (`select`/`delete`/`UPDATE $rec`)
//! - reference fields are stored as `"table:id"` strings and queries bind
//!   strings, so `WHERE` comparisons always compare like with like
//! - state-transition updates carry their guard in the `WHERE` clause and
//!   return `None` when the guard fails, leaving diagnosis to the caller

pub mod order;
pub mod payment;
pub mod redemption;
pub mod restaurant;
pub mod user;
pub mod voucher;

pub use order::OrderRepository;
pub use payment::PaymentRepository;
pub use redemption::RedemptionRepository;
pub use restaurant::RestaurantRepository;
pub use user::UserRepository;
pub use voucher::VoucherRepository;

use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};
use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<surrealdb::Error> for RepoError {
    fn from(err: surrealdb::Error) -> Self {
        RepoError::Database(err.to_string())
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Whether a database error is a unique-index violation.
pub(crate) fn is_unique_violation(err: &surrealdb::Error) -> bool {
    let msg = err.to_string().to_lowercase();
    msg.contains("already contains") || msg.contains("unique") || msg.contains("duplicate")
}

/// Parse a `"table:id"` string, mapping failures to a validation error.
pub(crate) fn parse_record_id(id: &str, what: &str) -> RepoResult<RecordId> {
    id.parse()
        .map_err(|_| RepoError::Validation(format!("Invalid {} ID: {}", what, id)))
}

/// Base repository with database reference
#[derive(Clone)]
pub struct BaseRepository {
    db: Surreal<Db>,
}

impl BaseRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Surreal<Db> {
        &self.db
    }
}
