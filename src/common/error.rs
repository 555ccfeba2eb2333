//! Unified Error Handling
//!
//! A closed set of error kinds for the order/checkout core. Every operation
//! boundary returns [`CoreError`]; repository failures arrive as
//! [`crate::db::repository::RepoError`] and are converted here.
//!
//! | Kind | Meaning |
//! |------|---------|
//! | `Validation` | malformed or missing input, no state change |
//! | `NotFound` | referenced entity does not exist |
//! | `Guard` | action incompatible with the current state |
//! | `VoucherInvalid` | one of the voucher eligibility checks failed |
//! | `InsufficientFunds` | balance debit rejected by the server-side guard |
//! | `InvalidAmount` | balance mutation with a non-positive amount |
//! | `Conflict` | lost a concurrent state-transition race (retryable) |
//! | `Database` | storage failure |
//! | `Internal` | anything else that should never reach a client verbatim |

use crate::db::repository::RepoError;

/// Result type used across services.
pub type CoreResult<T> = Result<T, CoreError>;

/// Application-level error type
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Cannot {action} while in state {state}")]
    Guard { action: String, state: String },

    #[error("Voucher rejected: {0}")]
    VoucherInvalid(String),

    #[error("Insufficient balance")]
    InsufficientFunds,

    #[error("Invalid amount: {0}")]
    InvalidAmount(f64),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        CoreError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        CoreError::NotFound(msg.into())
    }

    /// Guard failure carrying the state that blocked the action.
    pub fn guard(action: impl Into<String>, state: impl ToString) -> Self {
        CoreError::Guard {
            action: action.into(),
            state: state.to_string(),
        }
    }

    pub fn voucher(msg: impl Into<String>) -> Self {
        CoreError::VoucherInvalid(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        CoreError::Conflict(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        CoreError::Database(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        CoreError::Internal(msg.into())
    }

    /// True for errors a client may retry verbatim.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Conflict(_))
    }
}

impl From<RepoError> for CoreError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => CoreError::NotFound(msg),
            RepoError::Duplicate(msg) => CoreError::Conflict(msg),
            RepoError::Validation(msg) => CoreError::Validation(msg),
            RepoError::Database(msg) => CoreError::Database(msg),
        }
    }
}
