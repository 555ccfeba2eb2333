//! Shared infrastructure: error taxonomy, logging, money and time helpers.

pub mod error;
pub mod logger;
pub mod money;
pub mod time;

pub use error::{CoreError, CoreResult};
