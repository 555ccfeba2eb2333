//! Order lifecycle and transactional checkout engine for the Mekong Eats
//! delivery platform.
//!
//! The crate owns five collaborating components:
//!
//! - **pricing** - authoritative unit prices from the restaurant menu
//! - **vouchers** - eligibility checks, discounts, and the redemption ledger
//! - **payments** - payment records settled against user balances
//! - **orders** - checkout with all-or-nothing rollback plus the shipper
//!   state machine (Pending -> Shipping -> Completed, Cancelled terminal)
//! - **accounts** - atomic per-user balance mutations
//!
//! Everything is wired once through [`AppState`]; user, restaurant and
//! voucher administration live outside this crate and appear only as
//! collaborator records.

pub mod accounts;
pub mod common;
pub mod core;
pub mod db;
pub mod orders;
pub mod payments;
pub mod pricing;
pub mod vouchers;

pub use crate::common::error::{CoreError, CoreResult};
pub use crate::core::{AppState, Config};
