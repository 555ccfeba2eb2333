//! Payment Ledger: payment records and their settlement against balances.

pub mod ledger;

pub use ledger::PaymentLedger;
