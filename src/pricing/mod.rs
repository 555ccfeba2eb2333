//! Pricing Resolver: authoritative unit prices from the restaurant menu.

pub mod resolver;

pub use resolver::{resolve, PricedItems};
