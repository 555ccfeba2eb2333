//! Menu price resolution.
//!
//! Builds one case-insensitive name -> price index per call, then prices
//! every requested line with O(1) lookups. Unknown or unavailable items fail
//! the whole request; a line is never silently priced at zero. Pure over the
//! restaurant snapshot, no side effects.

use crate::common::error::{CoreError, CoreResult};
use crate::common::money::{to_decimal, to_f64};
use crate::db::models::{
    MenuItemStatus, OrderItem, OrderItemRequest, OrderItemStatus, Restaurant,
};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Priced line items plus their subtotal.
#[derive(Debug, Clone)]
pub struct PricedItems {
    pub items: Vec<OrderItem>,
    pub subtotal: f64,
}

/// Resolve unit prices for every requested line from the restaurant menu.
pub fn resolve(restaurant: &Restaurant, requested: &[OrderItemRequest]) -> CoreResult<PricedItems> {
    // name (lowercased) -> (price, availability); one pass over the menu.
    let mut price_index: HashMap<String, (f64, MenuItemStatus)> = HashMap::new();
    for category in &restaurant.menu {
        for item in &category.items {
            price_index.insert(item.name.to_lowercase(), (item.price, item.status));
        }
    }

    let mut items = Vec::with_capacity(requested.len());
    let mut subtotal = Decimal::ZERO;

    for line in requested {
        let (unit_price, status) = price_index
            .get(&line.food_name.to_lowercase())
            .copied()
            .ok_or_else(|| {
                CoreError::not_found(format!(
                    "Item '{}' is not on the menu of {}",
                    line.food_name, restaurant.restaurant_name
                ))
            })?;

        if status == MenuItemStatus::Unavailable {
            return Err(CoreError::validation(format!(
                "Item '{}' is currently unavailable",
                line.food_name
            )));
        }

        let line_total = to_decimal(unit_price) * Decimal::from(line.quantity);
        subtotal += line_total;

        items.push(OrderItem {
            food_name: line.food_name.clone(),
            quantity: line.quantity,
            unit_price,
            subtotal: to_f64(line_total),
            status: OrderItemStatus::Active,
        });
    }

    Ok(PricedItems {
        items,
        subtotal: to_f64(subtotal),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::time::now_millis;
    use crate::db::models::{MenuCategory, MenuItem};

    fn restaurant() -> Restaurant {
        Restaurant {
            id: Some("restaurants:r1".parse().unwrap()),
            restaurant_name: "Com Tam Ba Ghien".to_string(),
            address: Some("84 Dang Van Ngu".to_string()),
            hotline: None,
            menu: vec![
                MenuCategory {
                    category: "Rice".to_string(),
                    items: vec![
                        MenuItem {
                            name: "Com Tam Suon".to_string(),
                            price: 45_000.0,
                            status: MenuItemStatus::Available,
                        },
                        MenuItem {
                            name: "Com Tam Bi Cha".to_string(),
                            price: 50_000.0,
                            status: MenuItemStatus::Unavailable,
                        },
                    ],
                },
                MenuCategory {
                    category: "Drinks".to_string(),
                    items: vec![MenuItem {
                        name: "Tra Da".to_string(),
                        price: 5_000.0,
                        status: MenuItemStatus::Available,
                    }],
                },
            ],
            created_at: now_millis(),
            updated_at: now_millis(),
        }
    }

    fn line(name: &str, quantity: i32) -> OrderItemRequest {
        OrderItemRequest {
            food_name: name.to_string(),
            quantity,
        }
    }

    #[test]
    fn prices_come_from_the_menu() {
        let priced = resolve(&restaurant(), &[line("Com Tam Suon", 2), line("Tra Da", 3)]).unwrap();
        assert_eq!(priced.items.len(), 2);
        assert_eq!(priced.items[0].unit_price, 45_000.0);
        assert_eq!(priced.items[0].subtotal, 90_000.0);
        assert_eq!(priced.subtotal, 105_000.0);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let priced = resolve(&restaurant(), &[line("com tam SUON", 1)]).unwrap();
        assert_eq!(priced.items[0].unit_price, 45_000.0);
    }

    #[test]
    fn unknown_item_fails_the_whole_request() {
        let err = resolve(
            &restaurant(),
            &[line("Com Tam Suon", 1), line("Banh Mi", 1)],
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
        assert!(err.to_string().contains("Banh Mi"));
    }

    #[test]
    fn unavailable_item_is_rejected() {
        let err = resolve(&restaurant(), &[line("Com Tam Bi Cha", 1)]).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn empty_request_prices_to_zero() {
        let priced = resolve(&restaurant(), &[]).unwrap();
        assert!(priced.items.is_empty());
        assert_eq!(priced.subtotal, 0.0);
    }
}
