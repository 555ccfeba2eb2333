//! Restaurant Model (collaborator data)
//!
//! Read-only for the core: the menu is the authoritative price source for
//! the pricing resolver, and name/address/hotline are snapshotted onto
//! orders at creation time.

use super::serde_helpers;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

/// Restaurant ID type
pub type RestaurantId = RecordId;

/// Menu item availability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MenuItemStatus {
    #[default]
    Available,
    Unavailable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItem {
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub status: MenuItemStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuCategory {
    pub category: String,
    #[serde(default)]
    pub items: Vec<MenuItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Restaurant {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "serde_helpers::option_record_id"
    )]
    pub id: Option<RestaurantId>,
    pub restaurant_name: String,
    pub address: Option<String>,
    pub hotline: Option<String>,
    #[serde(default)]
    pub menu: Vec<MenuCategory>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Seed payload for tests and collaborator bootstrap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestaurantCreate {
    pub restaurant_name: String,
    pub address: Option<String>,
    pub hotline: Option<String>,
    pub menu: Vec<MenuCategory>,
}
