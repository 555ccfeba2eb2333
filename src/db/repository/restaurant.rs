//! Restaurant Repository
//!
//! Read side of the restaurant catalog; the core never edits menus.

use super::{parse_record_id, BaseRepository, RepoError, RepoResult};
use crate::common::time::now_millis;
use crate::db::models::{Restaurant, RestaurantCreate};
use surrealdb::engine::local::Db;
use surrealdb::Surreal;

#[derive(Clone)]
pub struct RestaurantRepository {
    base: BaseRepository,
}

impl RestaurantRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find a restaurant by id
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Restaurant>> {
        let thing = parse_record_id(id, "restaurant")?;
        let restaurant: Option<Restaurant> = self.base.db().select(thing).await?;
        Ok(restaurant)
    }

    /// Seed a restaurant record (tests / collaborator bootstrap)
    pub async fn create(&self, data: RestaurantCreate) -> RepoResult<Restaurant> {
        let now = now_millis();
        let mut result = self
            .base
            .db()
            .query(
                r#"CREATE restaurants SET
                    restaurant_name = $restaurant_name,
                    address = $address,
                    hotline = $hotline,
                    menu = $menu,
                    created_at = $now,
                    updated_at = $now
                RETURN AFTER"#,
            )
            .bind(("restaurant_name", data.restaurant_name))
            .bind(("address", data.address))
            .bind(("hotline", data.hotline))
            .bind(("menu", data.menu))
            .bind(("now", now))
            .await?;

        let created: Option<Restaurant> = result.take(0)?;
        created.ok_or_else(|| RepoError::Database("Failed to create restaurant".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_memory;
    use crate::db::models::{MenuCategory, MenuItem, MenuItemStatus};

    #[tokio::test]
    async fn round_trips_menu() {
        let repo = RestaurantRepository::new(connect_memory().await.unwrap());
        let created = repo
            .create(RestaurantCreate {
                restaurant_name: "Pho 24".to_string(),
                address: Some("12 Nguyen Hue".to_string()),
                hotline: Some("1900 1234".to_string()),
                menu: vec![MenuCategory {
                    category: "Noodles".to_string(),
                    items: vec![MenuItem {
                        name: "Pho Bo".to_string(),
                        price: 55_000.0,
                        status: MenuItemStatus::Available,
                    }],
                }],
            })
            .await
            .unwrap();

        let id = created.id.unwrap().to_string();
        let found = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(found.menu.len(), 1);
        assert_eq!(found.menu[0].items[0].price, 55_000.0);
    }
}
