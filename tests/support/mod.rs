//! Shared fixtures for the integration suites: an in-memory core with one
//! buyer, two shippers and a restaurant whose menu prices the reference
//! scenario (subtotal 100,000 + shipping 15,000).

#![allow(dead_code)]

use mekong_core::db::models::{
    CreateOrderRequest, MenuCategory, MenuItem, MenuItemStatus, OrderItemRequest, PaymentMethod,
    RestaurantCreate, Role, UserCreate, VoucherCreate, VoucherKind,
};
use mekong_core::{AppState, Config};

pub struct TestEnv {
    pub state: AppState,
    pub buyer: String,
    pub shipper: String,
    pub second_shipper: String,
    pub restaurant: String,
}

pub async fn env() -> TestEnv {
    env_with_balance(200_000.0).await
}

pub async fn env_with_balance(buyer_balance: f64) -> TestEnv {
    // First caller wins; later binaries/tests just reuse the subscriber.
    let _ = mekong_core::common::logger::init_logger("warn", false, None);

    let state = AppState::initialize_in_memory(&Config::default())
        .await
        .expect("in-memory state");

    let buyer = seed_user(&state, "Lan Pham", Role::User, buyer_balance).await;
    let shipper = seed_user(&state, "Tuan Vo", Role::Shipper, 0.0).await;
    let second_shipper = seed_user(&state, "Hai Dang", Role::Shipper, 0.0).await;

    let restaurant = state
        .restaurants
        .create(RestaurantCreate {
            restaurant_name: "Bun Cha Huong Lien".to_string(),
            address: Some("24 Le Van Huu".to_string()),
            hotline: Some("024 3943 4106".to_string()),
            menu: vec![MenuCategory {
                category: "Signature".to_string(),
                items: vec![
                    MenuItem {
                        name: "Bun Cha".to_string(),
                        price: 50_000.0,
                        status: MenuItemStatus::Available,
                    },
                    MenuItem {
                        name: "Nem Cua Be".to_string(),
                        price: 30_000.0,
                        status: MenuItemStatus::Available,
                    },
                ],
            }],
        })
        .await
        .expect("restaurant fixture")
        .id
        .unwrap()
        .to_string();

    TestEnv {
        state,
        buyer,
        shipper,
        second_shipper,
        restaurant,
    }
}

pub async fn seed_user(state: &AppState, name: &str, role: Role, balance: f64) -> String {
    state
        .users
        .create(UserCreate {
            fullname: name.to_string(),
            phone_number: Some("0901234567".to_string()),
            email: None,
            role,
            balance,
        })
        .await
        .expect("user fixture")
        .id
        .unwrap()
        .to_string()
}

/// Two portions of Bun Cha: subtotal 100,000 with a 15,000 shipping fee.
pub fn order_request(env: &TestEnv, method: PaymentMethod) -> CreateOrderRequest {
    CreateOrderRequest {
        restaurant_id: env.restaurant.parse().unwrap(),
        items: vec![OrderItemRequest {
            food_name: "Bun Cha".to_string(),
            quantity: 2,
        }],
        address: "12 Ly Thuong Kiet, Hoan Kiem".to_string(),
        note: None,
        shipping_fee: 15_000.0,
        promo_id: None,
        payment_method: method,
    }
}

/// 10% off capped at 20,000, platform-wide and always in window.
pub async fn seed_percent_voucher(env: &TestEnv, code: &str, first_order_only: bool) -> String {
    seed_voucher(
        env,
        VoucherCreate {
            code: code.to_string(),
            promo_name: format!("{} promo", code),
            kind: VoucherKind::Percent,
            value: 10.0,
            max_discount: Some(20_000.0),
            min_order_amount: None,
            restaurant_id: None,
            first_order_only,
            active: true,
            start_date: 0,
            end_date: i64::MAX,
            description: None,
        },
    )
    .await
}

pub async fn seed_voucher(env: &TestEnv, voucher: VoucherCreate) -> String {
    use mekong_core::db::repository::VoucherRepository;
    VoucherRepository::new(env.state.db.clone())
        .create(voucher)
        .await
        .expect("voucher fixture")
        .id
        .unwrap()
        .to_string()
}
