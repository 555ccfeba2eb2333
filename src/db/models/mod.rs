//! Entity documents persisted by the core, one module per collection.

pub mod order;
pub mod payment;
pub mod redemption;
pub mod restaurant;
pub mod serde_helpers;
pub mod user;
pub mod voucher;

pub use order::{
    CancelActor, CreateOrderRequest, Order, OrderDetail, OrderId, OrderItem, OrderItemRequest,
    OrderItemStatus, OrderStatus, ShipperInfo, ShipperRejection, ShipperStats,
};
pub use payment::{Payment, PaymentId, PaymentMethod, PaymentStatus};
pub use redemption::{Redemption, RedemptionBacklogEntry};
pub use restaurant::{MenuCategory, MenuItem, MenuItemStatus, Restaurant, RestaurantCreate, RestaurantId};
pub use user::{Role, User, UserCreate, UserId};
pub use voucher::{Voucher, VoucherCreate, VoucherId, VoucherKind};
