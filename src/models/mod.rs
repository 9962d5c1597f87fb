pub mod order;
pub mod user;

pub use order::{Order, OrderStatus, OrderType, PriceType};
pub use user::{CurrentUser, User};
