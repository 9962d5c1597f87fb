pub mod market_controller;
pub mod order_controller;
pub mod user_controller;
