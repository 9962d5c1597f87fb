pub mod db_init;

pub mod clock;
pub mod notifier;
pub mod scheduler;

pub mod order_store;
pub mod execution_simulator;
pub mod order_service;

pub mod auth_service;
pub mod market_service;
