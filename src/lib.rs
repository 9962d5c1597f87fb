//! Library entrypoint for the MoneyTrading backend.
//!
//! This file exists mainly to make controller tests easy (integration tests
//! under `tests/` can import the app state, routers, controllers, services)
//! and to hold the shared `AppState` that every handler receives.

use std::sync::Arc;

pub mod config;
pub mod models;

// Keep this module at crate root because the codebase references it as
// `crate::auth`.
#[path = "middleware/auth.rs"]
pub mod auth;

pub mod services;

pub mod controllers;
pub mod routes;

use services::clock::Clock;
use services::market_service::MarketData;
use services::notifier::OtpNotifier;
use services::order_store::OrderStore;
use services::scheduler::ResolutionScheduler;

/// Shared application state. The order core talks to its collaborators
/// (store, clock, scheduler, notifier) only through these trait objects, so
/// tests can swap in deterministic implementations.
#[derive(Clone)]
pub struct AppState {
    pub db: mongodb::Database,
    pub settings: config::Settings,

    pub orders: Arc<dyn OrderStore>,
    pub clock: Arc<dyn Clock>,
    pub scheduler: Arc<dyn ResolutionScheduler>,
    pub notifier: Arc<dyn OtpNotifier>,

    pub market: Arc<MarketData>,
}
