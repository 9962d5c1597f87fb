use axum::{
    http::StatusCode,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

use crate::AppState;

pub mod market_routes;
pub mod order_routes;
pub mod user_routes;

pub fn app(state: AppState) -> Router {
    let router = Router::<AppState>::new().route("/", get(health));

    let router = user_routes::add_routes(router);
    let router = market_routes::add_routes(router);
    let router = order_routes::add_routes(router);

    // The SPA frontend is served from a different origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        .fallback(not_found)
        .layer(from_fn_with_state(state.clone(), crate::auth::inject_current_user))
        .layer(cors)
        .with_state(state)
}

async fn health() -> &'static str {
    "MoneyTrading backend is running."
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "message": "Not found" })))
}
