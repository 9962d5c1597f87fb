use axum::{
    middleware::from_fn,
    routing::{get, patch, post},
    Router,
};

use crate::{controllers::order_controller, AppState};

/// All order routes require an authenticated user.
pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    let orders = Router::new()
        .route("/place", post(order_controller::place_order))
        .route("/history", get(order_controller::get_order_history))
        .route("/summary", get(order_controller::get_order_summary))
        .route("/:order_id", get(order_controller::get_order_by_id))
        .route("/:order_id/cancel", patch(order_controller::cancel_order))
        .route_layer(from_fn(crate::auth::require_auth));

    router.nest("/api/orders", orders)
}
