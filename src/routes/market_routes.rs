use axum::{routing::get, Router};

use crate::{controllers::market_controller, AppState};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/api/market/explore", get(market_controller::get_explore))
        .route(
            "/api/market/stock/:symbol",
            get(market_controller::get_stock_details),
        )
        .route(
            "/api/market/chart/:symbol/:period",
            get(market_controller::get_stock_chart),
        )
        .route(
            "/api/market/sector/:sector",
            get(market_controller::get_sector_stocks),
        )
        .route("/api/market/search", get(market_controller::search_stocks))
        .route(
            "/api/market/watchlist",
            get(market_controller::get_watchlist),
        )
}
