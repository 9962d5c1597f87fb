use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::services::clock::Clock;
use crate::{models::CurrentUser, AppState};

// GET /api/market/explore
pub async fn get_explore(State(state): State<AppState>) -> Response {
    Json(state.market.explore()).into_response()
}

// GET /api/market/stock/:symbol
pub async fn get_stock_details(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Response {
    match state.market.details(&symbol) {
        Some(detail) => Json(json!({ "stock": detail })).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Stock not found" })),
        )
            .into_response(),
    }
}

// GET /api/market/chart/:symbol/:period
pub async fn get_stock_chart(
    State(state): State<AppState>,
    Path((symbol, period)): Path<(String, String)>,
) -> Response {
    if state.market.details(&symbol).is_none() {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Stock not found" })),
        )
            .into_response();
    }

    match state.market.chart(&symbol, &period, state.clock.now_ms()) {
        Some(points) => Json(json!({
            "symbol": symbol.to_uppercase(),
            "period": period.to_uppercase(),
            "points": points,
        }))
        .into_response(),
        None => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Unknown chart period" })),
        )
            .into_response(),
    }
}

// GET /api/market/sector/:sector
pub async fn get_sector_stocks(
    State(state): State<AppState>,
    Path(sector): Path<String>,
) -> Response {
    let stocks = state.market.sector(&sector);
    Json(json!({
        "sector": sector.to_uppercase(),
        "stocks": stocks,
    }))
    .into_response()
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

// GET /api/market/search?q=
pub async fn search_stocks(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Response {
    let results = state.market.search(query.q.as_deref().unwrap_or(""));
    Json(json!({
        "count": results.len(),
        "results": results,
    }))
    .into_response()
}

// GET /api/market/watchlist (requires a session)
pub async fn get_watchlist(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    if user.is_none() {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Authentication required" })),
        )
            .into_response();
    }

    // Mock watchlist: the trending slice of the fixture.
    let trending = state.market.explore().trending;
    Json(json!({ "watchlist": trending })).into_response()
}
