use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;
use serde_json::json;

use crate::{
    models::{CurrentUser, OrderStatus},
    services::order_service::{self, OrderError, OrderHistory, PlaceOrderRequest},
    AppState,
};

/// Map core errors onto the wire: validation and transition defects are 400,
/// unknown/unowned orders are 404, storage faults are logged and surface as
/// a generic 500.
fn error_response(err: OrderError) -> Response {
    let status = match &err {
        OrderError::MissingFields
        | OrderError::InvalidQuantity
        | OrderError::InvalidLimitPrice
        | OrderError::InvalidTransition { .. } => StatusCode::BAD_REQUEST,
        OrderError::NotFound => StatusCode::NOT_FOUND,
        OrderError::Persistence(detail) => {
            tracing::error!(error = %detail, "order persistence failure");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "Something went wrong. Please try again later." })),
            )
                .into_response();
        }
    };

    (status, Json(json!({ "message": err.to_string() }))).into_response()
}

fn parse_order_id(raw: &str) -> Result<ObjectId, Response> {
    // A malformed id cannot name any order; same signal as an unknown one.
    ObjectId::parse_str(raw).map_err(|_| error_response(OrderError::NotFound))
}

// POST /api/orders/place
pub async fn place_order(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<PlaceOrderRequest>,
) -> Response {
    match order_service::place(&state, user.id, &payload).await {
        Ok(placed) => (
            StatusCode::CREATED,
            Json(json!({
                "message": "Order placed successfully",
                "orderId": placed.order_id,
                "order": placed.order,
            })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub page: Option<i64>,
}

// GET /api/orders/history
pub async fn get_order_history(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    let limit = query.limit.unwrap_or(20);
    let page = query.page.unwrap_or(1);

    let status = match query.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => match OrderStatus::parse(raw) {
            Some(s) => Some(s),
            // A status no order can ever have matches nothing.
            None => {
                return Json(OrderHistory {
                    orders: Vec::new(),
                    total: 0,
                    page: page.max(1),
                    total_pages: 0,
                    has_more: false,
                })
                .into_response()
            }
        },
        None => None,
    };

    match order_service::list(&state, user.id, status, limit, page).await {
        Ok(history) => Json(history).into_response(),
        Err(e) => error_response(e),
    }
}

// GET /api/orders/summary
pub async fn get_order_summary(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Response {
    match order_service::summarize(&state, user.id).await {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => error_response(e),
    }
}

// GET /api/orders/:orderId
pub async fn get_order_by_id(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(order_id): Path<String>,
) -> Response {
    let order_id = match parse_order_id(&order_id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match order_service::get_by_id(&state, user.id, order_id).await {
        Ok(order) => Json(json!({ "order": order_service::OrderView::from(&order) })).into_response(),
        Err(e) => error_response(e),
    }
}

// PATCH /api/orders/:orderId/cancel
pub async fn cancel_order(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(order_id): Path<String>,
) -> Response {
    let order_id = match parse_order_id(&order_id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match order_service::cancel(&state, user.id, order_id).await {
        Ok(order) => Json(json!({
            "message": "Order cancelled successfully",
            "order": {
                "id": order.id.to_hex(),
                "status": order.status,
                "cancelledAt": order.cancelled_at,
            }
        }))
        .into_response(),
        Err(e) => error_response(e),
    }
}
