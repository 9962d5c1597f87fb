use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Order, OrderStatus, OrderType, PriceType};
use crate::AppState;

use super::clock::Clock;
use super::order_store::{OrderStore, Transition};
use super::scheduler::ResolutionScheduler;

/// Everything that can go wrong inside the order core. Validation and
/// transition failures are client defects; `Persistence` is an
/// infrastructure fault that the controller surfaces as a generic 500.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    #[error("Missing required order fields")]
    MissingFields,
    #[error("Quantity must be greater than 0")]
    InvalidQuantity,
    #[error("Valid limit price is required")]
    InvalidLimitPrice,
    #[error("Order not found")]
    NotFound,
    #[error("Only pending orders can be cancelled (order is already {current})")]
    InvalidTransition { current: OrderStatus },
    #[error("storage error: {0}")]
    Persistence(String),
}

/// Raw placement payload. Fields are optional so that missing-field
/// validation happens here rather than at deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub symbol: Option<String>,
    pub quantity: Option<i64>,
    pub order_type: Option<String>,
    pub price_type: Option<String>,
    pub price: Option<f64>,
}

/// A placement request that passed validation: symbol uppercased, enums
/// parsed, price present exactly when the order is LIMIT.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedOrder {
    pub symbol: String,
    pub quantity: i64,
    pub order_type: OrderType,
    pub price_type: PriceType,
    pub price: Option<f64>,
}

/// Pure validation; checks short-circuit in a fixed sequence: field
/// presence, quantity range, limit price.
pub fn validate(req: &PlaceOrderRequest) -> Result<NormalizedOrder, OrderError> {
    let symbol = req
        .symbol
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let order_type = req.order_type.as_deref().and_then(OrderType::parse);
    let price_type = req.price_type.as_deref().and_then(PriceType::parse);

    let (symbol, quantity, order_type, price_type) =
        match (symbol, req.quantity, order_type, price_type) {
            (Some(s), Some(q), Some(ot), Some(pt)) => (s, q, ot, pt),
            _ => return Err(OrderError::MissingFields),
        };

    if quantity <= 0 {
        return Err(OrderError::InvalidQuantity);
    }

    let price = match price_type {
        PriceType::Limit => match req.price {
            Some(p) if p > 0.0 => Some(p),
            _ => return Err(OrderError::InvalidLimitPrice),
        },
        // A price sent with a MARKET order is ignored.
        PriceType::Market => None,
    };

    Ok(NormalizedOrder {
        symbol: symbol.to_uppercase(),
        quantity,
        order_type,
        price_type,
        price,
    })
}

/// Result of `place`: the generated id plus the reduced public projection.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order_id: String,
    pub order: PlacedOrderView,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrderView {
    pub symbol: String,
    pub quantity: i64,
    pub order_type: OrderType,
    pub price_type: PriceType,
    pub price: Option<f64>,
    pub status: OrderStatus,
}

/// Full order projection for history/detail responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: String,
    pub symbol: String,
    pub quantity: i64,
    pub order_type: OrderType,
    pub price_type: PriceType,
    pub price: Option<f64>,
    pub status: OrderStatus,
    pub executed_price: Option<f64>,
    pub executed_quantity: Option<i64>,
    pub executed_at: Option<i64>,
    pub cancelled_at: Option<i64>,
    pub rejection_reason: Option<String>,
    pub placed_at: i64,
}

impl From<&Order> for OrderView {
    fn from(o: &Order) -> Self {
        OrderView {
            id: o.id.to_hex(),
            symbol: o.symbol.clone(),
            quantity: o.quantity,
            order_type: o.order_type,
            price_type: o.price_type,
            price: o.price,
            status: o.status,
            executed_price: o.executed_price,
            executed_quantity: o.executed_quantity,
            executed_at: o.executed_at,
            cancelled_at: o.cancelled_at,
            rejection_reason: o.rejection_reason.clone(),
            placed_at: o.placed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderHistory {
    pub orders: Vec<OrderView>,
    pub total: u64,
    pub page: i64,
    pub total_pages: i64,
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCounts {
    pub total: u64,
    pub executed: u64,
    pub pending: u64,
    pub cancelled: u64,
    pub rejected: u64,
}

/// Reduced projection for the summary's recent-orders list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentOrder {
    pub symbol: String,
    pub quantity: i64,
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub placed_at: i64,
    pub executed_price: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub summary: OrderCounts,
    pub recent_orders: Vec<RecentOrder>,
}

/// Validate, persist as PENDING, and schedule the deferred resolution.
/// Nothing is written when validation fails.
pub async fn place(
    state: &AppState,
    user_id: ObjectId,
    req: &PlaceOrderRequest,
) -> Result<PlacedOrder, OrderError> {
    let normalized = validate(req)?;

    let order = Order {
        id: ObjectId::new(),
        user_id,
        symbol: normalized.symbol,
        quantity: normalized.quantity,
        order_type: normalized.order_type,
        price_type: normalized.price_type,
        price: normalized.price,
        status: OrderStatus::Pending,
        executed_price: None,
        executed_quantity: None,
        executed_at: None,
        cancelled_at: None,
        rejection_reason: None,
        placed_at: state.clock.now_ms(),
    };

    state.orders.insert(&order).await?;
    state.scheduler.schedule(order.id);

    tracing::info!(
        order_id = %order.id,
        user_id = %user_id,
        symbol = %order.symbol,
        "order placed"
    );

    Ok(PlacedOrder {
        order_id: order.id.to_hex(),
        order: PlacedOrderView {
            symbol: order.symbol,
            quantity: order.quantity,
            order_type: order.order_type,
            price_type: order.price_type,
            price: order.price,
            status: order.status,
        },
    })
}

/// Cancel a PENDING order. The transition is conditional on the order still
/// being PENDING at write time, so a simulator resolution firing at the same
/// moment cannot be overwritten; whoever loses sees `InvalidTransition` with
/// the winner's terminal status.
pub async fn cancel(
    state: &AppState,
    user_id: ObjectId,
    order_id: ObjectId,
) -> Result<Order, OrderError> {
    let order = state
        .orders
        .find_by_id(user_id, order_id)
        .await?
        .ok_or(OrderError::NotFound)?;

    if order.status != OrderStatus::Pending {
        return Err(OrderError::InvalidTransition {
            current: order.status,
        });
    }

    let at = state.clock.now_ms();
    match state.orders.transition(order_id, Transition::Cancel { at }).await? {
        Some(updated) => {
            tracing::info!(order_id = %order_id, user_id = %user_id, "order cancelled");
            Ok(updated)
        }
        None => {
            // The simulator won the race between our read and write; report
            // the status it settled on.
            let current = state
                .orders
                .find_by_id(user_id, order_id)
                .await?
                .map(|o| o.status)
                .ok_or(OrderError::NotFound)?;
            Err(OrderError::InvalidTransition { current })
        }
    }
}

pub async fn get_by_id(
    state: &AppState,
    user_id: ObjectId,
    order_id: ObjectId,
) -> Result<Order, OrderError> {
    state
        .orders
        .find_by_id(user_id, order_id)
        .await?
        .ok_or(OrderError::NotFound)
}

/// User-scoped history: newest first, optional status filter, 1-indexed
/// pages.
pub async fn list(
    state: &AppState,
    user_id: ObjectId,
    status: Option<OrderStatus>,
    limit: i64,
    page: i64,
) -> Result<OrderHistory, OrderError> {
    let limit = limit.max(1);
    let page = page.max(1);
    // Saturate: absurd limit/page values page past the end, they don't wrap.
    let skip = (page - 1).saturating_mul(limit) as u64;

    let orders = state
        .orders
        .list_for_user(user_id, status, limit, skip)
        .await?;
    let total = state.orders.count_for_user(user_id, status).await?;

    let total_pages = total.div_ceil(limit as u64) as i64;
    let has_more = total > page.saturating_mul(limit) as u64;

    Ok(OrderHistory {
        orders: orders.iter().map(OrderView::from).collect(),
        total,
        page,
        total_pages,
        has_more,
    })
}

/// Per-status counts (every bucket present, zero-defaulted) plus the five
/// most recently placed orders.
pub async fn summarize(state: &AppState, user_id: ObjectId) -> Result<OrderSummary, OrderError> {
    let counts = state.orders.counts_by_status(user_id).await?;
    let recent = state.orders.recent_for_user(user_id, 5).await?;

    Ok(OrderSummary {
        summary: OrderCounts {
            total: counts.total(),
            executed: counts.executed,
            pending: counts.pending,
            cancelled: counts.cancelled,
            rejected: counts.rejected,
        },
        recent_orders: recent
            .iter()
            .map(|o| RecentOrder {
                symbol: o.symbol.clone(),
                quantity: o.quantity,
                order_type: o.order_type,
                status: o.status,
                placed_at: o.placed_at,
                executed_price: o.executed_price,
            })
            .collect(),
    })
}
