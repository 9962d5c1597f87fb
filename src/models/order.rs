use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Order status. PENDING is the only initial state; the other three are
/// terminal and never transition again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Pending,
    Executed,
    Rejected,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Executed => "EXECUTED",
            OrderStatus::Rejected => "REJECTED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// Case-insensitive parse, used for the `?status=` query filter.
    pub fn parse(s: &str) -> Option<OrderStatus> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Some(OrderStatus::Pending),
            "EXECUTED" => Some(OrderStatus::Executed),
            "REJECTED" => Some(OrderStatus::Rejected),
            "CANCELLED" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    Buy,
    Sell,
}

impl OrderType {
    pub fn parse(s: &str) -> Option<OrderType> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Some(OrderType::Buy),
            "SELL" => Some(OrderType::Sell),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PriceType {
    Market,
    Limit,
}

impl PriceType {
    pub fn parse(s: &str) -> Option<PriceType> {
        match s.trim().to_uppercase().as_str() {
            "MARKET" => Some(PriceType::Market),
            "LIMIT" => Some(PriceType::Limit),
            _ => None,
        }
    }
}

/// An order document as stored in the `orders` collection.
///
/// Timestamps are unix milliseconds taken from the Clock port. At most one of
/// `executed_at` / `cancelled_at` is set once the order is terminal; a
/// REJECTED order carries `rejection_reason` instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: ObjectId,

    pub symbol: String,
    pub quantity: i64,
    pub order_type: OrderType,
    pub price_type: PriceType,
    /// Limit price; always `Some` and positive for LIMIT orders, `None` for
    /// MARKET orders.
    pub price: Option<f64>,

    pub status: OrderStatus,

    #[serde(default)]
    pub executed_price: Option<f64>,
    #[serde(default)]
    pub executed_quantity: Option<i64>,
    #[serde(default)]
    pub executed_at: Option<i64>,
    #[serde(default)]
    pub cancelled_at: Option<i64>,
    #[serde(default)]
    pub rejection_reason: Option<String>,

    pub placed_at: i64,
}
