use std::sync::Arc;

use mongodb::bson::oid::ObjectId;
use rand::Rng;

use crate::models::OrderStatus;

use super::clock::Clock;
use super::order_service::OrderError;
use super::order_store::{OrderStore, Transition};

/// Resolves a PENDING order to EXECUTED or REJECTED after the scheduling
/// delay. A real system would route to an exchange here; we draw a success
/// outcome with a configured probability instead.
pub struct ExecutionSimulator {
    store: Arc<dyn OrderStore>,
    clock: Arc<dyn Clock>,
    success_rate: f64,
}

impl ExecutionSimulator {
    pub fn new(store: Arc<dyn OrderStore>, clock: Arc<dyn Clock>, success_rate: f64) -> Self {
        ExecutionSimulator {
            store,
            clock,
            success_rate: success_rate.clamp(0.0, 1.0),
        }
    }

    /// Fired once per order. No-op when the order is already terminal (the
    /// cancel path won); otherwise applies a conditional-on-PENDING
    /// transition, so a cancel landing between our read and write still
    /// cannot be overwritten.
    pub async fn resolve(&self, order_id: ObjectId) -> Result<(), OrderError> {
        let Some(order) = self.store.find_any(order_id).await? else {
            tracing::warn!(order_id = %order_id, "resolve: order not found");
            return Ok(());
        };

        if order.status != OrderStatus::Pending {
            tracing::debug!(
                order_id = %order_id,
                status = order.status.as_str(),
                "resolve: order already settled, skipping"
            );
            return Ok(());
        }

        let executed = rand::thread_rng().gen_bool(self.success_rate);

        let transition = if executed {
            let price = order.price.unwrap_or_else(synthesize_market_price);
            Transition::Execute {
                price,
                quantity: order.quantity,
                at: self.clock.now_ms(),
            }
        } else {
            Transition::Reject {
                reason: "Order rejected by simulated exchange".to_string(),
            }
        };

        match self.store.transition(order_id, transition).await? {
            Some(updated) => {
                tracing::info!(
                    order_id = %order_id,
                    symbol = %updated.symbol,
                    status = updated.status.as_str(),
                    "order resolved"
                );
            }
            None => {
                // Lost the race to a concurrent cancel; nothing to do.
                tracing::debug!(order_id = %order_id, "resolve: lost transition race");
            }
        }

        Ok(())
    }
}

/// Stand-in fill price for MARKET orders, matching the mock quote range used
/// by the market data fixture.
fn synthesize_market_price() -> f64 {
    rand::thread_rng().gen_range(100.0..1100.0)
}
