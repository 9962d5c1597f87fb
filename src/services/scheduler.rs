use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use mongodb::bson::oid::ObjectId;
use tokio::time;

use super::execution_simulator::ExecutionSimulator;

/// Schedules the deferred resolution of a freshly placed order.
///
/// Implementations must detach the resolution from the request that placed
/// the order: dropping the HTTP connection must not cancel the timer, and the
/// timer firing must not affect the response.
pub trait ResolutionScheduler: Send + Sync {
    fn schedule(&self, order_id: ObjectId);
}

/// In-process timer: spawn, sleep, resolve. Does not survive a restart; a
/// durable job queue would slot in behind the same trait.
pub struct TokioScheduler {
    simulator: Arc<ExecutionSimulator>,
    delay: Duration,
}

impl TokioScheduler {
    pub fn new(simulator: Arc<ExecutionSimulator>, delay: Duration) -> Self {
        TokioScheduler { simulator, delay }
    }
}

impl ResolutionScheduler for TokioScheduler {
    fn schedule(&self, order_id: ObjectId) {
        let simulator = self.simulator.clone();
        let delay = self.delay;

        tokio::spawn(async move {
            time::sleep(delay).await;

            if let Err(e) = simulator.resolve(order_id).await {
                // Order stays PENDING; no automatic retry.
                tracing::error!(order_id = %order_id, error = %e, "order resolution failed");
            }
        });
    }
}

/// Records scheduled ids without firing anything, so tests control exactly
/// when resolution happens.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    scheduled: Mutex<Vec<ObjectId>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<ObjectId> {
        std::mem::take(&mut self.scheduled.lock().unwrap())
    }
}

impl ResolutionScheduler for ManualScheduler {
    fn schedule(&self, order_id: ObjectId) {
        self.scheduled.lock().unwrap().push(order_id);
    }
}
