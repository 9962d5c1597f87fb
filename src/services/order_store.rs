use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::StreamExt;
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use mongodb::Database;

use crate::models::{Order, OrderStatus};

use super::order_service::OrderError;

/// Terminal transition out of PENDING. Every variant is applied as a single
/// conditional update guarded on the order still being PENDING, so at most
/// one of two racing callers (cancel vs. simulator) can win.
#[derive(Debug, Clone)]
pub enum Transition {
    Execute {
        price: f64,
        quantity: i64,
        at: i64,
    },
    Reject {
        reason: String,
    },
    Cancel {
        at: i64,
    },
}

/// Per-status counts for a user. Buckets default to zero and are never
/// omitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: u64,
    pub executed: u64,
    pub rejected: u64,
    pub cancelled: u64,
}

impl StatusCounts {
    pub fn add(&mut self, status: OrderStatus, n: u64) {
        match status {
            OrderStatus::Pending => self.pending += n,
            OrderStatus::Executed => self.executed += n,
            OrderStatus::Rejected => self.rejected += n,
            OrderStatus::Cancelled => self.cancelled += n,
        }
    }

    pub fn total(&self) -> u64 {
        self.pending + self.executed + self.rejected + self.cancelled
    }
}

/// Persistence port for Order records.
///
/// `transition` must be atomic on the current status: it returns the updated
/// order when the guard held, `None` when the order was missing or no longer
/// PENDING (the caller lost the race).
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: &Order) -> Result<(), OrderError>;

    /// User-scoped lookup; `None` also covers "exists but owned by someone
    /// else" so ownership never leaks.
    async fn find_by_id(
        &self,
        user_id: ObjectId,
        order_id: ObjectId,
    ) -> Result<Option<Order>, OrderError>;

    /// Unscoped lookup for the execution simulator, which only ever holds
    /// ids it created itself.
    async fn find_any(&self, order_id: ObjectId) -> Result<Option<Order>, OrderError>;

    async fn list_for_user(
        &self,
        user_id: ObjectId,
        status: Option<OrderStatus>,
        limit: i64,
        skip: u64,
    ) -> Result<Vec<Order>, OrderError>;

    async fn count_for_user(
        &self,
        user_id: ObjectId,
        status: Option<OrderStatus>,
    ) -> Result<u64, OrderError>;

    async fn transition(
        &self,
        order_id: ObjectId,
        transition: Transition,
    ) -> Result<Option<Order>, OrderError>;

    async fn counts_by_status(&self, user_id: ObjectId) -> Result<StatusCounts, OrderError>;

    /// The `limit` most recently placed orders, any status.
    async fn recent_for_user(
        &self,
        user_id: ObjectId,
        limit: i64,
    ) -> Result<Vec<Order>, OrderError>;
}

// ---------------- MongoDB adapter ----------------

#[derive(Clone)]
pub struct MongoOrderStore {
    db: Database,
}

impl MongoOrderStore {
    pub fn new(db: Database) -> Self {
        MongoOrderStore { db }
    }

    fn orders(&self) -> mongodb::Collection<Order> {
        self.db.collection::<Order>("orders")
    }

    fn user_filter(user_id: ObjectId, status: Option<OrderStatus>) -> Document {
        let mut filter = doc! { "user_id": user_id };
        if let Some(s) = status {
            filter.insert("status", s.as_str());
        }
        filter
    }

    fn transition_update(transition: &Transition) -> Document {
        match transition {
            Transition::Execute { price, quantity, at } => doc! {
                "$set": {
                    "status": OrderStatus::Executed.as_str(),
                    "executed_price": *price,
                    "executed_quantity": *quantity,
                    "executed_at": *at,
                }
            },
            Transition::Reject { reason } => doc! {
                "$set": {
                    "status": OrderStatus::Rejected.as_str(),
                    "rejection_reason": reason.as_str(),
                }
            },
            Transition::Cancel { at } => doc! {
                "$set": {
                    "status": OrderStatus::Cancelled.as_str(),
                    "cancelled_at": *at,
                }
            },
        }
    }
}

fn db_err(e: mongodb::error::Error) -> OrderError {
    OrderError::Persistence(e.to_string())
}

#[async_trait]
impl OrderStore for MongoOrderStore {
    async fn insert(&self, order: &Order) -> Result<(), OrderError> {
        self.orders()
            .insert_one(order, None)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn find_by_id(
        &self,
        user_id: ObjectId,
        order_id: ObjectId,
    ) -> Result<Option<Order>, OrderError> {
        self.orders()
            .find_one(doc! { "_id": order_id, "user_id": user_id }, None)
            .await
            .map_err(db_err)
    }

    async fn find_any(&self, order_id: ObjectId) -> Result<Option<Order>, OrderError> {
        self.orders()
            .find_one(doc! { "_id": order_id }, None)
            .await
            .map_err(db_err)
    }

    async fn list_for_user(
        &self,
        user_id: ObjectId,
        status: Option<OrderStatus>,
        limit: i64,
        skip: u64,
    ) -> Result<Vec<Order>, OrderError> {
        let opts = FindOptions::builder()
            .sort(doc! { "placed_at": -1 })
            .limit(limit)
            .skip(skip)
            .build();

        let mut cursor = self
            .orders()
            .find(Self::user_filter(user_id, status), opts)
            .await
            .map_err(db_err)?;

        let mut out = Vec::new();
        while let Some(item) = cursor.next().await {
            out.push(item.map_err(db_err)?);
        }
        Ok(out)
    }

    async fn count_for_user(
        &self,
        user_id: ObjectId,
        status: Option<OrderStatus>,
    ) -> Result<u64, OrderError> {
        self.orders()
            .count_documents(Self::user_filter(user_id, status), None)
            .await
            .map_err(db_err)
    }

    async fn transition(
        &self,
        order_id: ObjectId,
        transition: Transition,
    ) -> Result<Option<Order>, OrderError> {
        // Guarding the filter on PENDING makes the status change atomic:
        // whichever of cancel/resolve matches first wins, the other matches
        // nothing and gets None back.
        let filter = doc! { "_id": order_id, "status": OrderStatus::Pending.as_str() };
        let opts = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        self.orders()
            .find_one_and_update(filter, Self::transition_update(&transition), opts)
            .await
            .map_err(db_err)
    }

    async fn counts_by_status(&self, user_id: ObjectId) -> Result<StatusCounts, OrderError> {
        let pipeline = vec![
            doc! { "$match": { "user_id": user_id } },
            doc! { "$group": { "_id": "$status", "count": { "$sum": 1 } } },
        ];

        let mut cursor = self
            .db
            .collection::<Document>("orders")
            .aggregate(pipeline, None)
            .await
            .map_err(db_err)?;

        let mut counts = StatusCounts::default();
        while let Some(item) = cursor.next().await {
            let d = item.map_err(db_err)?;
            let status = d
                .get_str("_id")
                .ok()
                .and_then(OrderStatus::parse);
            let n = match d.get("count") {
                Some(Bson::Int32(n)) => *n as u64,
                Some(Bson::Int64(n)) => *n as u64,
                _ => 0,
            };
            if let Some(s) = status {
                counts.add(s, n);
            }
        }
        Ok(counts)
    }

    async fn recent_for_user(
        &self,
        user_id: ObjectId,
        limit: i64,
    ) -> Result<Vec<Order>, OrderError> {
        self.list_for_user(user_id, None, limit, 0).await
    }
}

// ---------------- In-memory adapter ----------------

/// Mutex-guarded store used by tests and local demos. The conditional
/// transition runs entirely under the lock, which gives it the same
/// exactly-one-winner guarantee as the Mongo adapter.
#[derive(Debug, Default)]
pub struct MemoryOrderStore {
    orders: Mutex<Vec<Order>>,
    fail_writes: AtomicBool,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent writes fail, to exercise storage-fault paths.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), OrderError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(OrderError::Persistence("storage unavailable".to_string()));
        }
        Ok(())
    }

    fn sorted_desc(mut orders: Vec<Order>) -> Vec<Order> {
        // Stable sort keeps insertion order for equal timestamps, so the
        // later-placed order of a same-millisecond pair still lists first
        // after the reversal below.
        orders.reverse();
        orders.sort_by_key(|o| std::cmp::Reverse(o.placed_at));
        orders
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn insert(&self, order: &Order) -> Result<(), OrderError> {
        self.check_writable()?;
        self.orders.lock().unwrap().push(order.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        user_id: ObjectId,
        order_id: ObjectId,
    ) -> Result<Option<Order>, OrderError> {
        Ok(self
            .orders
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.id == order_id && o.user_id == user_id)
            .cloned())
    }

    async fn find_any(&self, order_id: ObjectId) -> Result<Option<Order>, OrderError> {
        Ok(self
            .orders
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.id == order_id)
            .cloned())
    }

    async fn list_for_user(
        &self,
        user_id: ObjectId,
        status: Option<OrderStatus>,
        limit: i64,
        skip: u64,
    ) -> Result<Vec<Order>, OrderError> {
        let matching: Vec<Order> = self
            .orders
            .lock()
            .unwrap()
            .iter()
            .filter(|o| o.user_id == user_id && status.map_or(true, |s| o.status == s))
            .cloned()
            .collect();

        Ok(Self::sorted_desc(matching)
            .into_iter()
            .skip(skip as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count_for_user(
        &self,
        user_id: ObjectId,
        status: Option<OrderStatus>,
    ) -> Result<u64, OrderError> {
        Ok(self
            .orders
            .lock()
            .unwrap()
            .iter()
            .filter(|o| o.user_id == user_id && status.map_or(true, |s| o.status == s))
            .count() as u64)
    }

    async fn transition(
        &self,
        order_id: ObjectId,
        transition: Transition,
    ) -> Result<Option<Order>, OrderError> {
        self.check_writable()?;

        let mut orders = self.orders.lock().unwrap();
        let Some(order) = orders
            .iter_mut()
            .find(|o| o.id == order_id && o.status == OrderStatus::Pending)
        else {
            return Ok(None);
        };

        match transition {
            Transition::Execute { price, quantity, at } => {
                order.status = OrderStatus::Executed;
                order.executed_price = Some(price);
                order.executed_quantity = Some(quantity);
                order.executed_at = Some(at);
            }
            Transition::Reject { reason } => {
                order.status = OrderStatus::Rejected;
                order.rejection_reason = Some(reason);
            }
            Transition::Cancel { at } => {
                order.status = OrderStatus::Cancelled;
                order.cancelled_at = Some(at);
            }
        }

        Ok(Some(order.clone()))
    }

    async fn counts_by_status(&self, user_id: ObjectId) -> Result<StatusCounts, OrderError> {
        let mut counts = StatusCounts::default();
        for o in self.orders.lock().unwrap().iter() {
            if o.user_id == user_id {
                counts.add(o.status, 1);
            }
        }
        Ok(counts)
    }

    async fn recent_for_user(
        &self,
        user_id: ObjectId,
        limit: i64,
    ) -> Result<Vec<Order>, OrderError> {
        self.list_for_user(user_id, None, limit, 0).await
    }
}
