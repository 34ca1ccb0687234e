//! Order statistics read model for the admin dashboard.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use common::{AggregateId, Money};
use domain::{OrderEvent, OrderStatus};
use event_store::EventEnvelope;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Checkpoint, Projection};
use crate::read_model::ReadModel;

/// Count and revenue of the orders currently in one status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusStats {
    pub status: OrderStatus,
    pub count: u64,
    pub revenue: Money,
    pub average_order_value: Money,
}

/// Store-wide order figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStats {
    /// Only statuses that currently hold at least one order.
    pub by_status: Vec<StatusStats>,
    pub total_orders: u64,
    pub total_revenue: Money,
    pub pending_orders: u64,
    pub average_order_value: Money,
}

#[derive(Debug, Clone, Copy, Default)]
struct Bucket {
    count: u64,
    revenue: Money,
}

impl Bucket {
    fn add(&mut self, total: Money) {
        self.count += 1;
        self.revenue += total;
    }

    fn remove(&mut self, total: Money) {
        self.count = self.count.saturating_sub(1);
        self.revenue -= total;
    }
}

#[derive(Default)]
struct OrderStatsState {
    /// Current status and total of every known order.
    orders: HashMap<AggregateId, (OrderStatus, Money)>,
    buckets: BTreeMap<&'static str, (OrderStatus, Bucket)>,
    checkpoint: Checkpoint,
}

impl OrderStatsState {
    fn bucket(&mut self, status: OrderStatus) -> &mut Bucket {
        &mut self
            .buckets
            .entry(status.as_str())
            .or_insert((status, Bucket::default()))
            .1
    }
}

/// Per-status counts, revenue and averages across all orders.
///
/// Revenue is the sum of order totals at placement time, whatever status the
/// order has reached since.
#[derive(Clone, Default)]
pub struct OrderStatsView {
    state: Arc<RwLock<OrderStatsState>>,
}

impl OrderStatsView {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn stats(&self) -> OrderStats {
        let state = self.state.read().await;

        let mut total_orders = 0;
        let mut total_revenue = Money::zero();
        let mut pending_orders = 0;
        let mut by_status = Vec::new();

        for (status, bucket) in state.buckets.values() {
            if bucket.count == 0 {
                continue;
            }
            total_orders += bucket.count;
            total_revenue += bucket.revenue;
            if *status == OrderStatus::Pending {
                pending_orders = bucket.count;
            }
            by_status.push(StatusStats {
                status: *status,
                count: bucket.count,
                revenue: bucket.revenue,
                average_order_value: average(bucket.revenue, bucket.count),
            });
        }

        OrderStats {
            by_status,
            total_orders,
            total_revenue,
            pending_orders,
            average_order_value: average(total_revenue, total_orders),
        }
    }
}

/// Mean in cents, rounded half-up; zero when there are no orders.
fn average(revenue: Money, count: u64) -> Money {
    match i64::try_from(count) {
        Ok(n) if n > 0 => Money::from_cents((revenue.cents() * 2 + n) / (2 * n)),
        _ => Money::zero(),
    }
}

#[async_trait]
impl Projection for OrderStatsView {
    fn name(&self) -> &'static str {
        "OrderStatsView"
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<bool> {
        let mut state = self.state.write().await;
        if event.aggregate_type != "Order" || !state.checkpoint.accepts(event) {
            return Ok(false);
        }

        let order_event: OrderEvent = serde_json::from_value(event.payload.clone())?;
        let order_id = event.aggregate_id;

        match order_event {
            OrderEvent::OrderPlaced(data) => {
                let total = data.totals.total;
                state.orders.insert(order_id, (OrderStatus::Pending, total));
                state.bucket(OrderStatus::Pending).add(total);
            }
            OrderEvent::OrderStatusChanged(data) => {
                if let Some((status, total)) = state.orders.get(&order_id).copied() {
                    state.bucket(status).remove(total);
                    state.bucket(data.to).add(total);
                    state.orders.insert(order_id, (data.to, total));
                }
            }
            OrderEvent::PaymentIntentCreated(_)
            | OrderEvent::PaymentSetupFailed(_)
            | OrderEvent::PaymentStatusChanged(_) => {}
        }

        state.checkpoint.advance(event);
        Ok(true)
    }

    async fn checkpoint(&self) -> Checkpoint {
        self.state.read().await.checkpoint.clone()
    }

    async fn reset(&self) -> Result<()> {
        *self.state.write().await = OrderStatsState::default();
        Ok(())
    }
}

impl ReadModel for OrderStatsView {
    fn name(&self) -> &'static str {
        "OrderStatsView"
    }

    fn count(&self) -> usize {
        self.state
            .try_read()
            .map(|s| s.orders.len())
            .unwrap_or(0)
    }
}
