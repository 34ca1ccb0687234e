//! Customer orders read model: each user's order history, newest first.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AggregateId, Money, UserId};
use domain::{OrderEvent, OrderStatus, PaymentStatus};
use event_store::EventEnvelope;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Checkpoint, Projection};
use crate::read_model::ReadModel;

/// One row of a user's order history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order_id: AggregateId,
    pub order_number: String,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub total: Money,
    pub item_count: u32,
    pub tracking_number: Option<String>,
    pub placed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Filter and page selection for [`CustomerOrdersView::orders_for_user`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
    /// 1-based page number.
    pub page: u32,
    pub limit: u32,
}

impl OrderQuery {
    pub const DEFAULT_LIMIT: u32 = 10;
    pub const MAX_LIMIT: u32 = 100;

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn page(mut self, page: u32, limit: u32) -> Self {
        self.page = page;
        self.limit = limit;
        self
    }

    fn normalized(self) -> (u32, u32) {
        (self.page.max(1), self.limit.clamp(1, Self::MAX_LIMIT))
    }
}

impl Default for OrderQuery {
    fn default() -> Self {
        Self {
            status: None,
            page: 1,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

/// A page of order summaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPage {
    pub orders: Vec<OrderSummary>,
    pub page: u32,
    pub limit: u32,
    pub total_results: u64,
    pub total_pages: u64,
}

#[derive(Default)]
struct CustomerOrdersState {
    orders: HashMap<AggregateId, OrderSummary>,
    by_user: HashMap<UserId, Vec<AggregateId>>,
    checkpoint: Checkpoint,
}

/// Per-user order history, filterable by status and paginated.
#[derive(Clone, Default)]
pub struct CustomerOrdersView {
    state: Arc<RwLock<CustomerOrdersState>>,
}

impl CustomerOrdersView {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_order(&self, order_id: AggregateId) -> Option<OrderSummary> {
        self.state.read().await.orders.get(&order_id).cloned()
    }

    /// Returns one page of `user_id`'s orders, newest first.
    pub async fn orders_for_user(&self, user_id: UserId, query: OrderQuery) -> OrderPage {
        let (page, limit) = query.normalized();
        let state = self.state.read().await;

        let mut matching: Vec<&OrderSummary> = state
            .by_user
            .get(&user_id)
            .into_iter()
            .flatten()
            .filter_map(|id| state.orders.get(id))
            .filter(|order| query.status.is_none_or(|status| order.status == status))
            .collect();
        matching.sort_by(|a, b| {
            b.placed_at
                .cmp(&a.placed_at)
                .then_with(|| b.order_number.cmp(&a.order_number))
        });

        let total_results = matching.len() as u64;
        let offset = (u64::from(page) - 1) * u64::from(limit);
        let orders = matching
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(limit as usize)
            .cloned()
            .collect();

        OrderPage {
            orders,
            page,
            limit,
            total_results,
            total_pages: total_results.div_ceil(u64::from(limit)),
        }
    }
}

#[async_trait]
impl Projection for CustomerOrdersView {
    fn name(&self) -> &'static str {
        "CustomerOrdersView"
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
                let summary = OrderSummary {
                    order_id,
                    order_number: data.order_number.to_string(),
                    user_id: data.user_id,
                    status: OrderStatus::Pending,
                    payment_status: PaymentStatus::Pending,
                    total: data.totals.total,
                    item_count: data.totals.item_count,
                    tracking_number: None,
                    placed_at: data.placed_at,
                    updated_at: data.placed_at,
                };
                state.by_user.entry(data.user_id).or_default().push(order_id);
                state.orders.insert(order_id, summary);
            }
            OrderEvent::OrderStatusChanged(data) => {
                if let Some(order) = state.orders.get_mut(&order_id) {
                    order.status = data.to;
                    order.updated_at = data.changed_at;
                    if data.tracking_number.is_some() {
                        order.tracking_number = data.tracking_number;
                    }
                }
            }
            OrderEvent::PaymentStatusChanged(data) => {
                if let Some(order) = state.orders.get_mut(&order_id) {
                    order.payment_status = data.to;
                    order.updated_at = data.changed_at;
                }
            }
            OrderEvent::PaymentIntentCreated(_) | OrderEvent::PaymentSetupFailed(_) => {}
        }

        state.checkpoint.advance(event);
        Ok(true)
    }

    async fn checkpoint(&self) -> Checkpoint {
        self.state.read().await.checkpoint.clone()
    }

    async fn reset(&self) -> Result<()> {
        *self.state.write().await = CustomerOrdersState::default();
        Ok(())
    }
}

impl ReadModel for CustomerOrdersView {
    fn name(&self) -> &'static str {
        "CustomerOrdersView"
    }

    fn count(&self) -> usize {
        self.state
            .try_read()
            .map(|s| s.orders.len())
            .unwrap_or(0)
    }
}
