//! Order confirmation notifications.

use std::sync::Arc;

use async_trait::async_trait;
use common::{AggregateId, Money, UserId};
use domain::{Aggregate, Order};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Error)]
#[error("notification failed: {0}")]
pub struct NotificationError(pub String);

/// What a confirmation message says about an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderConfirmation {
    pub order_id: AggregateId,
    pub order_number: String,
    pub user_id: UserId,
    pub total: Money,
    pub item_count: u32,
}

impl OrderConfirmation {
    pub fn of(order: &Order) -> Option<Self> {
        Some(Self {
            order_id: order.id()?,
            order_number: order.order_number()?.to_string(),
            user_id: order.user_id()?,
            total: order.totals().total,
            item_count: order.totals().item_count,
        })
    }
}

/// Best-effort delivery of order confirmations.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_order_confirmation(
        &self,
        confirmation: &OrderConfirmation,
    ) -> Result<(), NotificationError>;
}

#[derive(Debug, Default)]
struct Outbox {
    sent: Vec<OrderConfirmation>,
    failing: bool,
}

/// Records confirmations instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    outbox: Arc<RwLock<Outbox>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_failing(&self, failing: bool) {
        self.outbox.write().await.failing = failing;
    }

    pub async fn sent(&self) -> Vec<OrderConfirmation> {
        self.outbox.read().await.sent.clone()
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn send_order_confirmation(
        &self,
        confirmation: &OrderConfirmation,
    ) -> Result<(), NotificationError> {
        let mut outbox = self.outbox.write().await;
        if outbox.failing {
            return Err(NotificationError("mail transport unavailable".into()));
        }
        outbox.sent.push(confirmation.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn confirmation() -> OrderConfirmation {
        OrderConfirmation {
            order_id: AggregateId::new(),
            order_number: "PN1700000000000123".into(),
            user_id: UserId::new(),
            total: Money::from_cents(5280),
            item_count: 2,
        }
    }

    #[tokio::test]
    async fn test_records_sent_confirmations() {
        let notifier = InMemoryNotifier::new();
        let message = confirmation();

        notifier.send_order_confirmation(&message).await.unwrap();

        assert_eq!(notifier.sent().await, vec![message]);
    }

    #[tokio::test]
    async fn test_failing_transport() {
        let notifier = InMemoryNotifier::new();
        notifier.set_failing(true).await;

        assert!(notifier.send_order_confirmation(&confirmation()).await.is_err());
        assert!(notifier.sent().await.is_empty());
    }
}
