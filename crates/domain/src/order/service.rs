//! Order service: loading, staging and single-stream order updates.
//!
//! Placement and cancellation touch product and cart streams as well, so the
//! service only *stages* those changes; the caller commits them together with
//! the matching stock moves through a [`UnitOfWork`](crate::UnitOfWork).

use common::{AggregateId, UserId};
use event_store::EventStore;

use crate::command::{CommandHandler, CommandResult, Staged};
use crate::error::DomainError;
use crate::pricing::PricingPolicy;

use super::{Order, OrderError, OrderEvent, PaymentIntentRef, PaymentStatus, PlaceOrder, StatusUpdate};

/// Service for managing orders.
pub struct OrderService<S: EventStore> {
    handler: CommandHandler<S, Order>,
    pricing: PricingPolicy,
}

impl<S: EventStore> OrderService<S> {
    pub fn new(store: S) -> Self {
        Self {
            handler: CommandHandler::new(store),
            pricing: PricingPolicy::default(),
        }
    }

    pub fn with_pricing(mut self, pricing: PricingPolicy) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn handler(&self) -> &CommandHandler<S, Order> {
        &self.handler
    }

    pub fn pricing(&self) -> &PricingPolicy {
        &self.pricing
    }

    /// Loads an order by ID. Returns None if the order doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: AggregateId) -> Result<Option<Order>, DomainError> {
        self.handler.load_existing(order_id).await
    }

    /// Loads an order on behalf of a customer. Someone else's order is
    /// reported as missing.
    #[tracing::instrument(skip(self))]
    pub async fn get_order_for_user(
        &self,
        user_id: UserId,
        order_id: AggregateId,
    ) -> Result<Order, DomainError> {
        self.get_order(order_id)
            .await?
            .filter(|order| order.is_owned_by(user_id))
            .ok_or_else(|| DomainError::not_found("Order", order_id))
    }

    /// Stages the `OrderPlaced` event for a fresh order stream.
    pub async fn stage_place(&self, cmd: PlaceOrder) -> Result<Staged<Order>, DomainError> {
        let order_id = cmd.order_id;
        let pricing = self.pricing;
        self.handler
            .stage(order_id, |order| order.place(cmd, &pricing))
            .await
    }

    /// Stages an administrative status change.
    pub async fn stage_transition(
        &self,
        order_id: AggregateId,
        update: StatusUpdate,
    ) -> Result<Staged<Order>, DomainError> {
        self.handler
            .stage(order_id, |order| order.transition(update))
            .await
            .map_err(|e| unplaced_as_not_found(e, order_id))
    }

    /// Stages a cancellation requested by the order's owner.
    pub async fn stage_customer_cancel(
        &self,
        user_id: UserId,
        order_id: AggregateId,
        reason: Option<String>,
    ) -> Result<Staged<Order>, DomainError> {
        let order = self.get_order_for_user(user_id, order_id).await?;
        let events = order.cancel_by_customer(reason)?;
        self.handler.decide(order_id, order, events)
    }

    #[tracing::instrument(skip(self, intent), fields(intent_id = %intent.intent_id))]
    pub async fn record_payment_intent(
        &self,
        order_id: AggregateId,
        intent: PaymentIntentRef,
    ) -> Result<CommandResult<Order>, DomainError> {
        self.run(order_id, |order| order.record_payment_intent(intent))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn record_payment_setup_failure(
        &self,
        order_id: AggregateId,
        reason: &str,
    ) -> Result<CommandResult<Order>, DomainError> {
        self.run(order_id, |order| order.record_payment_setup_failure(reason))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn record_payment_status(
        &self,
        order_id: AggregateId,
        status: PaymentStatus,
    ) -> Result<CommandResult<Order>, DomainError> {
        let result = self
            .run(order_id, |order| order.record_payment_status(status))
            .await?;
        if !result.events.is_empty() {
            tracing::info!(%order_id, %status, "payment status recorded");
        }
        Ok(result)
    }

    async fn run<F>(
        &self,
        order_id: AggregateId,
        command_fn: F,
    ) -> Result<CommandResult<Order>, DomainError>
    where
        F: FnOnce(&Order) -> Result<Vec<OrderEvent>, OrderError>,
    {
        self.handler
            .execute(order_id, command_fn)
            .await
            .map_err(|e| unplaced_as_not_found(e, order_id))
    }
}

fn unplaced_as_not_found(error: DomainError, order_id: AggregateId) -> DomainError {
    match error {
        DomainError::Order(OrderError::NotPlaced) => DomainError::not_found("Order", order_id),
        other => other,
    }
}
