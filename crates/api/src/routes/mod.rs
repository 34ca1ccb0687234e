//! HTTP handlers, grouped by audience.

pub mod admin;
pub mod carts;
pub mod orders;
pub mod system;

use checkout::{CheckoutCoordinator, InMemoryNotifier, InMemoryPaymentProcessor};
use event_store::EventStore;
use projections::{CustomerOrdersView, OrderStatsView, ProjectionProcessor};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: EventStore + Clone + 'static> {
    pub checkout: CheckoutCoordinator<S, InMemoryPaymentProcessor, InMemoryNotifier>,
    pub payment: InMemoryPaymentProcessor,
    pub notifier: InMemoryNotifier,
    pub order_history: CustomerOrdersView,
    pub order_stats: OrderStatsView,
    pub projection_processor: ProjectionProcessor<S>,
    pub event_store: S,
}

impl<S: EventStore + Clone + 'static> AppState<S> {
    /// Brings the read models up to date before a query.
    pub async fn refresh_projections(&self) -> Result<(), ApiError> {
        self.projection_processor.run_catch_up().await?;
        Ok(())
    }
}
