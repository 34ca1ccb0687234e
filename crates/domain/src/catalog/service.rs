use async_trait::async_trait;
use common::{AggregateId, Money, ProductId};
use event_store::EventStore;

use crate::command::{CommandHandler, CommandResult, Staged};
use crate::error::DomainError;

use super::{Catalog, CatalogError, Product, ProductSnapshot, StockReason};

/// Minimum stock level used when a listing does not give one.
pub const DEFAULT_MIN_STOCK_LEVEL: u32 = 5;

/// Product catalog backed by the event store.
pub struct ProductService<S: EventStore> {
    handler: CommandHandler<S, Product>,
}

impl<S: EventStore> ProductService<S> {
    pub fn new(store: S) -> Self {
        Self {
            handler: CommandHandler::new(store),
        }
    }

    pub fn handler(&self) -> &CommandHandler<S, Product> {
        &self.handler
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_product(
        &self,
        name: &str,
        price: Money,
        stock: u32,
        min_stock_level: Option<u32>,
    ) -> Result<ProductSnapshot, DomainError> {
        let product_id = ProductId::new();
        let min_stock_level = min_stock_level.unwrap_or(DEFAULT_MIN_STOCK_LEVEL);

        let result = self
            .handler
            .execute(product_id.stream_id(), |p| {
                p.list(product_id, name, price, stock, min_stock_level)
            })
            .await?;

        tracing::info!(%product_id, stock, "product listed");
        snapshot_of(product_id, &result)
    }

    #[tracing::instrument(skip(self))]
    pub async fn change_price(
        &self,
        product_id: ProductId,
        price: Money,
    ) -> Result<ProductSnapshot, DomainError> {
        let result = self
            .run(product_id, |p| p.change_price(price))
            .await?;
        snapshot_of(product_id, &result)
    }

    #[tracing::instrument(skip(self))]
    pub async fn deactivate(&self, product_id: ProductId) -> Result<ProductSnapshot, DomainError> {
        let result = self.run(product_id, |p| p.deactivate()).await?;
        snapshot_of(product_id, &result)
    }

    #[tracing::instrument(skip(self))]
    pub async fn reactivate(&self, product_id: ProductId) -> Result<ProductSnapshot, DomainError> {
        let result = self.run(product_id, |p| p.reactivate()).await?;
        snapshot_of(product_id, &result)
    }

    /// Stages taking `quantity` units for an order, without writing.
    pub async fn stage_reservation(
        &self,
        product_id: ProductId,
        quantity: u32,
        order_id: AggregateId,
    ) -> Result<Staged<Product>, DomainError> {
        self.handler
            .stage(product_id.stream_id(), |p| p.reserve(quantity, Some(order_id)))
            .await
            .map_err(|e| unlisted_as_not_found(e, product_id))
    }

    /// Stages returning `quantity` units from a cancelled order.
    pub async fn stage_release(
        &self,
        product_id: ProductId,
        quantity: u32,
        order_id: AggregateId,
    ) -> Result<Staged<Product>, DomainError> {
        self.handler
            .stage(product_id.stream_id(), |p| p.release(quantity, Some(order_id)))
            .await
            .map_err(|e| unlisted_as_not_found(e, product_id))
    }

    async fn run<F>(
        &self,
        product_id: ProductId,
        command_fn: F,
    ) -> Result<CommandResult<Product>, DomainError>
    where
        F: FnOnce(&Product) -> Result<Vec<super::ProductEvent>, CatalogError>,
    {
        self.handler
            .execute_with_snapshot(product_id.stream_id(), command_fn)
            .await
            .map_err(|e| unlisted_as_not_found(e, product_id))
    }
}

#[async_trait]
impl<S: EventStore> Catalog for ProductService<S> {
    #[tracing::instrument(skip(self))]
    async fn get_product(&self, id: ProductId) -> Result<Option<ProductSnapshot>, DomainError> {
        let product = self.handler.load_existing(id.stream_id()).await?;
        Ok(product.as_ref().and_then(ProductSnapshot::of))
    }

    #[tracing::instrument(skip(self))]
    async fn adjust_stock(
        &self,
        id: ProductId,
        delta: i64,
        reason: StockReason,
    ) -> Result<ProductSnapshot, DomainError> {
        let result = self
            .run(id, |p| p.adjust_stock(delta, reason, None))
            .await?;
        tracing::info!(product_id = %id, delta, stock = result.aggregate.stock(), "stock adjusted");
        snapshot_of(id, &result)
    }
}

fn snapshot_of(
    product_id: ProductId,
    result: &CommandResult<Product>,
) -> Result<ProductSnapshot, DomainError> {
    ProductSnapshot::of(&result.aggregate).ok_or_else(|| DomainError::not_found("Product", product_id))
}

fn unlisted_as_not_found(error: DomainError, product_id: ProductId) -> DomainError {
    match error {
        DomainError::Catalog(CatalogError::NotListed) => {
            DomainError::not_found("Product", product_id)
        }
        other => other,
    }
}
