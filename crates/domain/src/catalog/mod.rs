//! Product catalog: the stock and price reference data orders draw on.

mod aggregate;
mod events;
mod service;

pub use aggregate::{MAX_PRICE, Product};
pub use events::{
    PriceChangedData, ProductEvent, ProductListedData, ProductStatusData, StockAdjustedData,
    StockReason,
};
pub use service::ProductService;

use async_trait::async_trait;
use common::{Money, ProductId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::DomainError;

/// Stock level category relative to a product's minimum stock level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    OutOfStock,
    LowStock,
    InStock,
}

impl StockStatus {
    pub fn derive(stock: u32, min_stock_level: u32) -> Self {
        if stock == 0 {
            StockStatus::OutOfStock
        } else if stock <= min_stock_level {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }
}

/// Read-only view of a product as of `version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub stock: u32,
    pub min_stock_level: u32,
    pub active: bool,
    pub stock_status: StockStatus,
    pub version: event_store::Version,
}

impl ProductSnapshot {
    pub(crate) fn of(product: &Product) -> Option<Self> {
        use crate::aggregate::Aggregate;

        Some(Self {
            id: product.product_id()?,
            name: product.name().to_string(),
            price: product.price(),
            stock: product.stock(),
            min_stock_level: product.min_stock_level(),
            active: product.is_active(),
            stock_status: product.stock_status(),
            version: product.version(),
        })
    }
}

/// The catalog boundary carts and checkout depend on.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn get_product(&self, id: ProductId) -> Result<Option<ProductSnapshot>, DomainError>;

    /// Applies a signed stock change and returns the product afterwards.
    async fn adjust_stock(
        &self,
        id: ProductId,
        delta: i64,
        reason: StockReason,
    ) -> Result<ProductSnapshot, DomainError>;
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("product {0} is already listed")]
    AlreadyListed(ProductId),

    #[error("product has not been listed")]
    NotListed,

    #[error("product name is required")]
    NameRequired,

    #[error("invalid price {0}")]
    InvalidPrice(Money),

    #[error("product {name} ({product_id}) is not available")]
    ProductUnavailable { product_id: ProductId, name: String },

    #[error("insufficient stock for {name} ({product_id}): requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        name: String,
        requested: u64,
        available: u32,
    },

    #[error("stock for product {0} would overflow")]
    StockOverflow(ProductId),
}
