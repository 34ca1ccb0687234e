use chrono::{DateTime, Utc};
use common::{AggregateId, Money, ProductId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

/// Why a product's stock moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockReason {
    Restock,
    Correction,
    OrderPlaced,
    OrderCancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ProductEvent {
    ProductListed(ProductListedData),
    PriceChanged(PriceChangedData),
    StockAdjusted(StockAdjustedData),
    ProductDeactivated(ProductStatusData),
    ProductReactivated(ProductStatusData),
}

impl DomainEvent for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductListed(_) => "ProductListed",
            ProductEvent::PriceChanged(_) => "PriceChanged",
            ProductEvent::StockAdjusted(_) => "StockAdjusted",
            ProductEvent::ProductDeactivated(_) => "ProductDeactivated",
            ProductEvent::ProductReactivated(_) => "ProductReactivated",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductListedData {
    pub product_id: ProductId,
    pub name: String,
    pub price: Money,
    pub stock: u32,
    pub min_stock_level: u32,
    pub listed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceChangedData {
    pub old_price: Money,
    pub new_price: Money,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockAdjustedData {
    /// Signed change in units.
    pub delta: i64,
    /// Stock after the adjustment.
    pub stock: u32,
    pub reason: StockReason,
    /// Order that caused the adjustment, if any.
    pub order_id: Option<AggregateId>,
    pub adjusted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductStatusData {
    pub at: DateTime<Utc>,
}

impl ProductEvent {
    pub fn listed(
        product_id: ProductId,
        name: impl Into<String>,
        price: Money,
        stock: u32,
        min_stock_level: u32,
    ) -> Self {
        ProductEvent::ProductListed(ProductListedData {
            product_id,
            name: name.into(),
            price,
            stock,
            min_stock_level,
            listed_at: Utc::now(),
        })
    }

    pub fn price_changed(old_price: Money, new_price: Money) -> Self {
        ProductEvent::PriceChanged(PriceChangedData {
            old_price,
            new_price,
            changed_at: Utc::now(),
        })
    }

    pub fn stock_adjusted(
        delta: i64,
        stock: u32,
        reason: StockReason,
        order_id: Option<AggregateId>,
    ) -> Self {
        ProductEvent::StockAdjusted(StockAdjustedData {
            delta,
            stock,
            reason,
            order_id,
            adjusted_at: Utc::now(),
        })
    }

    pub fn deactivated() -> Self {
        ProductEvent::ProductDeactivated(ProductStatusData { at: Utc::now() })
    }

    pub fn reactivated() -> Self {
        ProductEvent::ProductReactivated(ProductStatusData { at: Utc::now() })
    }
}
