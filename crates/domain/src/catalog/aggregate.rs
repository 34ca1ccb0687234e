use common::{AggregateId, Money, ProductId};
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregate, SnapshotCapable};

use super::{CatalogError, ProductEvent, StockReason, StockStatus};

/// Highest unit price a product can carry: $1,000,000.00.
pub const MAX_PRICE: Money = Money::from_cents(100_000_000);

fn check_price(price: Money) -> Result<(), CatalogError> {
    if price.is_negative() || price > MAX_PRICE {
        return Err(CatalogError::InvalidPrice(price));
    }
    Ok(())
}

/// A sellable product and its stock level.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Product {
    id: Option<ProductId>,
    #[serde(default)]
    version: Version,
    name: String,
    price: Money,
    stock: u32,
    min_stock_level: u32,
    active: bool,
}

impl Aggregate for Product {
    type Event = ProductEvent;
    type Error = CatalogError;

    fn aggregate_type() -> &'static str {
        "Product"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id.map(|id| id.stream_id())
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            ProductEvent::ProductListed(data) => {
                self.id = Some(data.product_id);
                self.name = data.name;
                self.price = data.price;
                self.stock = data.stock;
                self.min_stock_level = data.min_stock_level;
                self.active = true;
            }
            ProductEvent::PriceChanged(data) => self.price = data.new_price,
            ProductEvent::StockAdjusted(data) => self.stock = data.stock,
            ProductEvent::ProductDeactivated(_) => self.active = false,
            ProductEvent::ProductReactivated(_) => self.active = true,
        }
    }
}

impl SnapshotCapable for Product {
    fn snapshot_interval() -> usize {
        50
    }
}

// Queries
impl Product {
    pub fn product_id(&self) -> Option<ProductId> {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn stock(&self) -> u32 {
        self.stock
    }

    pub fn min_stock_level(&self) -> u32 {
        self.min_stock_level
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn stock_status(&self) -> StockStatus {
        StockStatus::derive(self.stock, self.min_stock_level)
    }
}

// Commands
impl Product {
    pub fn list(
        &self,
        product_id: ProductId,
        name: &str,
        price: Money,
        stock: u32,
        min_stock_level: u32,
    ) -> Result<Vec<ProductEvent>, CatalogError> {
        if self.id.is_some() {
            return Err(CatalogError::AlreadyListed(product_id));
        }
        if name.trim().is_empty() {
            return Err(CatalogError::NameRequired);
        }
        check_price(price)?;

        Ok(vec![ProductEvent::listed(
            product_id,
            name.trim(),
            price,
            stock,
            min_stock_level,
        )])
    }

    pub fn change_price(&self, new_price: Money) -> Result<Vec<ProductEvent>, CatalogError> {
        self.ensure_listed()?;
        check_price(new_price)?;
        if new_price == self.price {
            return Ok(vec![]);
        }
        Ok(vec![ProductEvent::price_changed(self.price, new_price)])
    }

    /// Moves stock by `delta` units. Stock never drops below zero.
    pub fn adjust_stock(
        &self,
        delta: i64,
        reason: StockReason,
        order_id: Option<AggregateId>,
    ) -> Result<Vec<ProductEvent>, CatalogError> {
        let product_id = self.ensure_listed()?;
        if delta == 0 {
            return Ok(vec![]);
        }

        let next = i64::from(self.stock) + delta;
        if next < 0 {
            return Err(CatalogError::InsufficientStock {
                product_id,
                name: self.name.clone(),
                requested: delta.unsigned_abs(),
                available: self.stock,
            });
        }
        let stock = u32::try_from(next).map_err(|_| CatalogError::StockOverflow(product_id))?;

        Ok(vec![ProductEvent::stock_adjusted(delta, stock, reason, order_id)])
    }

    /// Takes `quantity` units for an order. The product must be active and
    /// hold at least `quantity` units.
    pub fn reserve(
        &self,
        quantity: u32,
        order_id: Option<AggregateId>,
    ) -> Result<Vec<ProductEvent>, CatalogError> {
        let product_id = self.ensure_listed()?;
        if !self.active {
            return Err(CatalogError::ProductUnavailable {
                product_id,
                name: self.name.clone(),
            });
        }
        self.adjust_stock(-i64::from(quantity), StockReason::OrderPlaced, order_id)
    }

    /// Returns `quantity` units from a cancelled order. Allowed for inactive
    /// products.
    pub fn release(
        &self,
        quantity: u32,
        order_id: Option<AggregateId>,
    ) -> Result<Vec<ProductEvent>, CatalogError> {
        self.adjust_stock(i64::from(quantity), StockReason::OrderCancelled, order_id)
    }

    pub fn deactivate(&self) -> Result<Vec<ProductEvent>, CatalogError> {
        self.ensure_listed()?;
        if !self.active {
            return Ok(vec![]);
        }
        Ok(vec![ProductEvent::deactivated()])
    }

    pub fn reactivate(&self) -> Result<Vec<ProductEvent>, CatalogError> {
        self.ensure_listed()?;
        if self.active {
            return Ok(vec![]);
        }
        Ok(vec![ProductEvent::reactivated()])
    }

    fn ensure_listed(&self) -> Result<ProductId, CatalogError> {
        self.id.ok_or(CatalogError::NotListed)
    }
}
