//! Checkout error taxonomy.

use common::{AggregateId, ProductId};
use domain::{CartError, CatalogError, CouponError, DomainError, OrderError, OrderStatus};
use thiserror::Error;

/// Typed failures surfaced by checkout and order management.
///
/// Domain errors are folded into the matching category on conversion, so a
/// caller only ever matches on these variants.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Malformed input, rejected before any state is read.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Insufficient stock for {name}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        name: String,
        requested: u64,
        available: u32,
    },

    #[error("Product unavailable: {name}")]
    ProductUnavailable { product_id: ProductId, name: String },

    #[error("Invalid coupon: {0}")]
    InvalidCoupon(CouponError),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    /// The order was placed but no payment intent could be created.
    #[error("Payment setup failed for order {order_id}: {reason}")]
    PaymentSetupFailed { order_id: AggregateId, reason: String },

    /// The request is well-formed but the target is in the wrong state for it.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Another writer advanced one of the touched streams first.
    #[error("Concurrent update detected, retry the request")]
    Conflict,

    #[error(transparent)]
    Domain(DomainError),
}

impl CheckoutError {
    pub fn validation(message: impl Into<String>) -> Self {
        CheckoutError::Validation(message.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        CheckoutError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Short label used for metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            CheckoutError::Validation(_) => "validation",
            CheckoutError::NotFound { .. } => "not_found",
            CheckoutError::InsufficientStock { .. } => "insufficient_stock",
            CheckoutError::ProductUnavailable { .. } => "product_unavailable",
            CheckoutError::InvalidCoupon(_) => "invalid_coupon",
            CheckoutError::InvalidStatusTransition { .. } => "invalid_status_transition",
            CheckoutError::PaymentSetupFailed { .. } => "payment_setup_failed",
            CheckoutError::InvalidState(_) => "invalid_state",
            CheckoutError::Conflict => "conflict",
            CheckoutError::Domain(_) => "internal",
        }
    }
}

impl From<DomainError> for CheckoutError {
    fn from(error: DomainError) -> Self {
        if error.is_conflict() {
            return CheckoutError::Conflict;
        }

        match error {
            DomainError::NotFound {
                aggregate_type,
                aggregate_id,
            } => CheckoutError::NotFound {
                entity: aggregate_type,
                id: aggregate_id,
            },
            DomainError::Validation(message) => CheckoutError::Validation(message),
            DomainError::Coupon(e) => CheckoutError::InvalidCoupon(e),
            DomainError::Catalog(e) => e.into(),
            DomainError::Order(e) => e.into(),
            DomainError::Cart(e) => e.into(),
            other => CheckoutError::Domain(other),
        }
    }
}

impl From<CatalogError> for CheckoutError {
    fn from(error: CatalogError) -> Self {
        match error {
            CatalogError::InsufficientStock {
                product_id,
                name,
                requested,
                available,
            } => CheckoutError::InsufficientStock {
                product_id,
                name,
                requested,
                available,
            },
            CatalogError::ProductUnavailable { product_id, name } => {
                CheckoutError::ProductUnavailable { product_id, name }
            }
            CatalogError::NameRequired | CatalogError::InvalidPrice(_) => {
                CheckoutError::Validation(error.to_string())
            }
            CatalogError::NotListed => CheckoutError::not_found("Product", "unlisted"),
            CatalogError::AlreadyListed(_) | CatalogError::StockOverflow(_) => {
                CheckoutError::InvalidState(error.to_string())
            }
        }
    }
}

impl From<OrderError> for CheckoutError {
    fn from(error: OrderError) -> Self {
        match error {
            OrderError::InvalidStatusTransition { from, to } => {
                CheckoutError::InvalidStatusTransition { from, to }
            }
            OrderError::NoItems
            | OrderError::InvalidQuantity { .. }
            | OrderError::DuplicateProduct(_)
            | OrderError::InvalidAddress { .. } => CheckoutError::Validation(error.to_string()),
            OrderError::NotPlaced => CheckoutError::not_found("Order", "unplaced"),
            OrderError::AlreadyPlaced
            | OrderError::InvalidPaymentTransition { .. }
            | OrderError::PaymentSetupNotNeeded => CheckoutError::InvalidState(error.to_string()),
        }
    }
}

impl From<CartError> for CheckoutError {
    fn from(error: CartError) -> Self {
        match error {
            CartError::QuantityOutOfRange { .. } => CheckoutError::Validation(error.to_string()),
            CartError::ItemNotFound(product_id) => CheckoutError::not_found("CartItem", product_id),
            CartError::NotOpen | CartError::Inactive => CheckoutError::InvalidState(error.to_string()),
        }
    }
}

impl From<CouponError> for CheckoutError {
    fn from(error: CouponError) -> Self {
        CheckoutError::InvalidCoupon(error)
    }
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;

#[cfg(test)]
mod tests {
    use super::*;
    use event_store::EventStoreError;

    #[test]
    fn test_domain_errors_fold_into_categories() {
        let product_id = ProductId::new();
        let stock: CheckoutError = DomainError::from(CatalogError::InsufficientStock {
            product_id,
            name: "Aloe".into(),
            requested: 4,
            available: 1,
        })
        .into();
        assert!(matches!(
            stock,
            CheckoutError::InsufficientStock { requested: 4, available: 1, .. }
        ));

        let missing: CheckoutError = DomainError::not_found("Order", "abc").into();
        assert!(matches!(missing, CheckoutError::NotFound { entity: "Order", .. }));

        let transition: CheckoutError = DomainError::from(OrderError::InvalidStatusTransition {
            from: OrderStatus::Shipped,
            to: OrderStatus::Cancelled,
        })
        .into();
        assert_eq!(transition.reason(), "invalid_status_transition");

        let address: CheckoutError =
            DomainError::from(OrderError::InvalidAddress { field: "city" }).into();
        assert_eq!(address.reason(), "validation");
    }

    #[test]
    fn test_store_conflict_becomes_conflict() {
        let error = DomainError::from(EventStoreError::ConcurrencyConflict {
            aggregate_id: AggregateId::new(),
            expected: event_store::Version::new(1),
            actual: event_store::Version::new(2),
        });
        assert!(matches!(CheckoutError::from(error), CheckoutError::Conflict));
    }

    #[test]
    fn test_coupon_error_message() {
        let error = CheckoutError::from(CouponError::Unknown {
            code: "BOGUS".into(),
        });
        assert_eq!(error.reason(), "invalid_coupon");
        assert!(error.to_string().contains("BOGUS"));
    }
}
