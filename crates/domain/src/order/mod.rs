//! Orders: placement, fulfilment status and payment bookkeeping.

mod aggregate;
mod commands;
mod events;
mod service;
mod status;
mod value_objects;

pub use aggregate::Order;
pub use commands::{PlaceOrder, StatusUpdate};
pub use events::{
    OrderEvent, OrderPlacedData, OrderStatusChangedData, PaymentIntentCreatedData,
    PaymentSetupFailedData, PaymentStatusChangedData,
};
pub use service::OrderService;
pub use status::{OrderStatus, PaymentStatus};
pub use value_objects::{Address, OrderLine, OrderNumber, PaymentIntentRef, PaymentMethod};

use common::ProductId;
use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Order already placed")]
    AlreadyPlaced,

    #[error("Order has not been placed")]
    NotPlaced,

    #[error("Order has no items")]
    NoItems,

    #[error("Invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: ProductId, quantity: u32 },

    #[error("Product {0} appears more than once")]
    DuplicateProduct(ProductId),

    #[error("Address field '{field}' is required")]
    InvalidAddress { field: &'static str },

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    #[error("Invalid payment status transition from {from} to {to}")]
    InvalidPaymentTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },

    /// The order already has a payment intent, pays on delivery, or is past
    /// the point where payment can be set up.
    #[error("Order does not need payment setup")]
    PaymentSetupNotNeeded,
}
