//! Checkout: turning a cart into an order.
//!
//! [`CheckoutCoordinator`] validates a checkout request against the live
//! catalog, then commits the stock decrements, the new order and the emptied
//! cart as one atomic write. Payment intents are created afterwards through a
//! [`PaymentProcessor`]; a failure there leaves the order pending with the
//! failure recorded so payment setup can be retried. Order confirmations go
//! out through a [`Notifier`] without blocking the caller.
//!
//! Cancellation and administrative status changes return stock in the same
//! commit as the status change.

pub mod coordinator;
pub mod error;
pub mod request;
pub mod services;

pub use coordinator::{CheckoutConfig, CheckoutCoordinator};
pub use error::{CheckoutError, Result};
pub use request::{CheckoutRequest, RequestedLine};
pub use services::{
    InMemoryNotifier, InMemoryPaymentProcessor, NotificationError, Notifier, OrderConfirmation,
    PaymentError, PaymentProcessor, PaymentRequest,
};
