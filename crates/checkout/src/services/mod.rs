//! External collaborators checkout talks to, with in-memory implementations.

pub mod notification;
pub mod payment;

pub use notification::{InMemoryNotifier, NotificationError, Notifier, OrderConfirmation};
pub use payment::{InMemoryPaymentProcessor, PaymentError, PaymentProcessor, PaymentRequest};
