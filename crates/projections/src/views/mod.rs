//! Read model views for the query side.

pub mod customer_orders;
pub mod order_stats;

pub use customer_orders::{CustomerOrdersView, OrderPage, OrderQuery, OrderSummary};
pub use order_stats::{OrderStats, OrderStatsView, StatusStats};
