//! Read models for the query side of the storefront.
//!
//! - [`Projection`] folds store events into a read model, guarded by a
//!   per-stream [`Checkpoint`]
//! - [`ReadModel`] gives cheap size introspection
//! - [`ProjectionProcessor`] replays the store into registered projections
//! - Two views: [`CustomerOrdersView`] (a user's order history) and
//!   [`OrderStatsView`] (admin order statistics)

pub mod error;
pub mod processor;
pub mod projection;
pub mod read_model;
pub mod views;

pub use error::{ProjectionError, Result};
pub use processor::ProjectionProcessor;
pub use projection::{Checkpoint, Projection};
pub use read_model::ReadModel;
pub use views::{
    CustomerOrdersView, OrderPage, OrderQuery, OrderStats, OrderStatsView, OrderSummary,
    StatusStats,
};
