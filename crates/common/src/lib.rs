//! Identifiers and money shared by every crate in the workspace.

mod money;
mod types;

pub use money::{BPS_SCALE, Money};
pub use types::{AggregateId, ProductId, UserId};
