//! Shopping carts.
//!
//! A cart's stream id is derived from its owner, so the active cart of a user
//! or guest session is a direct load with no lookup table. Carts are opened
//! lazily on first access; guest carts expire after [`CartPolicy::guest_ttl`].

mod aggregate;
mod events;
mod service;

pub use aggregate::Cart;
pub use events::{
    CartClearedData, CartDeactivatedData, CartEvent, CartOpenedData, CartReopenedData,
    CouponAppliedData, CouponRemovedData, ItemAddedData, ItemQuantityChangedData, ItemRemovedData,
};
pub use service::{CartService, CartView};

use chrono::TimeDelta;
use common::{AggregateId, Money, ProductId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::pricing::PricedLine;

const CART_NAMESPACE: Uuid = Uuid::from_u128(0x8c5e_41d2_7a0b_4f6e_9d13_2b7c_e0a4_5f91);

/// Who a cart belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CartOwner {
    User(UserId),
    /// Anonymous visitor, keyed by session id.
    Guest(String),
}

impl CartOwner {
    /// Stream id of this owner's cart.
    pub fn cart_id(&self) -> AggregateId {
        let name = match self {
            CartOwner::User(user_id) => format!("user:{user_id}"),
            CartOwner::Guest(session_id) => format!("guest:{session_id}"),
        };
        AggregateId::derived(&CART_NAMESPACE, &name)
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, CartOwner::Guest(_))
    }
}

/// Quantity bounds and guest cart lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartPolicy {
    pub max_quantity: u32,
    pub guest_ttl: TimeDelta,
}

impl Default for CartPolicy {
    fn default() -> Self {
        Self {
            max_quantity: 99,
            guest_ttl: TimeDelta::days(30),
        }
    }
}

/// One product in a cart, priced as of when it was added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
    /// Product stock when the line was added.
    pub max_quantity: u32,
}

impl PricedLine for CartLine {
    fn unit_price(&self) -> Money {
        self.unit_price
    }

    fn quantity(&self) -> u32 {
        self.quantity
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("cart has not been opened")]
    NotOpen,

    #[error("cart is no longer active")]
    Inactive,

    #[error("quantity {quantity} is outside 1..={max}")]
    QuantityOutOfRange { quantity: i64, max: u32 },

    #[error("product {0} is not in the cart")]
    ItemNotFound(ProductId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_ids_are_stable_and_distinct() {
        let user = UserId::new();
        assert_eq!(
            CartOwner::User(user).cart_id(),
            CartOwner::User(user).cart_id()
        );
        assert_ne!(
            CartOwner::User(user).cart_id(),
            CartOwner::Guest(user.to_string()).cart_id()
        );
    }

    #[test]
    fn test_owner_wire_format() {
        let json = serde_json::to_value(CartOwner::Guest("abc".into())).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "guest", "id": "abc"}));
    }
}
