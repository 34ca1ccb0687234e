use chrono::{DateTime, Utc};
use common::{AggregateId, ProductId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::coupon::AppliedCoupon;

use super::{CartLine, CartOwner};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CartEvent {
    CartOpened(CartOpenedData),
    /// An expired or deactivated cart was brought back, empty.
    CartReopened(CartReopenedData),
    ItemAdded(ItemAddedData),
    ItemQuantityChanged(ItemQuantityChangedData),
    ItemRemoved(ItemRemovedData),
    CouponApplied(CouponAppliedData),
    CouponRemoved(CouponRemovedData),
    CartCleared(CartClearedData),
    CartDeactivated(CartDeactivatedData),
}

impl DomainEvent for CartEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CartEvent::CartOpened(_) => "CartOpened",
            CartEvent::CartReopened(_) => "CartReopened",
            CartEvent::ItemAdded(_) => "CartItemAdded",
            CartEvent::ItemQuantityChanged(_) => "CartItemQuantityChanged",
            CartEvent::ItemRemoved(_) => "CartItemRemoved",
            CartEvent::CouponApplied(_) => "CouponApplied",
            CartEvent::CouponRemoved(_) => "CouponRemoved",
            CartEvent::CartCleared(_) => "CartCleared",
            CartEvent::CartDeactivated(_) => "CartDeactivated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartOpenedData {
    pub cart_id: AggregateId,
    pub owner: CartOwner,
    /// Set for guest carts only.
    pub expires_at: Option<DateTime<Utc>>,
    pub opened_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartReopenedData {
    pub expires_at: Option<DateTime<Utc>>,
    pub reopened_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemAddedData {
    pub line: CartLine,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemQuantityChangedData {
    pub product_id: ProductId,
    pub old_quantity: u32,
    pub new_quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRemovedData {
    pub product_id: ProductId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouponAppliedData {
    pub coupon: AppliedCoupon,
    /// Code of the coupon this one replaced.
    pub replaced: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouponRemovedData {
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartClearedData {
    /// Order whose placement emptied the cart.
    pub order_id: Option<AggregateId>,
    pub cleared_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartDeactivatedData {
    /// Cart that absorbed this one's items.
    pub merged_into: Option<AggregateId>,
    pub deactivated_at: DateTime<Utc>,
}

impl CartEvent {
    pub fn opened(
        cart_id: AggregateId,
        owner: CartOwner,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        CartEvent::CartOpened(CartOpenedData {
            cart_id,
            owner,
            expires_at,
            opened_at: now,
        })
    }

    pub fn reopened(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        CartEvent::CartReopened(CartReopenedData {
            expires_at,
            reopened_at: now,
        })
    }

    pub fn item_added(line: CartLine) -> Self {
        CartEvent::ItemAdded(ItemAddedData { line })
    }

    pub fn quantity_changed(product_id: ProductId, old_quantity: u32, new_quantity: u32) -> Self {
        CartEvent::ItemQuantityChanged(ItemQuantityChangedData {
            product_id,
            old_quantity,
            new_quantity,
        })
    }

    pub fn item_removed(product_id: ProductId) -> Self {
        CartEvent::ItemRemoved(ItemRemovedData { product_id })
    }

    pub fn coupon_applied(coupon: AppliedCoupon, replaced: Option<String>) -> Self {
        CartEvent::CouponApplied(CouponAppliedData { coupon, replaced })
    }

    pub fn coupon_removed(code: String) -> Self {
        CartEvent::CouponRemoved(CouponRemovedData { code })
    }

    pub fn cleared(order_id: Option<AggregateId>) -> Self {
        CartEvent::CartCleared(CartClearedData {
            order_id,
            cleared_at: Utc::now(),
        })
    }

    pub fn deactivated(merged_into: Option<AggregateId>) -> Self {
        CartEvent::CartDeactivated(CartDeactivatedData {
            merged_into,
            deactivated_at: Utc::now(),
        })
    }
}
