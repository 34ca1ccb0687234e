//! Order commands.

use common::{AggregateId, UserId};

use crate::coupon::AppliedCoupon;

use super::{Address, OrderLine, OrderStatus, PaymentMethod};

/// Everything needed to place an order once lines are priced and stock
/// has been checked.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub order_id: AggregateId,
    pub user_id: UserId,
    pub cart_id: Option<AggregateId>,
    pub lines: Vec<OrderLine>,
    pub coupon: Option<AppliedCoupon>,
    pub shipping_address: Address,
    /// Falls back to the shipping address when absent.
    pub billing_address: Option<Address>,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

impl PlaceOrder {
    /// Creates a new PlaceOrder command with a generated order ID.
    pub fn new(
        user_id: UserId,
        lines: Vec<OrderLine>,
        shipping_address: Address,
        payment_method: PaymentMethod,
    ) -> Self {
        Self {
            order_id: AggregateId::new(),
            user_id,
            cart_id: None,
            lines,
            coupon: None,
            shipping_address,
            billing_address: None,
            payment_method,
            notes: None,
        }
    }

    pub fn from_cart(mut self, cart_id: AggregateId) -> Self {
        self.cart_id = Some(cart_id);
        self
    }

    pub fn with_coupon(mut self, coupon: Option<AppliedCoupon>) -> Self {
        self.coupon = coupon;
        self
    }

    pub fn with_billing_address(mut self, billing_address: Option<Address>) -> Self {
        self.billing_address = billing_address;
        self
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes.filter(|n| !n.trim().is_empty());
        self
    }
}

/// Administrative status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub to: OrderStatus,
    pub tracking_number: Option<String>,
    pub reason: Option<String>,
}

impl StatusUpdate {
    pub fn to(status: OrderStatus) -> Self {
        Self {
            to: status,
            tracking_number: None,
            reason: None,
        }
    }

    pub fn with_tracking_number(mut self, tracking_number: impl Into<String>) -> Self {
        self.tracking_number = Some(tracking_number.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}
