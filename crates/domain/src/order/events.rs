//! Order domain events.

use chrono::{DateTime, Utc};
use common::{AggregateId, UserId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::coupon::AppliedCoupon;
use crate::pricing::Totals;

use super::{Address, OrderLine, OrderNumber, OrderStatus, PaymentIntentRef, PaymentMethod, PaymentStatus};

/// Events that can occur on an order aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// Order was placed from a cart.
    OrderPlaced(Box<OrderPlacedData>),

    /// Fulfilment status moved along the transition table.
    OrderStatusChanged(OrderStatusChangedData),

    /// The payment processor accepted a payment intent.
    PaymentIntentCreated(PaymentIntentCreatedData),

    /// The payment processor could not set up payment.
    PaymentSetupFailed(PaymentSetupFailedData),

    /// Payment status was updated.
    PaymentStatusChanged(PaymentStatusChangedData),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "OrderPlaced",
            OrderEvent::OrderStatusChanged(_) => "OrderStatusChanged",
            OrderEvent::PaymentIntentCreated(_) => "PaymentIntentCreated",
            OrderEvent::PaymentSetupFailed(_) => "PaymentSetupFailed",
            OrderEvent::PaymentStatusChanged(_) => "PaymentStatusChanged",
        }
    }
}

/// Data for OrderPlaced event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPlacedData {
    pub order_id: AggregateId,
    pub order_number: OrderNumber,
    pub user_id: UserId,
    /// Cart the order was placed from.
    pub cart_id: Option<AggregateId>,
    pub lines: Vec<OrderLine>,
    pub coupon: Option<AppliedCoupon>,
    /// Totals at placement time.
    pub totals: Totals,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub placed_at: DateTime<Utc>,
}

/// Data for OrderStatusChanged event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusChangedData {
    pub from: OrderStatus,
    pub to: OrderStatus,
    /// Carrier tracking number, given when shipping.
    pub tracking_number: Option<String>,
    pub reason: Option<String>,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntentCreatedData {
    pub intent: PaymentIntentRef,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSetupFailedData {
    pub reason: String,
    pub failed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentStatusChangedData {
    pub from: PaymentStatus,
    pub to: PaymentStatus,
    pub changed_at: DateTime<Utc>,
}

impl OrderEvent {
    pub fn placed(data: OrderPlacedData) -> Self {
        OrderEvent::OrderPlaced(Box::new(data))
    }

    pub fn status_changed(
        from: OrderStatus,
        to: OrderStatus,
        tracking_number: Option<String>,
        reason: Option<String>,
    ) -> Self {
        OrderEvent::OrderStatusChanged(OrderStatusChangedData {
            from,
            to,
            tracking_number,
            reason,
            changed_at: Utc::now(),
        })
    }

    pub fn payment_intent_created(intent: PaymentIntentRef) -> Self {
        OrderEvent::PaymentIntentCreated(PaymentIntentCreatedData {
            intent,
            created_at: Utc::now(),
        })
    }

    pub fn payment_setup_failed(reason: impl Into<String>) -> Self {
        OrderEvent::PaymentSetupFailed(PaymentSetupFailedData {
            reason: reason.into(),
            failed_at: Utc::now(),
        })
    }

    pub fn payment_status_changed(from: PaymentStatus, to: PaymentStatus) -> Self {
        OrderEvent::PaymentStatusChanged(PaymentStatusChangedData {
            from,
            to,
            changed_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_change_wire_format() {
        let event = OrderEvent::status_changed(
            OrderStatus::Processing,
            OrderStatus::Shipped,
            Some("1Z999".into()),
            None,
        );
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "OrderStatusChanged");
        assert_eq!(json["data"]["from"], "processing");
        assert_eq!(json["data"]["to"], "shipped");
        assert_eq!(json["data"]["tracking_number"], "1Z999");
        assert_eq!(event.event_type(), "OrderStatusChanged");
    }

    #[test]
    fn test_payment_events_roundtrip() {
        let event = OrderEvent::payment_status_changed(PaymentStatus::Pending, PaymentStatus::Paid);
        let json = serde_json::to_string(&event).unwrap();
        let back: OrderEvent = serde_json::from_str(&json).unwrap();

        match back {
            OrderEvent::PaymentStatusChanged(data) => {
                assert_eq!(data.from, PaymentStatus::Pending);
                assert_eq!(data.to, PaymentStatus::Paid);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
