//! Order aggregate implementation.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use common::{AggregateId, UserId};
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::coupon::AppliedCoupon;
use crate::pricing::{PricingPolicy, Totals, compute_totals};

use super::{
    Address, OrderError, OrderEvent, OrderLine, OrderNumber, OrderStatus, PaymentIntentRef,
    PaymentMethod, PaymentStatus, PlaceOrder, StatusUpdate,
    events::{OrderPlacedData, OrderStatusChangedData, PaymentStatusChangedData},
};

/// Order aggregate root.
///
/// An order is born whole from [`place`](Order::place); afterwards only its
/// fulfilment and payment status move. Lines and totals never change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Order {
    id: Option<AggregateId>,

    #[serde(default)]
    version: Version,

    order_number: Option<OrderNumber>,
    user_id: Option<UserId>,
    cart_id: Option<AggregateId>,
    lines: Vec<OrderLine>,
    coupon: Option<AppliedCoupon>,
    totals: Totals,
    shipping_address: Option<Address>,
    billing_address: Option<Address>,
    payment_method: Option<PaymentMethod>,
    notes: Option<String>,

    status: OrderStatus,
    payment_status: PaymentStatus,
    payment_intent: Option<PaymentIntentRef>,
    /// Last payment setup failure, cleared once an intent exists.
    payment_setup_error: Option<String>,
    tracking_number: Option<String>,
    cancellation_reason: Option<String>,

    placed_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    shipped_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    refunded_at: Option<DateTime<Utc>>,
}

impl Aggregate for Order {
    type Event = OrderEvent;
    type Error = OrderError;

    fn aggregate_type() -> &'static str {
        "Order"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            OrderEvent::OrderPlaced(data) => self.apply_placed(*data),
            OrderEvent::OrderStatusChanged(data) => self.apply_status_changed(data),
            OrderEvent::PaymentIntentCreated(data) => {
                self.payment_intent = Some(data.intent);
                self.payment_setup_error = None;
                self.updated_at = Some(data.created_at);
            }
            OrderEvent::PaymentSetupFailed(data) => {
                self.payment_setup_error = Some(data.reason);
                self.updated_at = Some(data.failed_at);
            }
            OrderEvent::PaymentStatusChanged(data) => self.apply_payment_status_changed(data),
        }
    }
}

// Query methods
impl Order {
    pub fn order_number(&self) -> Option<&OrderNumber> {
        self.order_number.as_ref()
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn cart_id(&self) -> Option<AggregateId> {
        self.cart_id
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn coupon(&self) -> Option<&AppliedCoupon> {
        self.coupon.as_ref()
    }

    pub fn totals(&self) -> &Totals {
        &self.totals
    }

    pub fn shipping_address(&self) -> Option<&Address> {
        self.shipping_address.as_ref()
    }

    pub fn billing_address(&self) -> Option<&Address> {
        self.billing_address.as_ref()
    }

    pub fn payment_method(&self) -> Option<PaymentMethod> {
        self.payment_method
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn payment_intent(&self) -> Option<&PaymentIntentRef> {
        self.payment_intent.as_ref()
    }

    pub fn payment_setup_error(&self) -> Option<&str> {
        self.payment_setup_error.as_deref()
    }

    pub fn tracking_number(&self) -> Option<&str> {
        self.tracking_number.as_deref()
    }

    pub fn cancellation_reason(&self) -> Option<&str> {
        self.cancellation_reason.as_deref()
    }

    pub fn placed_at(&self) -> Option<DateTime<Utc>> {
        self.placed_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn shipped_at(&self) -> Option<DateTime<Utc>> {
        self.shipped_at
    }

    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.delivered_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    pub fn refunded_at(&self) -> Option<DateTime<Utc>> {
        self.refunded_at
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == Some(user_id)
    }

    pub fn can_be_cancelled(&self) -> bool {
        self.status.can_be_cancelled_by_customer()
    }

    /// Refunds apply to orders that were paid and have left the warehouse
    /// or are about to.
    pub fn can_be_refunded(&self) -> bool {
        matches!(
            self.status,
            OrderStatus::Processing | OrderStatus::Shipped | OrderStatus::Delivered
        ) && self.payment_status == PaymentStatus::Paid
    }

    /// True while the order still waits for a payment intent.
    pub fn needs_payment_setup(&self) -> bool {
        self.payment_method
            .is_some_and(|method| method.requires_payment_intent())
            && self.payment_intent.is_none()
            && matches!(self.status, OrderStatus::Pending | OrderStatus::Confirmed)
    }
}

// Command methods (return events)
impl Order {
    /// Places the order. Totals are recomputed from the lines and coupon.
    pub fn place(
        &self,
        cmd: PlaceOrder,
        pricing: &PricingPolicy,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        if self.id.is_some() {
            return Err(OrderError::AlreadyPlaced);
        }
        if cmd.lines.is_empty() {
            return Err(OrderError::NoItems);
        }

        let mut seen = HashSet::with_capacity(cmd.lines.len());
        for line in &cmd.lines {
            if line.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    product_id: line.product_id,
                    quantity: line.quantity,
                });
            }
            if !seen.insert(line.product_id) {
                return Err(OrderError::DuplicateProduct(line.product_id));
            }
        }

        cmd.shipping_address.validate()?;
        let billing_address = cmd
            .billing_address
            .unwrap_or_else(|| cmd.shipping_address.clone());
        billing_address.validate()?;

        let totals = compute_totals(
            &cmd.lines,
            cmd.coupon.as_ref().map(|c| &c.rule),
            pricing,
        );
        let placed_at = Utc::now();

        Ok(vec![OrderEvent::placed(OrderPlacedData {
            order_id: cmd.order_id,
            order_number: OrderNumber::generate(placed_at),
            user_id: cmd.user_id,
            cart_id: cmd.cart_id,
            lines: cmd.lines,
            coupon: cmd.coupon,
            totals,
            shipping_address: cmd.shipping_address,
            billing_address,
            payment_method: cmd.payment_method,
            notes: cmd.notes,
            placed_at,
        })])
    }

    /// Moves the order along the transition table.
    pub fn transition(&self, update: StatusUpdate) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_placed()?;

        if !self.status.can_transition_to(update.to) {
            return Err(OrderError::InvalidStatusTransition {
                from: self.status,
                to: update.to,
            });
        }

        Ok(vec![OrderEvent::status_changed(
            self.status,
            update.to,
            update.tracking_number,
            update.reason,
        )])
    }

    /// Cancellation requested by the customer who owns the order.
    pub fn cancel_by_customer(&self, reason: Option<String>) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_placed()?;

        if !self.can_be_cancelled() {
            return Err(OrderError::InvalidStatusTransition {
                from: self.status,
                to: OrderStatus::Cancelled,
            });
        }

        Ok(vec![OrderEvent::status_changed(
            self.status,
            OrderStatus::Cancelled,
            None,
            reason,
        )])
    }

    pub fn record_payment_intent(
        &self,
        intent: PaymentIntentRef,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_placed()?;
        if !self.needs_payment_setup() {
            return Err(OrderError::PaymentSetupNotNeeded);
        }
        Ok(vec![OrderEvent::payment_intent_created(intent)])
    }

    pub fn record_payment_setup_failure(
        &self,
        reason: impl Into<String>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_placed()?;
        if !self.needs_payment_setup() {
            return Err(OrderError::PaymentSetupNotNeeded);
        }
        Ok(vec![OrderEvent::payment_setup_failed(reason)])
    }

    /// Records a payment status reported by the processor or an admin.
    /// Setting the current status again is a no-op.
    pub fn record_payment_status(
        &self,
        status: PaymentStatus,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_placed()?;

        if status == self.payment_status {
            return Ok(vec![]);
        }
        if !self.payment_status.can_transition_to(status) {
            return Err(OrderError::InvalidPaymentTransition {
                from: self.payment_status,
                to: status,
            });
        }

        Ok(vec![OrderEvent::payment_status_changed(
            self.payment_status,
            status,
        )])
    }

    fn ensure_placed(&self) -> Result<(), OrderError> {
        match self.id {
            Some(_) => Ok(()),
            None => Err(OrderError::NotPlaced),
        }
    }
}

// Apply event helpers
impl Order {
    fn apply_placed(&mut self, data: OrderPlacedData) {
        self.id = Some(data.order_id);
        self.order_number = Some(data.order_number);
        self.user_id = Some(data.user_id);
        self.cart_id = data.cart_id;
        self.lines = data.lines;
        self.coupon = data.coupon;
        self.totals = data.totals;
        self.shipping_address = Some(data.shipping_address);
        self.billing_address = Some(data.billing_address);
        self.payment_method = Some(data.payment_method);
        self.notes = data.notes;
        self.status = OrderStatus::Pending;
        self.payment_status = PaymentStatus::Pending;
        self.placed_at = Some(data.placed_at);
        self.updated_at = Some(data.placed_at);
    }

    fn apply_status_changed(&mut self, data: OrderStatusChangedData) {
        self.status = data.to;
        self.updated_at = Some(data.changed_at);

        match data.to {
            OrderStatus::Shipped => {
                self.shipped_at = Some(data.changed_at);
                if data.tracking_number.is_some() {
                    self.tracking_number = data.tracking_number;
                }
            }
            OrderStatus::Delivered => self.delivered_at = Some(data.changed_at),
            OrderStatus::Cancelled => {
                self.cancelled_at = Some(data.changed_at);
                self.cancellation_reason = data.reason;
            }
            OrderStatus::Refunded => self.refunded_at = Some(data.changed_at),
            _ => {}
        }
    }

    fn apply_payment_status_changed(&mut self, data: PaymentStatusChangedData) {
        self.payment_status = data.to;
        self.updated_at = Some(data.changed_at);
    }
}
