use chrono::{DateTime, Utc};
use common::{AggregateId, ProductId};
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::coupon::AppliedCoupon;
use crate::pricing::{PricingPolicy, Totals, compute_totals};

use super::{CartError, CartEvent, CartLine, CartOwner, CartPolicy};

/// Cart aggregate root.
///
/// Totals are never stored; [`Cart::totals`] derives them from the current
/// lines and coupon every time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    id: Option<AggregateId>,
    #[serde(default)]
    version: Version,
    owner: Option<CartOwner>,
    lines: Vec<CartLine>,
    coupon: Option<AppliedCoupon>,
    expires_at: Option<DateTime<Utc>>,
    active: bool,
}

impl Aggregate for Cart {
    type Event = CartEvent;
    type Error = CartError;

    fn aggregate_type() -> &'static str {
        "Cart"
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
            CartEvent::CartOpened(data) => {
                self.id = Some(data.cart_id);
                self.owner = Some(data.owner);
                self.expires_at = data.expires_at;
                self.active = true;
            }
            CartEvent::CartReopened(data) => {
                self.lines.clear();
                self.coupon = None;
                self.expires_at = data.expires_at;
                self.active = true;
            }
            CartEvent::ItemAdded(data) => self.lines.push(data.line),
            CartEvent::ItemQuantityChanged(data) => {
                if let Some(line) = self.line_mut(&data.product_id) {
                    line.quantity = data.new_quantity;
                }
            }
            CartEvent::ItemRemoved(data) => {
                self.lines.retain(|l| l.product_id != data.product_id);
            }
            CartEvent::CouponApplied(data) => self.coupon = Some(data.coupon),
            CartEvent::CouponRemoved(_) => self.coupon = None,
            CartEvent::CartCleared(_) => {
                self.lines.clear();
                self.coupon = None;
            }
            CartEvent::CartDeactivated(_) => self.active = false,
        }
    }
}

// Queries
impl Cart {
    pub fn owner(&self) -> Option<&CartOwner> {
        self.owner.as_ref()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.product_id == product_id)
    }

    pub fn coupon(&self) -> Option<&AppliedCoupon> {
        self.coupon.as_ref()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Open, active and not past its expiry.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.id.is_some() && self.active && !self.is_expired(now)
    }

    pub fn totals(&self, policy: &PricingPolicy) -> Totals {
        compute_totals(
            &self.lines,
            self.coupon.as_ref().map(|c| &c.rule),
            policy,
        )
    }

    fn line_mut(&mut self, product_id: &ProductId) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|l| &l.product_id == product_id)
    }
}

// Commands
impl Cart {
    /// Makes sure the cart exists and is usable, creating or reopening it.
    pub fn open(
        &self,
        cart_id: AggregateId,
        owner: &CartOwner,
        policy: &CartPolicy,
        now: DateTime<Utc>,
    ) -> Result<Vec<CartEvent>, CartError> {
        let expires_at = owner.is_guest().then(|| now + policy.guest_ttl);

        if self.id.is_none() {
            return Ok(vec![CartEvent::opened(cart_id, owner.clone(), expires_at, now)]);
        }
        if !self.is_usable(now) {
            return Ok(vec![CartEvent::reopened(expires_at, now)]);
        }
        Ok(vec![])
    }

    /// Opens the cart if needed, then runs `command_fn` against the opened
    /// state. The returned events include the opening ones.
    pub fn open_then<F, E>(
        &self,
        cart_id: AggregateId,
        owner: &CartOwner,
        policy: &CartPolicy,
        now: DateTime<Utc>,
        command_fn: F,
    ) -> Result<Vec<CartEvent>, E>
    where
        F: FnOnce(&Cart) -> Result<Vec<CartEvent>, E>,
        E: From<CartError>,
    {
        let mut events = self.open(cart_id, owner, policy, now)?;
        if events.is_empty() {
            return command_fn(self);
        }

        let mut opened = self.clone();
        opened.apply_events(events.iter().cloned());
        events.extend(command_fn(&opened)?);
        Ok(events)
    }

    /// Adds a line, or raises the quantity of an existing one.
    pub fn add_item(&self, line: CartLine, policy: &CartPolicy) -> Result<Vec<CartEvent>, CartError> {
        self.ensure_active()?;
        check_quantity(i64::from(line.quantity), policy)?;

        match self.line(&line.product_id) {
            Some(existing) => {
                let new_quantity = existing.quantity + line.quantity;
                check_quantity(i64::from(new_quantity), policy)?;
                Ok(vec![CartEvent::quantity_changed(
                    line.product_id,
                    existing.quantity,
                    new_quantity,
                )])
            }
            None => Ok(vec![CartEvent::item_added(line)]),
        }
    }

    /// Sets a line's quantity. Zero or less removes the line.
    pub fn update_quantity(
        &self,
        product_id: ProductId,
        quantity: i64,
        policy: &CartPolicy,
    ) -> Result<Vec<CartEvent>, CartError> {
        self.ensure_active()?;
        let existing = self
            .line(&product_id)
            .ok_or(CartError::ItemNotFound(product_id))?;

        if quantity <= 0 {
            return Ok(vec![CartEvent::item_removed(product_id)]);
        }
        let new_quantity = check_quantity(quantity, policy)?;
        if new_quantity == existing.quantity {
            return Ok(vec![]);
        }
        Ok(vec![CartEvent::quantity_changed(
            product_id,
            existing.quantity,
            new_quantity,
        )])
    }

    pub fn remove_item(&self, product_id: ProductId) -> Result<Vec<CartEvent>, CartError> {
        self.ensure_active()?;
        if self.line(&product_id).is_none() {
            return Err(CartError::ItemNotFound(product_id));
        }
        Ok(vec![CartEvent::item_removed(product_id)])
    }

    /// Attaches a resolved coupon, replacing any previous one.
    pub fn apply_coupon(&self, coupon: AppliedCoupon) -> Result<Vec<CartEvent>, CartError> {
        self.ensure_active()?;
        let replaced = self.coupon.as_ref().map(|c| c.code.clone());
        Ok(vec![CartEvent::coupon_applied(coupon, replaced)])
    }

    pub fn remove_coupon(&self) -> Result<Vec<CartEvent>, CartError> {
        self.ensure_active()?;
        Ok(self
            .coupon
            .as_ref()
            .map(|c| CartEvent::coupon_removed(c.code.clone()))
            .into_iter()
            .collect())
    }

    /// Empties the cart and drops its coupon.
    pub fn clear(&self, order_id: Option<AggregateId>) -> Result<Vec<CartEvent>, CartError> {
        self.ensure_active()?;
        Ok(vec![CartEvent::cleared(order_id)])
    }

    /// Folds another cart's lines into this one, adding quantities for
    /// products present in both. Merged quantities are capped at the maximum.
    pub fn merge_lines(
        &self,
        incoming: &[CartLine],
        policy: &CartPolicy,
    ) -> Result<Vec<CartEvent>, CartError> {
        self.ensure_active()?;
        let mut events = Vec::new();

        for line in incoming {
            match self.line(&line.product_id) {
                Some(existing) => {
                    let merged = (existing.quantity + line.quantity).min(policy.max_quantity);
                    if merged != existing.quantity {
                        events.push(CartEvent::quantity_changed(
                            line.product_id,
                            existing.quantity,
                            merged,
                        ));
                    }
                }
                None => events.push(CartEvent::item_added(CartLine {
                    quantity: line.quantity.min(policy.max_quantity),
                    ..line.clone()
                })),
            }
        }

        Ok(events)
    }

    pub fn deactivate(&self, merged_into: Option<AggregateId>) -> Result<Vec<CartEvent>, CartError> {
        self.ensure_active()?;
        Ok(vec![CartEvent::deactivated(merged_into)])
    }

    fn ensure_active(&self) -> Result<(), CartError> {
        if self.id.is_none() {
            return Err(CartError::NotOpen);
        }
        if !self.active {
            return Err(CartError::Inactive);
        }
        Ok(())
    }
}

fn check_quantity(quantity: i64, policy: &CartPolicy) -> Result<u32, CartError> {
    match u32::try_from(quantity) {
        Ok(q) if (1..=policy.max_quantity).contains(&q) => Ok(q),
        _ => Err(CartError::QuantityOutOfRange {
            quantity,
            max: policy.max_quantity,
        }),
    }
}
