//! The totals engine shared by carts and orders.
//!
//! [`compute_totals`] is a pure function of line items, an optional discount
//! rule and a [`PricingPolicy`]. Every derived amount is rounded half-up to
//! the cent where it is produced, so the identity
//! `total == subtotal + tax + shipping - discount` holds exactly.

use common::Money;
use serde::{Deserialize, Serialize};

use crate::coupon::DiscountRule;

/// Tax and shipping constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPolicy {
    /// Flat tax rate in basis points (800 = 8%).
    pub tax_rate_bps: u32,
    /// Subtotals at or above this ship free.
    pub free_shipping_threshold: Money,
    /// Shipping charged below the threshold.
    pub flat_shipping: Money,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            tax_rate_bps: 800,
            free_shipping_threshold: Money::from_dollars(50),
            flat_shipping: Money::from_cents(999),
        }
    }
}

impl PricingPolicy {
    pub fn shipping_for(&self, subtotal: Money) -> Money {
        if subtotal >= self.free_shipping_threshold {
            Money::zero()
        } else {
            self.flat_shipping
        }
    }

    pub fn tax_for(&self, subtotal: Money) -> Money {
        subtotal.scale_bps(self.tax_rate_bps)
    }
}

/// Anything priced per unit and counted.
pub trait PricedLine {
    fn unit_price(&self) -> Money;
    fn quantity(&self) -> u32;

    fn line_total(&self) -> Money {
        self.unit_price().multiply(self.quantity())
    }
}

/// Derived amounts for a set of line items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: Money,
    pub tax_amount: Money,
    pub shipping_amount: Money,
    pub discount_amount: Money,
    pub total: Money,
    pub item_count: u32,
}

/// Computes the totals for `lines` under `policy`.
///
/// A discount never exceeds `subtotal + tax + shipping`, so the total is
/// never negative. No lines means all-zero totals, shipping included.
pub fn compute_totals<'a, L, I>(
    lines: I,
    discount: Option<&DiscountRule>,
    policy: &PricingPolicy,
) -> Totals
where
    L: PricedLine + 'a,
    I: IntoIterator<Item = &'a L>,
{
    let (subtotal, item_count) = lines
        .into_iter()
        .fold((Money::zero(), 0u32), |(sum, count), line| {
            (sum + line.line_total(), count + line.quantity())
        });

    let tax_amount = policy.tax_for(subtotal);
    // Nothing to ship for an empty cart.
    let shipping_amount = if item_count == 0 {
        Money::zero()
    } else {
        policy.shipping_for(subtotal)
    };

    let raw_discount = match discount {
        Some(DiscountRule::Percentage(percent)) => subtotal.percent(*percent),
        Some(DiscountRule::Fixed(amount)) => *amount,
        Some(DiscountRule::FreeShipping) => shipping_amount,
        None => Money::zero(),
    };
    let gross = subtotal + tax_amount + shipping_amount;
    let discount_amount = raw_discount.clamp_to(gross);

    Totals {
        subtotal,
        tax_amount,
        shipping_amount,
        discount_amount,
        total: gross - discount_amount,
        item_count,
    }
}
