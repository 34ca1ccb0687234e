//! Coupon codes and the rules they resolve to.

use std::collections::HashMap;
use std::sync::Arc;

use common::Money;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a coupon reduces an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum DiscountRule {
    /// Whole-number percentage of the subtotal.
    Percentage(u32),
    /// Flat amount off the order.
    Fixed(Money),
    /// Offsets the computed shipping charge.
    #[serde(rename = "shipping")]
    FreeShipping,
}

/// A coupon that passed resolution and is attached to a cart or order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedCoupon {
    /// Normalized (uppercase) code.
    pub code: String,
    pub rule: DiscountRule,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CouponError {
    #[error("coupon code is empty")]
    Empty,

    #[error("unknown coupon code {code}")]
    Unknown { code: String },

    #[error("coupon {code} requires a subtotal of at least {minimum}, cart has {subtotal}")]
    BelowMinimum {
        code: String,
        minimum: Money,
        subtotal: Money,
    },
}

/// Source of coupon definitions.
pub trait CouponBook: Send + Sync {
    /// Looks up an already-normalized code.
    fn lookup(&self, code: &str) -> Option<DiscountRule>;
}

/// Fixed in-memory coupon table.
#[derive(Debug, Clone)]
pub struct StaticCouponBook {
    codes: HashMap<String, DiscountRule>,
}

impl StaticCouponBook {
    pub fn empty() -> Self {
        Self {
            codes: HashMap::new(),
        }
    }

    pub fn with_code(mut self, code: &str, rule: DiscountRule) -> Self {
        self.codes.insert(normalize(code), rule);
        self
    }
}

impl Default for StaticCouponBook {
    fn default() -> Self {
        Self::empty()
            .with_code("SAVE10", DiscountRule::Percentage(10))
            .with_code("SAVE20", DiscountRule::Percentage(20))
            .with_code("FREESHIP", DiscountRule::FreeShipping)
            .with_code("SAVE5", DiscountRule::Fixed(Money::from_dollars(5)))
    }
}

impl CouponBook for StaticCouponBook {
    fn lookup(&self, code: &str) -> Option<DiscountRule> {
        self.codes.get(code).copied()
    }
}

fn normalize(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Validates submitted codes against a [`CouponBook`].
#[derive(Clone)]
pub struct CouponResolver {
    book: Arc<dyn CouponBook>,
    percentage_minimum: Money,
}

impl CouponResolver {
    /// Subtotal a cart needs before a percentage coupon applies.
    pub const DEFAULT_PERCENTAGE_MINIMUM: Money = Money::from_dollars(25);

    pub fn new(book: Arc<dyn CouponBook>) -> Self {
        Self {
            book,
            percentage_minimum: Self::DEFAULT_PERCENTAGE_MINIMUM,
        }
    }

    pub fn with_percentage_minimum(mut self, minimum: Money) -> Self {
        self.percentage_minimum = minimum;
        self
    }

    /// Resolves `code` for a cart with the given subtotal.
    ///
    /// Codes are case-insensitive.
    pub fn resolve(&self, code: &str, subtotal: Money) -> Result<AppliedCoupon, CouponError> {
        let code = normalize(code);
        if code.is_empty() {
            return Err(CouponError::Empty);
        }

        let rule = self
            .book
            .lookup(&code)
            .ok_or_else(|| CouponError::Unknown { code: code.clone() })?;

        if matches!(rule, DiscountRule::Percentage(_)) && subtotal < self.percentage_minimum {
            return Err(CouponError::BelowMinimum {
                code,
                minimum: self.percentage_minimum,
                subtotal,
            });
        }

        Ok(AppliedCoupon { code, rule })
    }
}

impl Default for CouponResolver {
    fn default() -> Self {
        Self::new(Arc::new(StaticCouponBook::default()))
    }
}

impl std::fmt::Debug for CouponResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CouponResolver")
            .field("percentage_minimum", &self.percentage_minimum)
            .finish_non_exhaustive()
    }
}
