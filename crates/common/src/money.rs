use serde::{Deserialize, Serialize};

/// Basis points in one whole (100%).
pub const BPS_SCALE: u32 = 10_000;

/// A monetary amount in minor units (cents).
///
/// All arithmetic is integer arithmetic. Fractional results (tax, percentage
/// discounts) are rounded half-up to the nearest cent at the point they are
/// produced. Addition, subtraction and multiplication saturate at the `i64`
/// bounds rather than overflowing.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn from_dollars(dollars: i64) -> Self {
        Self(dollars.saturating_mul(100))
    }

    pub const fn zero() -> Self {
        Self(0)
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies by a line quantity.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money(self.0.saturating_mul(i64::from(quantity)))
    }

    /// Returns `bps` basis points of this amount, rounded half-up (away from
    /// zero on exact halves).
    pub fn scale_bps(&self, bps: u32) -> Money {
        let raw = i128::from(self.0) * i128::from(bps);
        let scale = i128::from(BPS_SCALE);
        let half = scale / 2;
        let rounded = if raw >= 0 {
            (raw + half) / scale
        } else {
            (raw - half) / scale
        };
        let bound = if raw >= 0 { i64::MAX } else { i64::MIN };
        Money(i64::try_from(rounded).unwrap_or(bound))
    }

    /// Returns `percent`% of this amount, rounded half-up.
    pub fn percent(&self, percent: u32) -> Money {
        self.scale_bps(percent.saturating_mul(100))
    }

    /// Clamps the amount into `[zero, max]`.
    pub fn clamp_to(&self, max: Money) -> Money {
        Money(self.0.min(max.0).max(0))
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}${}.{:02}", abs / 100, abs % 100)
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Money {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl std::ops::SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_sub(rhs.0);
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}
