//! Monetary amounts as integer minor-currency units.
//!
//! All prices and totals are carried as whole cents (`Cents`) to avoid
//! floating-point rounding. Amounts only touch floating point at the edge,
//! when an admin submits a price in major units.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Currency code used when a book does not specify one.
pub const DEFAULT_CURRENCY: &str = "COP";

/// An amount of money in minor-currency units (cents).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Cents(pub i64);

impl Cents {
    /// Zero amount.
    pub const ZERO: Self = Self(0);

    /// Convert a price expressed in major units (e.g. `19.99`) to cents,
    /// rounding to the nearest cent: `19.99` → `1999`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_major(valor: f64) -> Self {
        Self((valor * 100.0).round() as i64)
    }

    /// Multiply a unit price by a quantity, failing on overflow.
    #[must_use]
    pub fn checked_total(self, cantidad: u32) -> Option<Self> {
        self.0.checked_mul(i64::from(cantidad)).map(Self)
    }

    /// True for amounts below zero. Prices must never be negative.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Decimal rendering in major units, two fraction digits.
    #[must_use]
    pub fn formatted(self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        format!("{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Cents {
    fn from(cents: i64) -> Self {
        Self(cents)
    }
}
