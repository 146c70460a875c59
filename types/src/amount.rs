//! Stake amounts.
//!
//! Amounts are fixed-point integers (u128) to avoid floating-point errors.
//! The smallest unit is 1 raw; [`UNIT`] raw units make one whole token ("1.0").

use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw units per whole token (18 implied decimal places).
pub const UNIT: u128 = 1_000_000_000_000_000_000;

/// A bonded value, stored as raw units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Self = Self(0);

    pub fn new(raw: u128) -> Self {
        Self(raw)
    }

    /// Whole tokens to raw units. Saturates at `u128::MAX`.
    pub fn from_units(units: u128) -> Self {
        Self(units.saturating_mul(UNIT))
    }

    pub fn raw(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / UNIT;
        let frac = self.0 % UNIT;
        if frac == 0 {
            write!(f, "{whole}")
        } else {
            let digits = format!("{frac:018}");
            write!(f, "{whole}.{}", digits.trim_end_matches('0'))
        }
    }
}

/// Saturates at `u128::MAX`. Ledger accounting uses `checked_add` instead.
impl std::iter::Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, a| Self(acc.0.saturating_add(a.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_whole_and_fractional() {
        assert_eq!(Amount::from_units(2).to_string(), "2");
        assert_eq!(Amount::new(UNIT / 2).to_string(), "0.5");
        assert_eq!(Amount::new(UNIT + 1).to_string(), "1.000000000000000001");
    }

    #[test]
    fn checked_sub_underflow() {
        assert_eq!(Amount::new(1).checked_sub(Amount::new(2)), None);
        assert_eq!(Amount::new(3).checked_sub(Amount::new(2)), Some(Amount::new(1)));
    }
}
