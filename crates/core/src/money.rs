//! Money value object.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_object::ValueObject;

/// A non-negative currency amount in the smallest unit (cents).
///
/// Two-decimal display precision falls out of the cents representation;
/// there is no floating point anywhere in a price path. Arithmetic is
/// checked: totals are computed once at purchase time and an overflow is a
/// domain error, never a wrap.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Total for `quantity` units priced at `self`, or an error on overflow.
    pub fn total_for(self, quantity: u64) -> Result<Money, DomainError> {
        self.0
            .checked_mul(quantity)
            .map(Money)
            .ok_or_else(|| DomainError::validation("total price overflows"))
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    pub fn saturating_add(self, other: Money) -> Money {
        Money(self.0.saturating_add(other.0))
    }
}

impl ValueObject for Money {}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_with_two_decimals() {
        assert_eq!(Money::from_cents(200).to_string(), "$2.00");
        assert_eq!(Money::from_cents(1999).to_string(), "$19.99");
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
        assert_eq!(Money::ZERO.to_string(), "$0.00");
    }

    #[test]
    fn total_for_multiplies_unit_price() {
        let unit = Money::from_cents(200);
        assert_eq!(unit.total_for(3).unwrap(), Money::from_cents(600));
        assert_eq!(unit.total_for(0).unwrap(), Money::ZERO);
    }

    #[test]
    fn total_for_rejects_overflow() {
        let unit = Money::from_cents(u64::MAX);
        assert!(unit.total_for(2).is_err());
    }

    #[test]
    fn equality_is_by_value() {
        assert_eq!(Money::from_cents(150), Money::from_cents(150));
        assert!(Money::from_cents(100) < Money::from_cents(101));
    }
}
