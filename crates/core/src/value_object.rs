//! Value object trait: equality by value, not identity.
//!
//! Value objects are domain objects that have **no identity** - they are defined entirely
//! by their attribute values. Two value objects with the same values are considered equal.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// build a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// Non-negative monetary amount in the smallest currency unit (cents).
///
/// Parsed from and displayed as a two-digit decimal (`"2.75"`). Never exceeds
/// [`Money::MAX`], so every amount fits a signed 64-bit store column; arithmetic
/// saturates at that bound instead of wrapping.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl ValueObject for Money {}

impl Money {
    pub const ZERO: Money = Money(0);
    pub const MAX: Money = Money(i64::MAX as u64);

    /// Clamped to [`Money::MAX`].
    pub fn from_cents(cents: u64) -> Self {
        Self(cents.min(Self::MAX.0))
    }

    pub fn cents(self) -> u64 {
        self.0
    }

    /// Amount for `quantity` units at this price.
    pub fn times(self, quantity: i64) -> Money {
        let quantity = u64::try_from(quantity).unwrap_or(0);
        Money::from_cents(self.0.saturating_mul(quantity))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money::from_cents(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl FromStr for Money {
    type Err = DomainError;

    /// Accepts `"12"`, `"12.5"`, `"12.50"` and the comma form `"12,50"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if raw.is_empty() {
            return Err(DomainError::validation("price cannot be empty"));
        }
        if raw.starts_with('-') {
            return Err(DomainError::validation("price cannot be negative"));
        }

        let normalized = raw.replace(',', ".");
        let (whole, frac) = match normalized.split_once('.') {
            Some((w, f)) => (w, f),
            None => (normalized.as_str(), ""),
        };

        let digits_only = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if whole.is_empty() || !digits_only(whole) || !digits_only(frac) {
            return Err(DomainError::validation(format!("invalid price: {raw}")));
        }
        if frac.len() > 2 {
            return Err(DomainError::validation(format!(
                "price has more than two decimal places: {raw}"
            )));
        }

        let whole: u64 = whole
            .parse()
            .map_err(|_| DomainError::validation(format!("price out of range: {raw}")))?;
        let cents = match frac.len() {
            0 => 0,
            1 => frac.parse::<u64>().unwrap_or(0) * 10,
            _ => frac.parse::<u64>().unwrap_or(0),
        };

        whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(cents))
            .filter(|c| *c <= Self::MAX.0)
            .map(Money)
            .ok_or_else(|| DomainError::validation(format!("price out of range: {raw}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_forms() {
        assert_eq!("2.75".parse::<Money>().unwrap(), Money::from_cents(275));
        assert_eq!("2.5".parse::<Money>().unwrap(), Money::from_cents(250));
        assert_eq!("3".parse::<Money>().unwrap(), Money::from_cents(300));
        assert_eq!(" 0,99 ".parse::<Money>().unwrap(), Money::from_cents(99));
    }

    #[test]
    fn rejects_bad_input() {
        for bad in ["", "-1", "1.234", "abc", ".5", "1.2.3", "1e3"] {
            assert!(
                matches!(bad.parse::<Money>(), Err(DomainError::Validation(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn displays_two_decimals() {
        assert_eq!(Money::from_cents(4125).to_string(), "41.25");
        assert_eq!(Money::from_cents(7).to_string(), "0.07");
    }

    #[test]
    fn times_multiplies_by_quantity() {
        assert_eq!(Money::from_cents(275).times(15), Money::from_cents(4125));
        assert_eq!(Money::from_cents(275).times(-1), Money::ZERO);
    }

    #[test]
    fn sum_saturates() {
        let total: Money = [Money::MAX, Money::from_cents(1)].into_iter().sum();
        assert_eq!(total, Money::MAX);
        assert_eq!(Money::MAX.times(3), Money::MAX);
    }

    #[test]
    fn capped_at_signed_64_bit_cents() {
        assert_eq!(Money::MAX.cents(), i64::MAX as u64);
        assert_eq!(Money::from_cents(u64::MAX), Money::MAX);
        assert_eq!("92233720368547758.07".parse::<Money>().unwrap(), Money::MAX);
        assert!(matches!(
            "92233720368547758.08".parse::<Money>(),
            Err(DomainError::Validation(_))
        ));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn display_parses_back(cents in 0u64..10_000_000_000) {
                let money = Money::from_cents(cents);
                prop_assert_eq!(money.to_string().parse::<Money>().unwrap(), money);
            }
        }
    }
}
