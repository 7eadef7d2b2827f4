use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// A newtype wrapper for cost values in USD.
///
/// Backed by a decimal so that summing thousands of per-interaction costs
/// accumulates no rounding error; rounding only happens in display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Cost(Decimal);

impl Cost {
    pub const ZERO: Cost = Cost(Decimal::ZERO);

    /// Create a new Cost from a raw value
    #[inline]
    pub fn new(value: Decimal) -> Self {
        Cost(value)
    }

    /// Get the raw value
    #[inline]
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Round half away from zero to cents
    pub fn round_to_cents(&self) -> Decimal {
        self.0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Format as currency string (e.g., "$1.23")
    pub fn to_formatted_string(&self) -> String {
        let rounded = self.round_to_cents();
        // Avoid "$-0.00"
        let rounded = if rounded.is_zero() { Decimal::ZERO } else { rounded };
        format!("${:.2}", rounded)
    }

    /// Check if the cost is positive (greater than half a cent)
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::new(5, 3)
    }

    /// Share of `quota` consumed, in percent, capped at 100.
    ///
    /// `None` when the quota is zero or negative.
    pub fn percentage_of(&self, quota: Cost) -> Option<Decimal> {
        if quota.0 <= Decimal::ZERO {
            return None;
        }
        let percentage = self.0.checked_div(quota.0)? * Decimal::ONE_HUNDRED;
        Some(percentage.min(Decimal::ONE_HUNDRED))
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_formatted_string())
    }
}

impl From<Decimal> for Cost {
    fn from(value: Decimal) -> Self {
        Cost(value)
    }
}

impl From<Cost> for Decimal {
    fn from(cost: Cost) -> Self {
        cost.0
    }
}

impl Add for Cost {
    type Output = Cost;

    fn add(self, rhs: Cost) -> Cost {
        Cost(self.0 + rhs.0)
    }
}

impl AddAssign for Cost {
    fn add_assign(&mut self, rhs: Cost) {
        self.0 += rhs.0;
    }
}

impl Sum for Cost {
    fn sum<I: Iterator<Item = Cost>>(iter: I) -> Self {
        iter.fold(Cost::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Cost> for Cost {
    fn sum<I: Iterator<Item = &'a Cost>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn cost(s: &str) -> Cost {
        Cost::new(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn test_cost_formatting() {
        assert_eq!(cost("1.234").to_formatted_string(), "$1.23");
        assert_eq!(cost("0.0").to_formatted_string(), "$0.00");
        assert_eq!(cost("-0.001").to_formatted_string(), "$0.00");
        assert_eq!(cost("0.004").to_formatted_string(), "$0.00");
        assert_eq!(cost("0.005").to_formatted_string(), "$0.01");
        assert_eq!(cost("100.999").to_formatted_string(), "$101.00");
        assert_eq!(cost("7.5").to_formatted_string(), "$7.50");
    }

    #[test]
    fn test_cost_zero_checks() {
        assert!(!Cost::ZERO.is_positive());
        assert!(!cost("0.005").is_positive());
        assert!(cost("0.006").is_positive());
        assert!(cost("1.0").is_positive());
    }

    #[test]
    fn test_cost_display() {
        assert_eq!(format!("{}", cost("42.42")), "$42.42");
    }

    #[test]
    fn test_sum_is_exact() {
        // 0.1 added ten thousand times stays exact in decimal
        let total: Cost = std::iter::repeat_n(cost("0.1"), 10_000).sum();
        assert_eq!(total, cost("1000"));
    }

    #[test]
    fn test_percentage_of_quota() {
        assert_eq!(
            cost("2.50").percentage_of(cost("10")),
            Some(Decimal::from(25))
        );
        assert_eq!(
            cost("20").percentage_of(cost("10")),
            Some(Decimal::ONE_HUNDRED)
        );
        assert_eq!(cost("1").percentage_of(Cost::ZERO), None);
    }
}
