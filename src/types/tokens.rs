use crate::error::{OcmonError, Result};
use serde::Serialize;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Token counts for one interaction, or a sum of many.
///
/// The total is never stored; [`TokenUsage::total`] recomputes it from the
/// four categories on every call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct TokenUsage {
    pub input: u64,
    pub output: u64,
    pub cache_write: u64,
    pub cache_read: u64,
}

impl TokenUsage {
    pub const ZERO: TokenUsage = TokenUsage::new(0, 0, 0, 0);

    /// Create from counts that are already known to be non-negative
    pub const fn new(input: u64, output: u64, cache_write: u64, cache_read: u64) -> Self {
        Self {
            input,
            output,
            cache_write,
            cache_read,
        }
    }

    /// Create from signed counts as they appear in raw records.
    ///
    /// Fails with [`OcmonError::Validation`] naming the first negative field,
    /// or `tokens.total` when the four counts do not fit in a `u64` together.
    pub fn try_new(input: i64, output: i64, cache_write: i64, cache_read: i64) -> Result<Self> {
        let usage = Self {
            input: non_negative("tokens.input", input)?,
            output: non_negative("tokens.output", output)?,
            cache_write: non_negative("tokens.cache_write", cache_write)?,
            cache_read: non_negative("tokens.cache_read", cache_read)?,
        };
        usage.checked_total().ok_or_else(|| {
            OcmonError::validation(
                "tokens.total",
                format!("{input} + {output} + {cache_write} + {cache_read}"),
            )
        })?;
        Ok(usage)
    }

    /// Sum of all four categories, saturating at `u64::MAX`
    #[inline]
    pub fn total(&self) -> u64 {
        self.input
            .saturating_add(self.output)
            .saturating_add(self.cache_write)
            .saturating_add(self.cache_read)
    }

    pub fn checked_total(&self) -> Option<u64> {
        self.input
            .checked_add(self.output)?
            .checked_add(self.cache_write)?
            .checked_add(self.cache_read)
    }

    /// Tokens occupying the context window: everything except output
    #[inline]
    pub fn context_size(&self) -> u64 {
        self.input
            .saturating_add(self.cache_write)
            .saturating_add(self.cache_read)
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.total() == 0
    }
}

fn non_negative(field: &'static str, value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| OcmonError::validation(field, value))
}

// Saturates per field so summing many large records cannot panic or wrap
impl Add for TokenUsage {
    type Output = TokenUsage;

    fn add(self, rhs: TokenUsage) -> TokenUsage {
        TokenUsage {
            input: self.input.saturating_add(rhs.input),
            output: self.output.saturating_add(rhs.output),
            cache_write: self.cache_write.saturating_add(rhs.cache_write),
            cache_read: self.cache_read.saturating_add(rhs.cache_read),
        }
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: TokenUsage) {
        *self = *self + rhs;
    }
}

impl Sum for TokenUsage {
    fn sum<I: Iterator<Item = TokenUsage>>(iter: I) -> Self {
        iter.fold(TokenUsage::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a TokenUsage> for TokenUsage {
    fn sum<I: Iterator<Item = &'a TokenUsage>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_is_sum_of_fields() {
        let usage = TokenUsage::new(1000, 500, 200, 300);
        assert_eq!(usage.total(), 2000);
        assert_eq!(usage.context_size(), 1500);
        assert!(TokenUsage::default().is_zero());
    }

    #[test]
    fn test_try_new_rejects_negative_counts() {
        assert_eq!(
            TokenUsage::try_new(10, 20, 30, 40).unwrap(),
            TokenUsage::new(10, 20, 30, 40)
        );

        let err = TokenUsage::try_new(10, -1, 0, 0).unwrap_err();
        match err {
            OcmonError::Validation { field, value } => {
                assert_eq!(field, "tokens.output");
                assert_eq!(value, "-1");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(TokenUsage::try_new(0, 0, 0, -7).is_err());
    }

    #[test]
    fn test_addition_is_additive_on_total() {
        let a = TokenUsage::new(1, 2, 3, 4);
        let b = TokenUsage::new(10, 20, 30, 40);
        assert_eq!((a + b).total(), a.total() + b.total());
        assert_eq!(a + b, b + a);

        let c = TokenUsage::new(100, 0, 7, 0);
        assert_eq!((a + b) + c, a + (b + c));
    }

    #[test]
    fn test_sum_and_add_assign() {
        let parts = [
            TokenUsage::new(1, 1, 1, 1),
            TokenUsage::new(2, 0, 0, 5),
            TokenUsage::new(0, 3, 0, 0),
        ];
        let summed: TokenUsage = parts.iter().sum();
        assert_eq!(summed, TokenUsage::new(3, 4, 1, 6));

        let mut acc = TokenUsage::ZERO;
        for part in parts {
            acc += part;
        }
        assert_eq!(acc, summed);

        let empty: TokenUsage = std::iter::empty::<TokenUsage>().sum();
        assert_eq!(empty.total(), 0);
    }

    #[test]
    fn test_try_new_rejects_overflowing_total() {
        let err = TokenUsage::try_new(i64::MAX, i64::MAX, i64::MAX, 0).unwrap_err();
        assert!(matches!(err, OcmonError::Validation { field: "tokens.total", .. }));

        let big = TokenUsage::try_new(i64::MAX, i64::MAX, 0, 0).unwrap();
        assert_eq!(big.total(), u64::MAX - 1);
        assert_eq!(big.checked_total(), Some(u64::MAX - 1));
    }

    #[test]
    fn test_large_sums_saturate() {
        let big = TokenUsage::try_new(i64::MAX, 0, 0, 0).unwrap();
        let summed: TokenUsage = [big, big, big].iter().sum();
        assert_eq!(summed.input, u64::MAX);
        assert_eq!(summed.total(), u64::MAX);

        let wide = TokenUsage::new(u64::MAX, u64::MAX, u64::MAX, u64::MAX);
        assert_eq!(wide.total(), u64::MAX);
        assert_eq!(wide.context_size(), u64::MAX);
        assert_eq!(wide.checked_total(), None);
        assert!(!wide.is_zero());
    }
}
