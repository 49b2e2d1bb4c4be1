//! [`Percent`]-related definitions.

use std::str::FromStr;

use derive_more::{Display, Error};
use rust_decimal::Decimal;

/// Percentage in the `0..=100` range, with an arbitrary fractional part.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[display("{_0}%")]
pub struct Percent(Decimal);

impl Percent {
    /// Zero [`Percent`].
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Fifty [`Percent`].
    pub const HALF: Self = Self(Decimal::from_parts(50, 0, 0, false, 0));

    /// One hundred [`Percent`].
    pub const FULL: Self = Self(Decimal::ONE_HUNDRED);

    /// Creates a new [`Percent`] if the provided `value` is within the
    /// `0..=100` range.
    #[must_use]
    pub fn new(value: Decimal) -> Option<Self> {
        (Decimal::ZERO..=Decimal::ONE_HUNDRED)
            .contains(&value)
            .then_some(Self(value))
    }

    /// Creates a new [`Percent`] without checking its range.
    ///
    /// # Safety
    ///
    /// The provided `value` must be within the `0..=100` range.
    #[expect(unsafe_code, reason = "unchecked constructor")]
    #[must_use]
    pub const unsafe fn new_unchecked(value: Decimal) -> Self {
        Self(value)
    }

    /// Returns this [`Percent`] of the provided `value`, without rounding.
    #[must_use]
    pub fn of(self, value: Decimal) -> Decimal {
        value * self.0 / Decimal::ONE_HUNDRED
    }
}

/// Error of parsing a [`Percent`].
#[derive(Clone, Copy, Debug, Display, Error)]
pub enum ParseError {
    /// Input is not a decimal number.
    #[display("not a number")]
    NotANumber,

    /// Number is out of the `0..=100` range.
    #[display("out of `0..=100` range")]
    OutOfRange,
}

impl FromStr for Percent {
    type Err = ParseError;

    /// Parses a decimal number, optionally followed by a `%` sign.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let number = s.trim().trim_end_matches('%').trim_end();
        let value =
            Decimal::from_str(number).map_err(|_| ParseError::NotANumber)?;
        Self::new(value).ok_or(ParseError::OutOfRange)
    }
}

#[cfg(test)]
mod spec {
    use rust_decimal::Decimal;

    use super::{ParseError, Percent};

    fn decimal(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn parses_within_range() {
        assert_eq!("0".parse::<Percent>().unwrap(), Percent::ZERO);
        assert_eq!("50%".parse::<Percent>().unwrap(), Percent::HALF);
        assert_eq!("100 %".parse::<Percent>().unwrap(), Percent::FULL);
        assert_eq!("2.9".parse::<Percent>().unwrap().to_string(), "2.9%");

        assert!(matches!(
            "-1".parse::<Percent>(),
            Err(ParseError::OutOfRange),
        ));
        assert!(matches!(
            "100.01".parse::<Percent>(),
            Err(ParseError::OutOfRange),
        ));
        assert!(matches!(
            "twelve".parse::<Percent>(),
            Err(ParseError::NotANumber),
        ));
    }

    #[test]
    fn takes_share_of_value() {
        let twelve = "12".parse::<Percent>().unwrap();

        assert_eq!(twelve.of(decimal("610")), decimal("73.2"));
        assert_eq!(Percent::HALF.of(decimal("10")), decimal("5"));
        assert_eq!(Percent::FULL.of(decimal("627.99")), decimal("627.99"));
        assert_eq!(Percent::ZERO.of(decimal("627.99")), Decimal::ZERO);
    }

    #[test]
    fn orders_by_value() {
        assert!(Percent::ZERO < Percent::HALF);
        assert!(Percent::HALF < Percent::FULL);
    }
}
