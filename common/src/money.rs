//! [`Money`]-related definitions.

use std::{fmt, str::FromStr};

use derive_more::{Display, Error};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::{define_kind, Percent};

/// Number of decimal places in a cent-precise amount.
const CENT_SCALE: u32 = 2;

/// Amount of money in some [`Currency`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Money {
    /// Amount of this [`Money`].
    pub amount: Decimal,

    /// [`Currency`] of this amount.
    pub currency: Currency,
}

impl Money {
    /// Creates a zero [`Money`] amount in the provided [`Currency`].
    #[must_use]
    pub const fn zero(currency: Currency) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency,
        }
    }

    /// Rounds this [`Money`] to cents, rounding half-up.
    #[must_use]
    pub fn round_to_cents(self) -> Self {
        Self {
            amount: round_to_cents(self.amount),
            currency: self.currency,
        }
    }

    /// Returns the provided [`Percent`] of this [`Money`], rounded to cents.
    #[must_use]
    pub fn percent(self, percent: Percent) -> Self {
        Self {
            amount: round_to_cents(percent.of(self.amount)),
            currency: self.currency,
        }
    }

    /// Indicates whether this [`Money`] amount is less than zero.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }

    /// Indicates whether this [`Money`] amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }
}

/// Rounds the provided `amount` to cents, rounding half-up.
#[must_use]
pub fn round_to_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(
        CENT_SCALE,
        RoundingStrategy::MidpointAwayFromZero,
    )
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} {}", self.amount, self.currency)
    }
}

/// Error of parsing [`Money`] from a string.
#[derive(Clone, Debug, Display, Error)]
pub enum ParseError {
    /// No three-letter [`Currency`] code follows the amount.
    #[display("missing currency code")]
    MissingCurrency,

    /// Amount is not a decimal number.
    #[display("invalid amount: {_0}")]
    InvalidAmount(rust_decimal::Error),

    /// [`Currency`] code is not a supported one.
    #[display("unsupported currency: {_0}")]
    UnknownCurrency(#[error(not(source))] String),
}

impl FromStr for Money {
    type Err = ParseError;

    /// Parses an amount followed by a [`Currency`] code, like `123.45 USD`.
    ///
    /// The space between them is optional.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .len()
            .checked_sub(3)
            .filter(|&at| s.is_char_boundary(at))
            .ok_or(ParseError::MissingCurrency)?;
        let (amount, code) = s.split_at(split);
        if !code.bytes().all(|b| b.is_ascii_alphabetic()) {
            return Err(ParseError::MissingCurrency);
        }

        Ok(Self {
            amount: amount.trim_end().parse().map_err(ParseError::InvalidAmount)?,
            currency: code
                .parse()
                .map_err(|_| ParseError::UnknownCurrency(code.to_owned()))?,
        })
    }
}

define_kind! {
    #[doc = "Currency of a [`Money`] amount."]
    enum Currency {
        #[doc = "US Dollar."]
        Usd = 1,

        #[doc = "Euro."]
        Eur = 2,

        #[doc = "Pound Sterling."]
        Gbp = 3,

        #[doc = "Canadian Dollar."]
        Cad = 4,
    }
}

#[cfg(feature = "juniper")]
mod juniper {
    //! [`juniper`] scalar of a [`Money`].
    //!
    //! [`Money`]: super::Money

    use juniper::{graphql_scalar, InputValue, ScalarValue, Value};

    /// Amount of money followed by its three-letter currency code, like
    /// `123.45 USD`.
    #[graphql_scalar(with = Self, parse_token(String))]
    type Money = super::Money;

    impl Money {
        fn to_output<S: ScalarValue>(money: &Money) -> Value<S> {
            Value::scalar(money.to_string())
        }

        fn from_input<S: ScalarValue>(
            input: &InputValue<S>,
        ) -> Result<Self, String> {
            let s = input.as_string_value().ok_or_else(|| {
                format!("Expected `Money` string, found: {input}")
            })?;
            s.parse().map_err(|e| format!("Invalid `Money` \"{s}\": {e}"))
        }
    }
}

#[cfg(test)]
mod spec {
    use rust_decimal::Decimal;

    use crate::Percent;

    use super::{Currency, Money, ParseError};

    fn money(amount: &str, currency: Currency) -> Money {
        Money {
            amount: amount.parse::<Decimal>().unwrap(),
            currency,
        }
    }

    #[test]
    fn parses_amount_with_currency_code() {
        assert_eq!(
            "123.45 USD".parse::<Money>().unwrap(),
            money("123.45", Currency::Usd),
        );
        assert_eq!(
            "80GBP".parse::<Money>().unwrap(),
            money("80", Currency::Gbp),
        );
        assert_eq!(
            " 0.5 CAD ".parse::<Money>().unwrap(),
            money("0.5", Currency::Cad),
        );
    }

    #[test]
    fn rejects_malformed_money() {
        assert!(matches!(
            "123.45".parse::<Money>(),
            Err(ParseError::MissingCurrency),
        ));
        assert!(matches!(
            "US".parse::<Money>(),
            Err(ParseError::MissingCurrency),
        ));
        assert!(matches!(
            "12,5 EUR".parse::<Money>(),
            Err(ParseError::InvalidAmount(_)),
        ));
        assert!(matches!(
            "12 RUB".parse::<Money>(),
            Err(ParseError::UnknownCurrency(c)) if c == "RUB",
        ));
        assert!(matches!(
            "12 usd".parse::<Money>(),
            Err(ParseError::UnknownCurrency(_)),
        ));
    }

    #[test]
    fn displays_cents() {
        assert_eq!(money("610", Currency::Usd).to_string(), "610.00 USD");
        assert_eq!(money("73.2", Currency::Eur).to_string(), "73.20 EUR");
        assert_eq!(money("0.05", Currency::Cad).to_string(), "0.05 CAD");
    }

    #[test]
    fn rounds_half_up_to_cents() {
        let usd = |s| money(s, Currency::Usd);

        assert_eq!(usd("17.985").round_to_cents(), usd("17.99"));
        assert_eq!(usd("17.984").round_to_cents(), usd("17.98"));
        assert_eq!(usd("0.005").round_to_cents(), usd("0.01"));
        assert!(usd("-0.004").round_to_cents().is_zero());
    }

    #[test]
    fn takes_percent() {
        let usd = |s| money(s, Currency::Usd);
        let percent = |s: &str| s.parse::<Percent>().unwrap();

        assert_eq!(usd("610").percent(percent("12")), usd("73.20"));
        assert_eq!(usd("627.99").percent(percent("50")), usd("314.00"));
        assert_eq!(usd("0").percent(percent("2.9")), usd("0"));
    }
}
