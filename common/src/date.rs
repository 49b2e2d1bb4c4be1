//! Calendar date utilities.

#[cfg(feature = "postgres")]
use std::error::Error as StdError;
use std::{fmt, str::FromStr};

#[cfg(feature = "postgres")]
use postgres_types::{
    accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql, Type,
};
use time::format_description::well_known::Iso8601;

use crate::DateTimeOf;

/// Number of seconds in a day.
const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Calendar date (without a time zone), interpreted in UTC.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Date(time::Date);

impl Date {
    /// Returns the current [`Date`] in UTC.
    #[must_use]
    pub fn today() -> Self {
        Self(time::OffsetDateTime::now_utc().date())
    }

    /// Creates a new [`Date`] from the provided calendar components.
    ///
    /// [`None`] is returned if the components don't form a valid date.
    #[must_use]
    pub fn from_ymd(year: i32, month: u8, day: u8) -> Option<Self> {
        let month = time::Month::try_from(month).ok()?;
        time::Date::from_calendar_date(year, month, day).ok().map(Self)
    }

    /// Returns the [`Date`] the provided moment falls on (in UTC).
    #[must_use]
    pub fn of<Of: ?Sized>(moment: DateTimeOf<Of>) -> Self {
        Self(time::OffsetDateTime::from(moment).date())
    }

    /// Returns the number of whole days from this [`Date`] to the `other`
    /// one (negative if `other` is earlier).
    #[must_use]
    pub fn days_until(self, other: Self) -> i64 {
        (other.0 - self.0).whole_days()
    }

    /// Returns the number of whole days (rounded down) between the provided
    /// `moment` and the beginning (00:00 UTC) of this [`Date`].
    ///
    /// Negative if this [`Date`] has already started.
    #[must_use]
    pub fn days_after<Of: ?Sized>(self, moment: DateTimeOf<Of>) -> i64 {
        let diff =
            self.0.midnight().assume_utc() - time::OffsetDateTime::from(moment);
        diff.whole_seconds().div_euclid(SECONDS_PER_DAY)
    }

    /// Returns the moment this [`Date`] begins (00:00 UTC).
    #[expect(clippy::missing_panics_doc, reason = "infallible")]
    #[must_use]
    pub fn start<Of: ?Sized>(self) -> DateTimeOf<Of> {
        self.0
            .midnight()
            .assume_utc()
            .try_into()
            .expect("infallible")
    }

    /// Returns this [`Date`] shifted by the provided number of `days`.
    ///
    /// [`None`] is returned on overflow.
    #[must_use]
    pub fn checked_add_days(self, days: i64) -> Option<Self> {
        self.0.checked_add(time::Duration::days(days)).map(Self)
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.0.format(&Iso8601::DATE).map_err(|_| fmt::Error)?;
        f.write_str(&s)
    }
}

impl FromStr for Date {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        time::Date::parse(s, &Iso8601::DATE)
            .map(Self)
            .map_err(|_| "invalid `Date`, expected `YYYY-MM-DD` format")
    }
}

impl From<time::Date> for Date {
    fn from(date: time::Date) -> Self {
        Self(date)
    }
}

impl From<Date> for time::Date {
    fn from(date: Date) -> Self {
        date.0
    }
}

#[cfg(feature = "postgres")]
impl FromSql<'_> for Date {
    accepts!(DATE);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        time::Date::from_sql(ty, raw).map(Self)
    }
}

#[cfg(feature = "postgres")]
impl ToSql for Date {
    accepts!(DATE);
    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        w: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        self.0.to_sql(ty, w)
    }
}

#[cfg(feature = "juniper")]
mod juniper {
    //! Module providing integration with [`juniper`] crate.

    use std::str::FromStr as _;

    use juniper::{graphql_scalar, InputValue, ScalarValue, Value};

    /// Calendar date in a `YYYY-MM-DD` format.
    #[graphql_scalar(with = Self, parse_token(String))]
    type Date = super::Date;

    impl Date {
        fn to_output<S: ScalarValue>(d: &Date) -> Value<S> {
            Value::scalar(d.to_string())
        }

        fn from_input<S: ScalarValue>(
            input: &InputValue<S>,
        ) -> Result<Self, String> {
            input
                .as_string_value()
                .ok_or_else(|| {
                    format!(
                        "Cannot parse `Date` input scalar from \
                         non-string value: {input}",
                    )
                })
                .and_then(|s| {
                    Self::from_str(s).map_err(|e| {
                        format!("Cannot parse `Date` input scalar: {e}")
                    })
                })
        }
    }
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use crate::DateTime;

    use super::Date;

    fn moment(s: &str) -> DateTime {
        DateTime::from_rfc3339(s).unwrap()
    }

    #[test]
    fn parses_and_prints_iso_dates() {
        let date = Date::from_str("2024-06-03").unwrap();
        assert_eq!(date, Date::from_ymd(2024, 6, 3).unwrap());
        assert_eq!(date.to_string(), "2024-06-03");

        assert!(Date::from_str("2024-13-01").is_err());
        assert!(Date::from_str("03.06.2024").is_err());
    }

    #[test]
    fn counts_days_between_dates() {
        let start = Date::from_ymd(2024, 6, 3).unwrap();
        let end = Date::from_ymd(2024, 6, 12).unwrap();

        assert_eq!(start.days_until(end), 9);
        assert_eq!(end.days_until(start), -9);
        assert_eq!(start.checked_add_days(9), Some(end));
    }

    #[test]
    fn rounds_days_after_moment_down() {
        let date = Date::from_ymd(2024, 6, 10).unwrap();

        assert_eq!(date.days_after(moment("2024-06-08T10:00:00Z")), 1);
        assert_eq!(date.days_after(moment("2024-06-08T00:00:00Z")), 2);
        assert_eq!(date.days_after(moment("2024-06-10T00:00:00Z")), 0);
        assert_eq!(date.days_after(moment("2024-06-10T08:00:00Z")), -1);
    }

    #[test]
    fn starts_at_midnight() {
        let date = Date::from_ymd(2024, 6, 10).unwrap();

        assert_eq!(date.start::<()>(), moment("2024-06-10T00:00:00Z"));
        assert_eq!(Date::of(moment("2024-06-10T23:59:59Z")), date);
    }
}
