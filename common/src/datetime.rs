//! Date and time utilities.

#[cfg(feature = "postgres")]
use std::error::Error as StdError;
use std::{cmp::Ordering, hash, marker::PhantomData, ops, time::Duration};

use derive_more::{Debug, Display, Error, From};
#[cfg(feature = "postgres")]
use postgres_types::{
    accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql, Type,
};
use time::{format_description::well_known::Rfc3339, UtcOffset};

/// Moment in time without any particular meaning attached.
pub type DateTime = DateTimeOf;

/// Moment in time (in UTC, with a microsecond precision) tagged with the
/// event it marks.
///
/// The `Of` tag prevents mixing up moments of different events, e.g. passing
/// a confirmation moment of a booking where its creation one is expected.
/// [`DateTimeOf::coerce()`] re-tags a moment explicitly.
#[derive(Debug)]
pub struct DateTimeOf<Of: ?Sized = ()> {
    /// Underlying UTC moment, truncated to microseconds.
    inner: time::OffsetDateTime,

    /// Tag of the marked event.
    #[debug(skip)]
    _of: PhantomData<Of>,
}

impl<Of: ?Sized> DateTimeOf<Of> {
    /// Wraps the provided moment, converting it to UTC and truncating it to
    /// the microseconds Postgres is able to store.
    fn truncated(
        moment: time::OffsetDateTime,
    ) -> Result<Self, time::error::ComponentRange> {
        let utc = moment.to_offset(UtcOffset::UTC);
        utc.replace_microsecond(utc.microsecond()).map(|inner| Self {
            inner,
            _of: PhantomData,
        })
    }

    /// Returns the current moment.
    #[expect(clippy::missing_panics_doc, reason = "infallible")]
    #[must_use]
    pub fn now() -> Self {
        Self::truncated(time::OffsetDateTime::now_utc())
            .expect("microseconds of a valid moment are always in range")
    }

    /// Returns the moment `timestamp` seconds after the Unix epoch.
    ///
    /// [`None`] is returned if the `timestamp` is out of the supported range.
    #[must_use]
    pub fn from_unix_timestamp(timestamp: i64) -> Option<Self> {
        time::OffsetDateTime::from_unix_timestamp(timestamp)
            .ok()
            .map(|inner| Self {
                inner,
                _of: PhantomData,
            })
    }

    /// Returns the number of whole seconds elapsed since the Unix epoch.
    #[must_use]
    pub fn unix_timestamp(&self) -> i64 {
        self.inner.unix_timestamp()
    }

    /// Parses an [RFC 3339] moment, like `2024-06-10T08:30:00Z`.
    ///
    /// # Errors
    ///
    /// If the `input` is not a valid [RFC 3339] moment.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    pub fn from_rfc3339(input: &str) -> Result<Self, ParseError> {
        let moment = time::OffsetDateTime::parse(input, &Rfc3339)?;
        Ok(Self::truncated(moment)?)
    }

    /// Formats this moment as an [RFC 3339] string in UTC.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    #[expect(clippy::missing_panics_doc, reason = "infallible")]
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        self.inner
            .format(&Rfc3339)
            .expect("UTC moments within `time` range are RFC 3339 compatible")
    }

    /// Re-tags this moment as marking another event.
    #[must_use]
    pub fn coerce<NewOf: ?Sized>(self) -> DateTimeOf<NewOf> {
        DateTimeOf {
            inner: self.inner,
            _of: PhantomData,
        }
    }
}

/// Error of parsing a [`DateTime`].
#[derive(Clone, Copy, Debug, Display, Error, From)]
pub enum ParseError {
    /// Input is not an [RFC 3339] moment.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    #[display("malformed RFC 3339 moment: {_0}")]
    Malformed(time::error::Parse),

    /// Moment is out of the supported range.
    #[display("moment out of range: {_0}")]
    OutOfRange(time::error::ComponentRange),
}

impl<Of: ?Sized> Copy for DateTimeOf<Of> {}
impl<Of: ?Sized> Clone for DateTimeOf<Of> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Of: ?Sized> Eq for DateTimeOf<Of> {}
impl<Of: ?Sized> PartialEq for DateTimeOf<Of> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<Of: ?Sized> hash::Hash for DateTimeOf<Of> {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.inner.hash(state);
    }
}

impl<Of: ?Sized> Ord for DateTimeOf<Of> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.cmp(&other.inner)
    }
}
impl<Of: ?Sized> PartialOrd for DateTimeOf<Of> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<Of: ?Sized> TryFrom<time::OffsetDateTime> for DateTimeOf<Of> {
    type Error = time::error::ComponentRange;

    fn try_from(moment: time::OffsetDateTime) -> Result<Self, Self::Error> {
        Self::truncated(moment)
    }
}

impl<Of: ?Sized> From<DateTimeOf<Of>> for time::OffsetDateTime {
    fn from(moment: DateTimeOf<Of>) -> Self {
        moment.inner
    }
}

impl<Of: ?Sized> ops::Add<Duration> for DateTimeOf<Of> {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self {
            inner: self.inner + rhs,
            _of: PhantomData,
        }
    }
}

impl<Of: ?Sized> ops::Sub<Duration> for DateTimeOf<Of> {
    type Output = Self;

    fn sub(self, rhs: Duration) -> Self::Output {
        Self {
            inner: self.inner - rhs,
            _of: PhantomData,
        }
    }
}

#[cfg(feature = "postgres")]
impl<Of: ?Sized> FromSql<'_> for DateTimeOf<Of> {
    accepts!(TIMESTAMPTZ);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        Ok(Self::truncated(time::OffsetDateTime::from_sql(ty, raw)?)?)
    }
}

#[cfg(feature = "postgres")]
impl<Of: ?Sized> ToSql for DateTimeOf<Of> {
    accepts!(TIMESTAMPTZ);
    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        w: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        self.inner.to_sql(ty, w)
    }
}

#[cfg(feature = "serde")]
pub mod serde {
    //! [`serde`] representations of [`DateTimeOf`].

    pub mod unix_timestamp {
        //! [`DateTimeOf`] represented as whole seconds since the Unix epoch,
        //! like the `exp` claim of a [JWT].
        //!
        //! [`DateTimeOf`]: super::super::DateTimeOf
        //! [JWT]: https://datatracker.ietf.org/doc/html/rfc7519

        use serde::{de::Error as _, Deserialize as _, Deserializer, Serializer};

        use crate::DateTimeOf;

        /// Serializes the provided moment as a Unix timestamp.
        ///
        /// # Errors
        ///
        /// If the `serializer` fails.
        pub fn serialize<Of, S>(
            moment: &DateTimeOf<Of>,
            serializer: S,
        ) -> Result<S::Ok, S::Error>
        where
            Of: ?Sized,
            S: Serializer,
        {
            serializer.serialize_i64(moment.unix_timestamp())
        }

        /// Deserializes a moment from a Unix timestamp.
        ///
        /// # Errors
        ///
        /// If the timestamp is not an integer or is out of range.
        pub fn deserialize<'de, Of, D>(
            deserializer: D,
        ) -> Result<DateTimeOf<Of>, D::Error>
        where
            Of: ?Sized,
            D: Deserializer<'de>,
        {
            let timestamp = i64::deserialize(deserializer)?;
            DateTimeOf::from_unix_timestamp(timestamp).ok_or_else(|| {
                D::Error::custom(format!("timestamp out of range: {timestamp}"))
            })
        }
    }
}

#[cfg(feature = "juniper")]
mod juniper {
    //! [`juniper`] scalar of a [`DateTime`].
    //!
    //! [`DateTime`]: crate::DateTime

    use juniper::{graphql_scalar, InputValue, ScalarValue, Value};

    /// Moment in time in [RFC 3339] format, with a microsecond precision.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    #[graphql_scalar(with = Self, parse_token(String))]
    type DateTime = crate::DateTime;

    impl DateTime {
        fn to_output<S: ScalarValue>(moment: &DateTime) -> Value<S> {
            Value::scalar(moment.to_rfc3339())
        }

        fn from_input<S: ScalarValue>(
            input: &InputValue<S>,
        ) -> Result<Self, String> {
            let s = input.as_string_value().ok_or_else(|| {
                format!("Expected `DateTime` string, found: {input}")
            })?;
            Self::from_rfc3339(s)
                .map_err(|e| format!("Invalid `DateTime` \"{s}\": {e}"))
        }
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use super::DateTime;

    #[test]
    fn normalizes_to_utc() {
        let moment = DateTime::from_rfc3339("2024-06-10T10:30:00+02:00").unwrap();

        assert_eq!(moment.to_rfc3339(), "2024-06-10T08:30:00Z");
        assert_eq!(
            moment,
            DateTime::from_unix_timestamp(moment.unix_timestamp()).unwrap(),
        );
    }

    #[test]
    fn truncates_to_microseconds() {
        let moment =
            DateTime::from_rfc3339("2024-06-10T08:30:00.123456789Z").unwrap();

        assert_eq!(moment.to_rfc3339(), "2024-06-10T08:30:00.123456Z");
    }

    #[test]
    fn shifts_by_durations() {
        let moment = DateTime::from_rfc3339("2024-06-10T08:30:00Z").unwrap();
        let later = moment + Duration::from_secs(48 * 60 * 60);

        assert_eq!(later.to_rfc3339(), "2024-06-12T08:30:00Z");
        assert_eq!(later - Duration::from_secs(48 * 60 * 60), moment);
        assert!(later > moment);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(DateTime::from_rfc3339("2024-06-10").is_err());
        assert!(DateTime::from_rfc3339("10.06.2024 08:30").is_err());
    }
}
