//! GraphQL scalar definitions.

use std::{fmt, marker::PhantomData, str::FromStr};

use juniper::{
    GraphQLType, InputValue, ParseScalarResult, ParseScalarValue, ScalarToken,
    ScalarValue, Value,
};

/// Strategy for `#[graphql(with = ..)]` attribute, representing a newtype
/// over a domain type `As` as a GraphQL string.
///
/// The string is produced by the [`Display`] impl of `As` and parsed back by
/// its [`FromStr`] impl, so the domain type stays the only place validating
/// its values. The newtype must implement [`AsRef`] and [`TryFrom`] for `As`.
///
/// [`Display`]: fmt::Display
#[derive(Debug)]
pub struct Via<As>(PhantomData<As>);

impl<As> Via<As> {
    /// Outputs the provided `value` as a GraphQL string.
    pub fn to_output<T, S>(value: &T) -> Value<S>
    where
        As: fmt::Display,
        T: AsRef<As>,
        S: ScalarValue,
    {
        Value::from(value.as_ref().to_string())
    }

    /// Parses the provided GraphQL `input` string.
    ///
    /// # Errors
    ///
    /// If the `input` is not a string, or the domain type rejects it.
    pub fn from_input<T, S>(input: &InputValue<S>) -> Result<T, String>
    where
        As: FromStr,
        As::Err: fmt::Display,
        T: TryFrom<As> + GraphQLType<S, TypeInfo = ()>,
        T::Error: fmt::Display,
        S: ScalarValue,
    {
        let name = T::name(&()).unwrap_or("String");
        let raw = input
            .as_string_value()
            .ok_or_else(|| format!("Expected `{name}` string, found: {input}"))?;
        raw.parse::<As>()
            .map_err(|e| format!("Invalid `{name}` \"{raw}\": {e}"))?
            .try_into()
            .map_err(|e| format!("Invalid `{name}` \"{raw}\": {e}"))
    }

    /// Parses the provided [`ScalarToken`] as a string.
    ///
    /// # Errors
    ///
    /// If the token is not a string.
    pub fn parse_token<S: ScalarValue>(
        value: ScalarToken<'_>,
    ) -> ParseScalarResult<S> {
        <String as ParseScalarValue<S>>::from_str(value)
    }
}
