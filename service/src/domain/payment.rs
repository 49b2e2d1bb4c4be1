//! Payment-related definitions.

use std::str::FromStr;

use derive_more::{AsRef, Display};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};

/// Reference to a payment intent (a charge or a hold) created by the payment
/// processor.
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[as_ref(forward)]
pub struct IntentId(String);

impl IntentId {
    /// Creates a new [`IntentId`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `id` was issued by the payment
    /// processor.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

/// Reference to a payer's payment method stored by the payment processor
/// (a tokenized card, for example).
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(forward)]
pub struct MethodRef(String);

impl MethodRef {
    /// Creates a new [`MethodRef`] if the given `reference` is valid.
    #[must_use]
    pub fn new(reference: impl Into<String>) -> Option<Self> {
        let reference = reference.into();
        Self::check(&reference).then_some(Self(reference))
    }

    /// Checks whether the given `reference` is a valid [`MethodRef`].
    fn check(reference: impl AsRef<str>) -> bool {
        let reference = reference.as_ref();
        !reference.is_empty()
            && reference.len() <= 255
            && reference
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    }
}

impl FromStr for MethodRef {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `MethodRef`")
    }
}
