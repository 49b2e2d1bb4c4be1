//! Macros for defining kind enums.

/// Defines a fieldless enum of kinds, stored as a small integer.
///
/// Generated enum is printed and parsed in `SCREAMING_SNAKE_CASE`, and is
/// stored as `INT2` in Postgres when the `postgres` feature is enabled.
///
/// # Example
///
/// ```rust
/// # use common::define_kind;
/// define_kind! {
///     #[doc = "Grip size."]
///     enum Grip {
///         #[doc = "Undersize grip."]
///         Undersize = 1,
///
///         #[doc = "Midsize grip."]
///         Midsize = 2,
///     }
/// }
///
/// assert_eq!(Grip::from_u8(2), Some(Grip::Midsize));
/// assert_eq!(Grip::Undersize.to_string(), "UNDERSIZE");
/// ```
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_kind {
    (
        #[doc = $doc:literal]
        enum $name:ident {
            $(
                #[doc = $variant_doc:literal]
                $variant:ident = $value:literal
            ),* $(,)?
        }
    ) => {
        #[derive(
            Clone,
            Copy,
            Debug,
            $crate::private::strum::Display,
            $crate::private::strum::EnumString,
            Eq,
            Hash,
            PartialEq,
        )]
        #[cfg_attr(
            feature = "serde",
            derive(
                $crate::private::serde::Deserialize,
                $crate::private::serde::Serialize,
            ),
            serde(rename_all = "SCREAMING_SNAKE_CASE"),
        )]
        #[doc = $doc]
        #[repr(u8)]
        #[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $(
                #[doc = $variant_doc]
                $variant = $value,
            )*
        }

        impl $name {
            /// All the variants, in their declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),*];

            /// Returns the stored [`u8`] code of this kind.
            #[must_use]
            pub const fn u8(self) -> u8 {
                self as u8
            }

            /// Looks up the kind stored as the provided [`u8`] `code`.
            #[must_use]
            pub const fn from_u8(code: u8) -> Option<Self> {
                match code {
                    $( $value => Some(Self::$variant), )*
                    _ => None,
                }
            }
        }

        #[cfg(feature = "postgres")]
        impl<'a> $crate::private::postgres_types::FromSql<'a> for $name {
            $crate::private::postgres_types::accepts!(INT2);

            fn from_sql(
                ty: &$crate::private::postgres_types::Type,
                raw: &[u8],
            ) -> Result<
                Self,
                ::std::boxed::Box<
                    dyn ::std::error::Error
                        + ::core::marker::Sync
                        + ::core::marker::Send
                >,
            > {
                let code = i16::from_sql(ty, raw)?;
                u8::try_from(code)
                    .ok()
                    .and_then(Self::from_u8)
                    .ok_or_else(|| ::std::format!(
                        "unknown `{}` code: {code}",
                        ::core::stringify!($name),
                    ).into())
            }
        }

        #[cfg(feature = "postgres")]
        impl $crate::private::postgres_types::ToSql for $name {
            $crate::private::postgres_types::accepts!(INT2);
            $crate::private::postgres_types::to_sql_checked!();

            fn to_sql(
                &self,
                ty: &$crate::private::postgres_types::Type,
                w: &mut $crate::private::postgres_types::private::BytesMut,
            ) -> Result<
                $crate::private::postgres_types::IsNull,
                ::std::boxed::Box<
                    dyn ::std::error::Error
                        + ::core::marker::Sync
                        + ::core::marker::Send
                >,
            > {
                i16::from(self.u8()).to_sql(ty, w)
            }
        }
    };
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    define_kind! {
        #[doc = "Shaft material."]
        enum Shaft {
            #[doc = "Steel shaft."]
            Steel = 1,

            #[doc = "Graphite shaft."]
            Graphite = 2,
        }
    }

    #[test]
    fn round_trips_stored_codes() {
        for kind in Shaft::ALL {
            assert_eq!(Shaft::from_u8(kind.u8()), Some(*kind));
        }
        assert_eq!(Shaft::from_u8(0), None);
        assert_eq!(Shaft::from_u8(3), None);
    }

    #[test]
    fn uses_screaming_snake_case() {
        assert_eq!(Shaft::Graphite.to_string(), "GRAPHITE");
        assert_eq!(Shaft::from_str("STEEL").unwrap(), Shaft::Steel);
        assert!(Shaft::from_str("steel").is_err());
    }
}
