//! [`Database`]-related implementations.

#[cfg(test)]
mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use derive_more::{Display, Error as StdError, From};

#[cfg(test)]
pub use self::memory::Memory;
#[cfg(feature = "postgres")]
pub use self::postgres::Postgres;

/// Database operation.
pub use common::Handler as Database;

/// [`Database`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    #[cfg(feature = "postgres")]
    /// [`Postgres`] error.
    Postgres(postgres::Error),
}

impl Error {
    /// Checks whether this [`Error`] is a violation of the provided unique
    /// constraint.
    #[must_use]
    pub fn is_unique_violation(&self, constraint: &str) -> bool {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(e) => e.is_unique_violation(Some(constraint)),
            #[cfg(not(feature = "postgres"))]
            _ => {
                _ = constraint;
                false
            }
        }
    }

    /// Checks whether this [`Error`] is a violation of the provided exclusion
    /// constraint.
    #[must_use]
    pub fn is_exclusion_violation(&self, constraint: &str) -> bool {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(e) => e.is_exclusion_violation(Some(constraint)),
            #[cfg(not(feature = "postgres"))]
            _ => {
                _ = constraint;
                false
            }
        }
    }
}
