//! [`Rating`]-related definitions.

use derive_more::From;
use juniper::graphql_object;
use service::domain;

use crate::Context;

/// Aggregated rating of a `Listing` or a `User`.
#[derive(Clone, Copy, Debug, From)]
pub struct Rating(domain::Rating);

/// Aggregated rating of a `Listing` or a `User`.
#[graphql_object(context = Context)]
impl Rating {
    /// Average score in the `1..=5` range, rounded to 2 decimal places.
    ///
    /// `null` if nothing was rated yet.
    #[must_use]
    pub fn average(&self) -> Option<String> {
        self.0.average.map(|avg| avg.to_string())
    }

    /// Number of published reviews this `Rating` is aggregated from.
    #[must_use]
    pub fn total(&self) -> i32 {
        i32::try_from(self.0.total).unwrap_or(i32::MAX)
    }
}
