//! [`Rating`] definitions.

use std::str::FromStr;

use common::money::round_to_cents;
use derive_more::{Display, From, Into};
use rust_decimal::Decimal;

use crate::domain::{listing, user};

/// Aggregated rating of a rated target (a `Listing` or a `User`).
///
/// Always derived from the full set of published review [`Score`]s, so
/// recomputing it never drifts.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Rating {
    /// Arithmetic mean of the [`Score`]s, rounded to 2 decimal places.
    ///
    /// [`None`] if nothing was rated yet.
    pub average: Option<Decimal>,

    /// Total number of [`Score`]s this [`Rating`] is aggregated from.
    pub total: u32,
}

impl Rating {
    /// Aggregates the provided [`Score`]s into a new [`Rating`].
    #[must_use]
    pub fn aggregate(scores: impl IntoIterator<Item = Score>) -> Self {
        let (sum, total) = scores
            .into_iter()
            .fold((Decimal::ZERO, 0_u32), |(sum, total), score| {
                (sum + Decimal::from(score.get()), total.saturating_add(1))
            });
        Self {
            average: (total > 0)
                .then(|| round_to_cents(sum / Decimal::from(total))),
            total,
        }
    }
}

/// Target of a [`Rating`].
#[derive(Clone, Copy, Debug, Display, Eq, From, Hash, PartialEq)]
pub enum Target {
    /// `Listing` rated by its renters.
    #[display("Listing(id: {_0})")]
    Listing(listing::Id),

    /// User rated by their counterparties.
    #[display("User(id: {_0})")]
    User(user::Id),
}

/// Score in the `1..=5` range, given by a reviewer.
#[derive(
    Clone,
    Copy,
    Debug,
    Display,
    Eq,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
)]
pub struct Score(u8);

impl Score {
    /// Lowest possible [`Score`].
    pub const MIN: u8 = 1;

    /// Highest possible [`Score`].
    pub const MAX: u8 = 5;

    /// Creates a new [`Score`] if the provided `value` is in range.
    #[must_use]
    pub fn new(value: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Self(value))
    }

    /// Returns the numeric value of this [`Score`].
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl FromStr for Score {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().ok().and_then(Self::new).ok_or("invalid `Score`")
    }
}

impl TryFrom<i16> for Score {
    type Error = &'static str;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .and_then(Self::new)
            .ok_or("invalid `Score`")
    }
}

#[cfg(test)]
mod spec {
    use rust_decimal::Decimal;

    use super::{Rating, Score};

    fn scores(values: &[u8]) -> Vec<Score> {
        values.iter().map(|v| Score::new(*v).unwrap()).collect()
    }

    #[test]
    fn score_is_bounded() {
        assert!(Score::new(0).is_none());
        assert!(Score::new(1).is_some());
        assert!(Score::new(5).is_some());
        assert!(Score::new(6).is_none());
        assert!("7".parse::<Score>().is_err());
        assert_eq!("4".parse::<Score>().unwrap().get(), 4);
    }

    #[test]
    fn averages_and_rounds_scores() {
        let rating = Rating::aggregate(scores(&[5, 4, 4]));

        assert_eq!(rating.average, Some("4.33".parse::<Decimal>().unwrap()));
        assert_eq!(rating.total, 3);

        let rating = Rating::aggregate(scores(&[5, 4, 4, 4, 4, 4]));
        assert_eq!(rating.average, Some("4.17".parse::<Decimal>().unwrap()));
    }

    #[test]
    fn empty_set_has_no_average() {
        assert_eq!(
            Rating::aggregate([]),
            Rating {
                average: None,
                total: 0,
            },
        );
    }

    #[test]
    fn recomputation_is_idempotent() {
        let published = scores(&[3, 5, 4, 2]);

        let first = Rating::aggregate(published.clone());
        let second = Rating::aggregate(published);

        assert_eq!(first, second);
        assert_eq!(first.average, Some("3.5".parse::<Decimal>().unwrap()));
    }
}
