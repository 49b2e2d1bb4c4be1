//! [`Listing`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf, Money, Percent};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{user, Rating};

/// Golf equipment offered for rent by its owner.
#[derive(Clone, Debug)]
pub struct Listing {
    /// ID of this [`Listing`].
    pub id: Id,

    /// ID of the user owning this [`Listing`].
    pub owner_id: user::Id,

    /// [`Title`] of this [`Listing`].
    pub title: Title,

    /// [`Club`] being offered.
    pub club: Club,

    /// [`Pricing`] of this [`Listing`].
    pub pricing: Pricing,

    /// [`RentalWindow`] constraints of this [`Listing`].
    pub window: RentalWindow,

    /// [`BookingMode`] of this [`Listing`].
    pub booking_mode: BookingMode,

    /// [`CancellationPolicy`] of this [`Listing`].
    pub cancellation_policy: CancellationPolicy,

    /// Indicator whether this [`Listing`] accepts new bookings.
    pub is_active: bool,

    /// Number of times this [`Listing`] was viewed.
    pub view_count: u64,

    /// Number of confirmed bookings of this [`Listing`].
    pub booking_count: u64,

    /// Aggregated [`Rating`] of this [`Listing`].
    pub rating: Rating,

    /// [`DateTime`] when this [`Listing`] was created.
    pub created_at: CreationDateTime,
}

/// ID of a [`Listing`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Title of a [`Listing`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[as_ref(forward)]
pub struct Title(String);

impl Title {
    /// Creates a new [`Title`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `title` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(title: impl Into<String>) -> Self {
        Self(title.into())
    }

    /// Creates a new [`Title`] if the given `title` is valid.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Option<Self> {
        let title = title.into();
        Self::check(&title).then_some(Self(title))
    }

    /// Checks whether the given `title` is a valid [`Title`].
    fn check(title: impl AsRef<str>) -> bool {
        let title = title.as_ref();
        title.trim() == title && !title.is_empty() && title.len() <= 128
    }
}

impl FromStr for Title {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Title`")
    }
}

/// Specification of a golf club (or a set of clubs) being rented.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Club {
    /// [`ClubKind`] of the club.
    pub kind: ClubKind,

    /// [`Brand`] of the club.
    pub brand: Brand,

    /// [`Handedness`] of the club.
    pub handedness: Handedness,

    /// Shaft [`Flex`] of the club, if applicable.
    pub flex: Option<Flex>,

    /// [`Condition`] of the club.
    pub condition: Condition,
}

/// Brand of a [`Club`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[as_ref(forward)]
pub struct Brand(String);

impl Brand {
    /// Creates a new [`Brand`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `brand` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(brand: impl Into<String>) -> Self {
        Self(brand.into())
    }

    /// Creates a new [`Brand`] if the given `brand` is valid.
    #[must_use]
    pub fn new(brand: impl Into<String>) -> Option<Self> {
        let brand = brand.into();
        Self::check(&brand).then_some(Self(brand))
    }

    /// Checks whether the given `brand` is a valid [`Brand`].
    fn check(brand: impl AsRef<str>) -> bool {
        let brand = brand.as_ref();
        brand.trim() == brand && !brand.is_empty() && brand.len() <= 64
    }
}

impl FromStr for Brand {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Brand`")
    }
}

define_kind! {
    #[doc = "Kind of a [`Club`]."]
    enum ClubKind {
        #[doc = "Complete set of clubs."]
        FullSet = 1,

        #[doc = "Driver."]
        Driver = 2,

        #[doc = "Fairway wood."]
        FairwayWood = 3,

        #[doc = "Hybrid."]
        Hybrid = 4,

        #[doc = "Set of irons."]
        Irons = 5,

        #[doc = "Wedge."]
        Wedge = 6,

        #[doc = "Putter."]
        Putter = 7,
    }
}

define_kind! {
    #[doc = "Handedness of a [`Club`]."]
    enum Handedness {
        #[doc = "Right-handed."]
        Right = 1,

        #[doc = "Left-handed."]
        Left = 2,
    }
}

define_kind! {
    #[doc = "Shaft flex of a [`Club`]."]
    enum Flex {
        #[doc = "Ladies flex."]
        Ladies = 1,

        #[doc = "Senior flex."]
        Senior = 2,

        #[doc = "Regular flex."]
        Regular = 3,

        #[doc = "Stiff flex."]
        Stiff = 4,

        #[doc = "Extra stiff flex."]
        ExtraStiff = 5,
    }
}

define_kind! {
    #[doc = "Condition of a [`Club`]."]
    enum Condition {
        #[doc = "Brand new."]
        New = 1,

        #[doc = "Barely used."]
        Excellent = 2,

        #[doc = "Used, fully functional."]
        Good = 3,

        #[doc = "Visible wear."]
        Fair = 4,
    }
}

/// Prices of renting a [`Listing`].
///
/// All the amounts share the same currency.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Pricing {
    /// Price of a single rental day.
    pub daily_rate: Money,

    /// Price of a whole rental week, if discounted.
    pub weekly_rate: Option<Money>,

    /// Deposit held (not charged) for the rental duration.
    pub security_deposit: Money,

    /// Fee of delivering the equipment, if the owner delivers.
    pub delivery_fee: Option<Money>,
}

impl Pricing {
    /// Number of days in a rental week.
    pub const DAYS_IN_WEEK: u32 = 7;

    /// Checks whether this [`Pricing`] is consistent: every amount is
    /// non-negative, rates are positive and all amounts share the currency.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let Self {
            daily_rate,
            weekly_rate,
            security_deposit,
            delivery_fee,
        } = self;

        let currency = daily_rate.currency;
        let positive = |m: &Money| m.amount > Decimal::ZERO;
        let non_negative = |m: &Money| !m.is_negative();

        positive(daily_rate)
            && weekly_rate.as_ref().map_or(true, positive)
            && non_negative(security_deposit)
            && delivery_fee.as_ref().map_or(true, non_negative)
            && [Some(security_deposit), weekly_rate.as_ref(), delivery_fee.as_ref()]
                .into_iter()
                .flatten()
                .all(|m| m.currency == currency)
    }

    /// Calculates the rental fee of the provided number of `days`.
    ///
    /// Whole weeks are priced at the `weekly_rate` (if any), the remaining
    /// days at the `daily_rate`.
    #[must_use]
    pub fn rental_fee(&self, days: u32) -> Money {
        let Money { amount: daily, currency } = self.daily_rate;
        let amount = if let Some(weekly) = self.weekly_rate {
            let weeks = days / Self::DAYS_IN_WEEK;
            let rest = days % Self::DAYS_IN_WEEK;
            weekly.amount * Decimal::from(weeks) + daily * Decimal::from(rest)
        } else {
            daily * Decimal::from(days)
        };
        Money { amount, currency }.round_to_cents()
    }
}

/// Constraints of a [`Listing`] rental period.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RentalWindow {
    /// Minimum number of rental days.
    pub min_days: u16,

    /// Maximum number of rental days, if limited.
    pub max_days: Option<u16>,

    /// Number of days between a booking and its start the owner needs to
    /// prepare the equipment.
    pub advance_notice_days: u16,
}

impl Default for RentalWindow {
    fn default() -> Self {
        Self {
            min_days: 1,
            max_days: None,
            advance_notice_days: 0,
        }
    }
}

impl RentalWindow {
    /// Checks whether this [`RentalWindow`] is consistent.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.min_days >= 1 && self.max_days.map_or(true, |m| m >= self.min_days)
    }

    /// Checks the provided number of rental `days` against this
    /// [`RentalWindow`].
    ///
    /// # Errors
    ///
    /// With a [`WindowViolation`] if the `days` don't fit.
    pub fn check(&self, days: u32) -> Result<(), WindowViolation> {
        if days < u32::from(self.min_days) {
            return Err(WindowViolation::TooShort(self.min_days));
        }
        if let Some(max) = self.max_days {
            if days > u32::from(max) {
                return Err(WindowViolation::TooLong(max));
            }
        }
        Ok(())
    }
}

/// Violation of a [`RentalWindow`].
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum WindowViolation {
    /// Rental period is shorter than the minimum.
    #[display("Minimum rental period is {_0} days")]
    TooShort(u16),

    /// Rental period is longer than the maximum.
    #[display("Maximum rental period is {_0} days")]
    TooLong(u16),
}

define_kind! {
    #[doc = "Mode of booking a [`Listing`]."]
    enum BookingMode {
        #[doc = "Bookings are confirmed immediately."]
        Instant = 1,

        #[doc = "Bookings require the owner's approval."]
        Request = 2,
    }
}

define_kind! {
    #[doc = "Cancellation policy of a [`Listing`]."]
    enum CancellationPolicy {
        #[doc = "Full refund up to 1 day before the start."]
        Flexible = 1,

        #[doc = "Full refund up to 5 days before the start."]
        Moderate = 2,

        #[doc = "Half refund up to 7 days before the start."]
        Strict = 3,
    }
}

impl CancellationPolicy {
    /// Returns the refundable share of a booking cancelled the provided
    /// number of whole days before its start.
    #[must_use]
    pub fn refund_share(self, days_until_start: i64) -> Percent {
        let (min_days, share) = match self {
            Self::Flexible => (1, Percent::FULL),
            Self::Moderate => (5, Percent::FULL),
            Self::Strict => (7, Percent::HALF),
        };
        if days_until_start >= min_days {
            share
        } else {
            Percent::ZERO
        }
    }
}

/// Counter of a [`Listing`] activity.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Counter {
    /// Number of views.
    Views,

    /// Number of confirmed bookings.
    Bookings,
}

/// [`DateTime`] when a [`Listing`] was created.
pub type CreationDateTime = DateTimeOf<(Listing, unit::Creation)>;

#[cfg(test)]
mod spec {
    use common::{money::Currency, Money, Percent};

    use super::{CancellationPolicy, Pricing, RentalWindow, WindowViolation};

    fn usd(s: &str) -> Money {
        Money {
            amount: s.parse().unwrap(),
            currency: Currency::Usd,
        }
    }

    fn pricing(weekly: Option<&str>) -> Pricing {
        Pricing {
            daily_rate: usd("80"),
            weekly_rate: weekly.map(usd),
            security_deposit: usd("200"),
            delivery_fee: Some(usd("15")),
        }
    }

    #[test]
    fn prices_whole_weeks_at_weekly_rate() {
        let pricing = pricing(Some("450"));

        assert_eq!(pricing.rental_fee(9), usd("610"));
        assert_eq!(pricing.rental_fee(7), usd("450"));
        assert_eq!(pricing.rental_fee(14), usd("900"));
        assert_eq!(pricing.rental_fee(3), usd("240"));
    }

    #[test]
    fn prices_flat_daily_rate_without_weekly_one() {
        assert_eq!(pricing(None).rental_fee(9), usd("720"));
        assert_eq!(pricing(None).rental_fee(1), usd("80"));
    }

    #[test]
    fn validates_pricing() {
        assert!(pricing(Some("450")).is_valid());

        let mut p = pricing(None);
        p.daily_rate = usd("0");
        assert!(!p.is_valid());

        let mut p = pricing(None);
        p.security_deposit = usd("-1");
        assert!(!p.is_valid());

        let mut p = pricing(None);
        p.delivery_fee = Some(Money {
            amount: "10".parse().unwrap(),
            currency: Currency::Eur,
        });
        assert!(!p.is_valid());
    }

    #[test]
    fn checks_rental_window() {
        let window = RentalWindow {
            min_days: 2,
            max_days: Some(14),
            advance_notice_days: 1,
        };

        assert_eq!(window.check(1), Err(WindowViolation::TooShort(2)));
        assert_eq!(window.check(2), Ok(()));
        assert_eq!(window.check(14), Ok(()));
        assert_eq!(window.check(15), Err(WindowViolation::TooLong(14)));
        assert_eq!(
            WindowViolation::TooShort(2).to_string(),
            "Minimum rental period is 2 days",
        );

        assert!(window.is_valid());
        assert!(!RentalWindow {
            min_days: 5,
            max_days: Some(3),
            advance_notice_days: 0,
        }
        .is_valid());
    }

    #[test]
    fn refund_share_follows_policy_table() {
        use CancellationPolicy as P;

        assert_eq!(P::Flexible.refund_share(2), Percent::FULL);
        assert_eq!(P::Flexible.refund_share(1), Percent::FULL);
        assert_eq!(P::Flexible.refund_share(0), Percent::ZERO);

        assert_eq!(P::Moderate.refund_share(5), Percent::FULL);
        assert_eq!(P::Moderate.refund_share(3), Percent::ZERO);

        assert_eq!(P::Strict.refund_share(10), Percent::HALF);
        assert_eq!(P::Strict.refund_share(7), Percent::HALF);
        assert_eq!(P::Strict.refund_share(6), Percent::ZERO);
        assert_eq!(P::Strict.refund_share(-3), Percent::ZERO);
    }
}
