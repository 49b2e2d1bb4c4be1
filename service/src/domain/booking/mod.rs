//! [`Booking`] definitions.

pub mod status;

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, Date, DateTimeOf, Money};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{fee, listing, payment, user};
#[cfg(doc)]
use crate::domain::Listing;

pub use self::status::{Event, Party, Status, TransitionError};

/// Rental of a [`Listing`] by a renter for a [`DateRange`].
#[derive(Clone, Debug)]
pub struct Booking {
    /// ID of this [`Booking`].
    pub id: Id,

    /// ID of the rented [`Listing`].
    pub listing_id: listing::Id,

    /// ID of the user renting the equipment.
    pub renter_id: user::Id,

    /// ID of the user owning the equipment.
    pub owner_id: user::Id,

    /// [`DateRange`] of this [`Booking`].
    pub dates: DateRange,

    /// [`Pricing`] snapshot of this [`Booking`], frozen at creation.
    pub pricing: Pricing,

    /// [`payment::IntentId`] of the authorized charge.
    pub charge_id: payment::IntentId,

    /// [`Deposit`] custody of this [`Booking`].
    pub deposit: Deposit,

    /// Current [`Status`] of this [`Booking`].
    pub status: Status,

    /// [`Pickup`] arrangement of this [`Booking`].
    pub pickup: Pickup,

    /// [`Message`] left by the renter.
    pub message: Option<Message>,

    /// [`DeclineReason`] given by the owner.
    pub decline_reason: Option<DeclineReason>,

    /// [`Cancellation`] record, if this [`Booking`] was cancelled.
    pub cancellation: Option<Cancellation>,

    /// Indicator whether the renter has reviewed this [`Booking`].
    pub renter_reviewed: bool,

    /// Indicator whether the owner has reviewed this [`Booking`].
    pub owner_reviewed: bool,

    /// [`DateTime`] when this [`Booking`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Booking`] was confirmed.
    pub confirmed_at: Option<ConfirmationDateTime>,

    /// [`DateTime`] when the equipment was handed over.
    pub started_at: Option<StartDateTime>,

    /// [`DateTime`] when this [`Booking`] was completed.
    pub completed_at: Option<CompletionDateTime>,

    /// [`DateTime`] when this [`Booking`] was declined.
    pub declined_at: Option<DeclineDateTime>,
}

impl Booking {
    /// Returns the [`Party`] the provided user takes in this [`Booking`].
    #[must_use]
    pub fn party_of(&self, user_id: user::Id) -> Option<Party> {
        if user_id == self.renter_id {
            Some(Party::Renter)
        } else if user_id == self.owner_id {
            Some(Party::Owner)
        } else {
            None
        }
    }

    /// Returns ID of the user taking the provided [`Party`] in this
    /// [`Booking`].
    #[must_use]
    pub fn user_of(&self, party: Party) -> user::Id {
        match party {
            Party::Renter => self.renter_id,
            Party::Owner => self.owner_id,
        }
    }

    /// Returns the [`Status`] a new [`Booking`] of a [`Listing`] with the
    /// provided [`listing::BookingMode`] starts in.
    #[must_use]
    pub const fn initial_status(mode: listing::BookingMode) -> Status {
        match mode {
            listing::BookingMode::Instant => Status::Confirmed,
            listing::BookingMode::Request => Status::Pending,
        }
    }

    /// Checks whether the provided actor may trigger the provided [`Event`]
    /// on this [`Booking`] in its current [`Status`].
    ///
    /// # Errors
    ///
    /// With a [`TransitionError`] if the actor doesn't participate in this
    /// [`Booking`], or may not trigger the [`Event`], or the [`Event`] is not
    /// allowed in the current [`Status`].
    pub fn check(
        &self,
        event: Event,
        actor: user::Id,
    ) -> Result<(Party, Status), TransitionError> {
        let party =
            self.party_of(actor).ok_or(TransitionError::NotParticipant)?;
        if !event.is_permitted_for(party) {
            return Err(TransitionError::NotPermitted(party, event));
        }
        let next = self
            .status
            .apply(event)
            .ok_or(TransitionError::InvalidState(self.status, event))?;
        Ok((party, next))
    }

    /// Applies the provided [`Event`] triggered by the provided actor to this
    /// [`Booking`], stamping the matching timestamp.
    ///
    /// Returns the [`Party`] of the actor and the previous [`Status`].
    ///
    /// # Errors
    ///
    /// See [`Booking::check()`].
    pub fn apply(
        &mut self,
        event: Event,
        actor: user::Id,
    ) -> Result<(Party, Status), TransitionError> {
        let (party, next) = self.check(event, actor)?;
        let now = common::DateTime::now();
        match event {
            Event::Approve => self.confirmed_at = Some(now.coerce()),
            Event::Start => self.started_at = Some(now.coerce()),
            Event::Complete => self.completed_at = Some(now.coerce()),
            Event::Decline => self.declined_at = Some(now.coerce()),
            Event::Cancel => {
                self.cancellation = Some(Cancellation {
                    by: party,
                    refund: Money::zero(self.pricing.total_amount.currency),
                    at: now.coerce(),
                });
            }
        }
        let prev = self.status;
        self.status = next;
        Ok((party, prev))
    }

    /// Indicates whether the deposit hold of this [`Booking`] is still
    /// outstanding (neither released nor captured).
    #[must_use]
    pub fn has_outstanding_hold(&self) -> bool {
        self.deposit.hold_id.is_some()
            && self.deposit.released_at.is_none()
            && self.deposit.captured.is_none()
    }

    /// Indicates whether the provided [`Party`] has reviewed this
    /// [`Booking`].
    #[must_use]
    pub const fn is_reviewed_by(&self, party: Party) -> bool {
        match party {
            Party::Renter => self.renter_reviewed,
            Party::Owner => self.owner_reviewed,
        }
    }
}

/// Compare-and-swap of a [`Booking`] [`Status`]: the [`Booking`] is stored
/// only if its persisted [`Status`] still equals the `from` one.
#[derive(Clone, Debug)]
pub struct Transition {
    /// [`Booking`] to store.
    pub booking: Booking,

    /// Expected persisted [`Status`].
    pub from: Status,
}

/// Compare-and-swap of a [`Deposit`] hold: the [`Settlement`] is stored only
/// while the hold is outstanding, and a [`Settlement::Capture`] only while
/// the [`Booking`] is [`Status::is_occupying()`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Settle {
    /// ID of the [`Booking`] whose hold is settled.
    pub booking_id: Id,

    /// [`Settlement`] to record.
    pub settlement: Settlement,
}

/// Undoing of a [`Settle`] whose payment operation failed: the hold becomes
/// outstanding again only if the stored [`Settlement`] is still this one.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Unsettle(pub Settle);

/// Way a [`Deposit`] hold is settled.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Settlement {
    /// Owner captured the provided amount of the hold.
    Capture(Money),

    /// Hold was released at the provided moment.
    Release(ReleaseDateTime),
}

/// Mark of a [`Booking`] being reviewed by a [`Party`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Reviewed(pub Party);

/// ID of a [`Booking`].
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

/// Rental period of a [`Booking`]: both [`Date`]s inclusive.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct DateRange {
    /// First rental day.
    start: Date,

    /// Last rental day (the return day).
    end: Date,
}

impl DateRange {
    /// Creates a new [`DateRange`] if `start` is strictly before `end`.
    #[must_use]
    pub fn new(start: Date, end: Date) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    /// Returns the first [`Date`] of this [`DateRange`].
    #[must_use]
    pub const fn start(&self) -> Date {
        self.start
    }

    /// Returns the last [`Date`] of this [`DateRange`].
    #[must_use]
    pub const fn end(&self) -> Date {
        self.end
    }

    /// Returns the number of rental days in this [`DateRange`].
    #[must_use]
    pub fn days(&self) -> u32 {
        u32::try_from(self.start.days_until(self.end)).unwrap_or(u32::MAX)
    }

    /// Indicates whether this [`DateRange`] overlaps the `other` one.
    ///
    /// Ranges touching on the same day overlap, as the equipment is returned
    /// and picked up on that day.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start <= other.end && self.end >= other.start
    }
}

/// Pricing snapshot of a [`Booking`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Pricing {
    /// Daily rate of the [`Listing`] at the moment of booking.
    pub daily_rate: Money,

    /// Rental fee of the whole [`DateRange`].
    pub total_rental_fee: Money,

    /// Fee paid by the renter on top of the rental fee.
    pub service_fee: Money,

    /// Fee kept by the platform.
    pub platform_fee: Money,

    /// Amount the owner receives.
    pub owner_earnings: Money,

    /// Security deposit held for the rental duration.
    pub security_deposit: Money,

    /// Delivery fee, zero for a pickup.
    pub delivery_fee: Money,

    /// Amount charged from the renter.
    pub total_amount: Money,
}

impl Pricing {
    /// Quotes a new [`Pricing`] of renting the provided number of `days` with
    /// the provided [`PickupMethod`].
    ///
    /// [`None`] is returned if delivery is requested, but not offered.
    #[must_use]
    pub fn quote(
        pricing: &listing::Pricing,
        days: u32,
        method: PickupMethod,
        fees: &fee::Calculator,
    ) -> Option<Self> {
        let currency = pricing.daily_rate.currency;
        let delivery_fee = match method {
            PickupMethod::Pickup => Money::zero(currency),
            PickupMethod::Delivery => pricing.delivery_fee?,
        };

        let total_rental_fee = pricing.rental_fee(days);
        let fee::Fees {
            platform_fee,
            owner_earnings,
            service_fee,
            total_charge,
            ..
        } = fees.calculate(total_rental_fee);

        Some(Self {
            daily_rate: pricing.daily_rate,
            total_rental_fee,
            service_fee,
            platform_fee,
            owner_earnings,
            security_deposit: pricing.security_deposit,
            delivery_fee,
            total_amount: Money {
                amount: total_charge.amount + delivery_fee.amount,
                currency,
            },
        })
    }
}

/// Security deposit custody of a [`Booking`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Deposit {
    /// [`payment::IntentId`] of the hold.
    ///
    /// [`None`] if no deposit is required.
    pub hold_id: Option<payment::IntentId>,

    /// [`DateTime`] when the hold was released.
    pub released_at: Option<ReleaseDateTime>,

    /// Amount captured from the hold by the owner.
    pub captured: Option<Money>,
}

/// Pickup arrangement of a [`Booking`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Pickup {
    /// [`PickupMethod`] of the equipment.
    pub method: PickupMethod,

    /// Delivery [`Address`], if delivered.
    pub address: Option<Address>,
}

define_kind! {
    #[doc = "Method of handing the equipment over."]
    enum PickupMethod {
        #[doc = "Renter picks the equipment up."]
        Pickup = 1,

        #[doc = "Owner delivers the equipment."]
        Delivery = 2,
    }
}

/// Cancellation record of a [`Booking`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Cancellation {
    /// [`Party`] who cancelled.
    pub by: Party,

    /// Amount refunded to the renter.
    pub refund: Money,

    /// [`DateTime`] of the cancellation.
    pub at: CancellationDateTime,
}

/// Delivery address of a [`Booking`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[as_ref(forward)]
pub struct Address(String);

impl Address {
    /// Creates a new [`Address`] if the given `address` is valid.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Option<Self> {
        let address = address.into();
        Self::check(&address).then_some(Self(address))
    }

    /// Checks whether the given `address` is a valid [`Address`].
    fn check(address: impl AsRef<str>) -> bool {
        let address = address.as_ref();
        address.trim() == address && !address.is_empty() && address.len() <= 500
    }
}

impl FromStr for Address {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Address`")
    }
}

/// Message of a renter to an owner.
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[as_ref(forward)]
pub struct Message(String);

impl Message {
    /// Creates a new [`Message`] if the given `text` is valid.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        Self::check(&text).then_some(Self(text))
    }

    /// Checks whether the given `text` is a valid [`Message`].
    fn check(text: impl AsRef<str>) -> bool {
        let text = text.as_ref();
        !text.trim().is_empty() && text.chars().count() <= 1000
    }
}

impl FromStr for Message {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Message`")
    }
}

/// Reason of an owner declining a [`Booking`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[as_ref(forward)]
pub struct DeclineReason(String);

impl DeclineReason {
    /// Creates a new [`DeclineReason`] if the given `reason` is valid.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Option<Self> {
        let reason = reason.into();
        Self::check(&reason).then_some(Self(reason))
    }

    /// Checks whether the given `reason` is a valid [`DeclineReason`].
    fn check(reason: impl AsRef<str>) -> bool {
        let reason = reason.as_ref();
        !reason.trim().is_empty() && reason.chars().count() <= 500
    }
}

impl FromStr for DeclineReason {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `DeclineReason`")
    }
}

/// [`DateTime`] when a [`Booking`] was created.
pub type CreationDateTime = DateTimeOf<(Booking, unit::Creation)>;

/// [`DateTime`] when a [`Booking`] was confirmed.
pub type ConfirmationDateTime = DateTimeOf<(Booking, unit::Confirmation)>;

/// [`DateTime`] when a [`Booking`] rental started.
pub type StartDateTime = DateTimeOf<(Booking, unit::Start)>;

/// [`DateTime`] when a [`Booking`] was completed.
pub type CompletionDateTime = DateTimeOf<(Booking, unit::Completion)>;

/// [`DateTime`] when a [`Booking`] was cancelled.
pub type CancellationDateTime = DateTimeOf<(Booking, unit::Cancellation)>;

/// [`DateTime`] when a [`Booking`] was declined.
pub type DeclineDateTime = DateTimeOf<(Booking, unit::Decline)>;

/// [`DateTime`] when a [`Booking`] deposit hold was released.
pub type ReleaseDateTime = DateTimeOf<(Deposit, unit::Release)>;
