//! [`Booking`]-related definitions.

use common::{Date, DateTime, Money};
use derive_more::{AsRef, Display, From, Into};
use juniper::{graphql_object, GraphQLObject, GraphQLScalar};
use service::domain;
use uuid::Uuid;

use crate::{api, api::scalar, AsError, Context, Error};

/// A rental of a `Listing` by a renter.
#[derive(Clone, Debug, From)]
pub struct Booking(domain::Booking);

impl Booking {
    /// Returns the underlying [`domain::Booking`].
    #[must_use]
    pub fn inner(&self) -> &domain::Booking {
        &self.0
    }
}

/// A rental of a `Listing` by a renter.
///
/// Visible to its participants only.
#[graphql_object(context = Context)]
impl Booking {
    /// Unique identifier of this `Booking`.
    #[must_use]
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// Booked `Listing`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Booking.listing",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    #[must_use]
    pub fn listing(&self) -> api::Listing {
        #[expect(
            unsafe_code,
            reason = "`Booking` loaded from repository guarantees `Listing` \
                      existence"
        )]
        unsafe {
            api::Listing::new_unchecked(self.0.listing_id)
        }
    }

    /// ID of the renting `User`.
    #[must_use]
    pub fn renter_id(&self) -> api::user::Id {
        self.0.renter_id.into()
    }

    /// ID of the `User` owning the equipment.
    #[must_use]
    pub fn owner_id(&self) -> api::user::Id {
        self.0.owner_id.into()
    }

    /// First day of the rental.
    #[must_use]
    pub fn start_date(&self) -> Date {
        self.0.dates.start()
    }

    /// Day the equipment is returned.
    #[must_use]
    pub fn end_date(&self) -> Date {
        self.0.dates.end()
    }

    /// Number of rental days.
    #[must_use]
    pub fn days(&self) -> i32 {
        i32::try_from(self.0.dates.days()).unwrap_or(i32::MAX)
    }

    /// Current status of this `Booking`.
    #[must_use]
    pub fn status(&self) -> Status {
        self.0.status.into()
    }

    /// Price breakdown fixed at the moment this `Booking` was created.
    #[must_use]
    pub fn pricing(&self) -> Pricing {
        self.0.pricing.into()
    }

    /// Security deposit of this `Booking`.
    #[must_use]
    pub fn deposit(&self) -> Deposit {
        Deposit {
            amount: self.0.pricing.security_deposit,
            is_held: self.0.has_outstanding_hold(),
            released_at: self.0.deposit.released_at.map(|at| at.coerce()),
            captured: self.0.deposit.captured,
        }
    }

    /// Method of handing the equipment over.
    #[must_use]
    pub fn pickup_method(&self) -> PickupMethod {
        self.0.pickup.method.into()
    }

    /// Address the equipment is delivered to.
    #[must_use]
    pub fn delivery_address(&self) -> Option<Address> {
        self.0.pickup.address.clone().map(Into::into)
    }

    /// Message of the renter to the owner.
    #[must_use]
    pub fn message(&self) -> Option<Message> {
        self.0.message.clone().map(Into::into)
    }

    /// Reason the owner declined this `Booking` with.
    #[must_use]
    pub fn decline_reason(&self) -> Option<DeclineReason> {
        self.0.decline_reason.clone().map(Into::into)
    }

    /// Details of this `Booking` cancellation, if cancelled.
    #[must_use]
    pub fn cancellation(&self) -> Option<Cancellation> {
        self.0.cancellation.map(|c| Cancellation {
            by: c.by.into(),
            refund: c.refund,
            at: c.at.coerce(),
        })
    }

    /// Indicator whether the renter has reviewed this `Booking`.
    #[must_use]
    pub fn renter_reviewed(&self) -> bool {
        self.0.renter_reviewed
    }

    /// Indicator whether the owner has reviewed this `Booking`.
    #[must_use]
    pub fn owner_reviewed(&self) -> bool {
        self.0.owner_reviewed
    }

    /// `DateTime` when this `Booking` was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }

    /// `DateTime` when this `Booking` was confirmed.
    #[must_use]
    pub fn confirmed_at(&self) -> Option<DateTime> {
        self.0.confirmed_at.map(|at| at.coerce())
    }

    /// `DateTime` when the equipment was handed over.
    #[must_use]
    pub fn started_at(&self) -> Option<DateTime> {
        self.0.started_at.map(|at| at.coerce())
    }

    /// `DateTime` when this `Booking` was completed.
    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime> {
        self.0.completed_at.map(|at| at.coerce())
    }

    /// `DateTime` when this `Booking` was declined.
    #[must_use]
    pub fn declined_at(&self) -> Option<DateTime> {
        self.0.declined_at.map(|at| at.coerce())
    }
}

/// Unique identifier of a `Booking`.
#[derive(Clone, Copy, Debug, Display, Into, From, GraphQLScalar)]
#[from(domain::booking::Id)]
#[into(domain::booking::Id)]
#[graphql(name = "BookingId", transparent)]
pub struct Id(Uuid);

/// Delivery address of a `Booking`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "DeliveryAddress",
    with = scalar::Via::<domain::booking::Address>,
)]
pub struct Address(domain::booking::Address);

/// Message of a renter to an owner.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "BookingMessage",
    with = scalar::Via::<domain::booking::Message>,
)]
pub struct Message(domain::booking::Message);

/// Reason of declining a `Booking`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "DeclineReason",
    with = scalar::Via::<domain::booking::DeclineReason>,
)]
pub struct DeclineReason(domain::booking::DeclineReason);

/// Opaque reference to a renter's payment method at the payment processor.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "PaymentMethod",
    with = scalar::Via::<domain::payment::MethodRef>,
)]
pub struct PaymentMethod(domain::payment::MethodRef);

/// Price breakdown of a `Booking`.
#[derive(Clone, Copy, Debug, GraphQLObject)]
#[graphql(name = "BookingPricing", context = Context)]
pub struct Pricing {
    /// Daily rate of the `Listing` at the booking moment.
    pub daily_rate: Money,

    /// Rental amount for the whole period.
    pub total_rental_fee: Money,

    /// Fee the renter pays on top of the rental amount.
    pub service_fee: Money,

    /// Fee kept by the platform.
    pub platform_fee: Money,

    /// Amount the owner receives.
    pub owner_earnings: Money,

    /// Held security deposit.
    pub security_deposit: Money,

    /// Delivery fee, zero for a pickup.
    pub delivery_fee: Money,

    /// Amount charged from the renter.
    pub total_amount: Money,
}

impl From<domain::booking::Pricing> for Pricing {
    fn from(pricing: domain::booking::Pricing) -> Self {
        let domain::booking::Pricing {
            daily_rate,
            total_rental_fee,
            service_fee,
            platform_fee,
            owner_earnings,
            security_deposit,
            delivery_fee,
            total_amount,
        } = pricing;
        Self {
            daily_rate,
            total_rental_fee,
            service_fee,
            platform_fee,
            owner_earnings,
            security_deposit,
            delivery_fee,
            total_amount,
        }
    }
}

/// Security deposit of a `Booking`.
#[derive(Clone, Copy, Debug, GraphQLObject)]
#[graphql(context = Context)]
pub struct Deposit {
    /// Held amount.
    pub amount: Money,

    /// Indicator whether the hold is still outstanding.
    pub is_held: bool,

    /// `DateTime` when the hold was released.
    pub released_at: Option<DateTime>,

    /// Amount captured by the owner.
    pub captured: Option<Money>,
}

/// Details of a `Booking` cancellation.
#[derive(Clone, Copy, Debug, GraphQLObject)]
#[graphql(context = Context)]
pub struct Cancellation {
    /// `BookingParty` who cancelled.
    pub by: Party,

    /// Amount refunded to the renter.
    pub refund: Money,

    /// `DateTime` of the cancellation.
    pub at: DateTime,
}

mirror_kind! {
    #[doc = "Status of a `Booking`."]
    #[graphql(name = "BookingStatus")]
    enum Status: domain::booking::Status {
        #[doc = "Awaiting the owner's approval."]
        Pending,
        #[doc = "Confirmed, equipment not handed over yet."]
        Confirmed,
        #[doc = "Equipment is handed over to the renter."]
        InProgress,
        #[doc = "Rental is finished."]
        Completed,
        #[doc = "Cancelled by the renter or the owner."]
        Cancelled,
        #[doc = "Declined by the owner."]
        Declined,
    }
}

mirror_kind! {
    #[doc = "Party participating in a `Booking`."]
    #[graphql(name = "BookingParty")]
    enum Party: domain::booking::Party {
        #[doc = "User renting the equipment."]
        Renter,
        #[doc = "User owning the equipment."]
        Owner,
    }
}

mirror_kind! {
    #[doc = "Method of handing the equipment over."]
    #[graphql(name = "PickupMethod")]
    enum PickupMethod: domain::booking::PickupMethod {
        #[doc = "Renter picks the equipment up."]
        Pickup,
        #[doc = "Owner delivers the equipment."]
        Delivery,
    }
}

impl AsError for domain::booking::TransitionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::NotParticipant => api::PrivilegeError::Participant.into(),
            Self::NotPermitted(..) => api::PrivilegeError::Permitted.into(),
            Self::InvalidState(..) => api::ConflictError::InvalidStatus.into(),
        })
    }
}

#[cfg(test)]
mod spec {
    use service::domain::booking::{Event, Party, Status, TransitionError};

    use crate::AsError as _;

    #[test]
    fn maps_transition_errors() {
        let cases = [
            (TransitionError::NotParticipant, "NOT_PARTICIPANT", 403),
            (
                TransitionError::NotPermitted(Party::Renter, Event::Approve),
                "NOT_PERMITTED",
                403,
            ),
            (
                TransitionError::InvalidState(Status::Completed, Event::Cancel),
                "INVALID_STATUS",
                409,
            ),
        ];

        for (err, code, status) in cases {
            let err = err.try_as_error().unwrap();
            assert_eq!(err.code, code);
            assert_eq!(err.status_code.as_u16(), status);
        }
    }

    #[test]
    fn mirrors_booking_status() {
        let statuses = [
            Status::Pending,
            Status::Confirmed,
            Status::InProgress,
            Status::Completed,
            Status::Cancelled,
            Status::Declined,
        ];
        for status in statuses {
            let mirrored = super::Status::from(status);
            assert_eq!(Status::from(mirrored), status);
        }

        assert_eq!(
            super::Status::from(Status::InProgress),
            super::Status::InProgress,
        );
        assert_eq!(Party::from(super::Party::Owner), Party::Owner);
    }
}
