//! GraphQL [`Mutation`]s definitions.

use common::{Date, Money};
use juniper::graphql_object;
use service::{command, domain, Command as _};

use crate::{api, define_error, AsError, Context, Error};

use super::query::{BookingError, ListingError, ReviewError};

/// Root of all GraphQL mutations.
#[derive(Clone, Copy, Debug)]
pub struct Mutation;

impl Mutation {
    /// Name of the [`tracing::Span`] for the mutations.
    const SPAN_NAME: &'static str = "GraphQL mutation";
}

#[graphql_object(context = Context)]
impl Mutation {
    /// Lists new golf equipment of the current `User` for rent.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `INVALID_PRICING` - rates are not positive or fees are negative;
    /// - `INVALID_RENTAL_WINDOW` - rental period bounds are inconsistent.
    #[expect(clippy::too_many_arguments, reason = "GraphQL arguments")]
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "createListing",
            otel.name = Self::SPAN_NAME,
            title = %title,
        ),
    )]
    pub async fn create_listing(
        title: api::listing::Title,
        club: api::listing::ClubInput,
        pricing: api::listing::PricingInput,
        rental_window: api::listing::RentalWindowInput,
        booking_mode: api::listing::BookingMode,
        cancellation_policy: api::listing::CancellationPolicy,
        ctx: &Context,
    ) -> Result<api::Listing, Error> {
        let my_id = ctx.current_user().await?;
        let window = rental_window.try_into().map_err(ctx.error())?;

        ctx.service()
            .execute(command::CreateListing {
                owner_id: my_id,
                title: title.into(),
                club: club.into(),
                pricing: pricing.into(),
                window,
                booking_mode: booking_mode.into(),
                cancellation_policy: cancellation_policy.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Counts a view of the `Listing` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `LISTING_NOT_EXISTS` - the `Listing` with the specified ID does not
    ///                          exist.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "recordListingView",
            listing_id = %listing_id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn record_listing_view(
        listing_id: api::listing::Id,
        ctx: &Context,
    ) -> Result<bool, Error> {
        ctx.service()
            .execute(command::RecordListingView {
                listing_id: listing_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|()| true)
    }

    /// Books the `Listing` with the specified ID for the provided dates.
    ///
    /// The rental amount and the security deposit are authorized on the
    /// provided `PaymentMethod`. The `Booking` is `CONFIRMED` right away for
    /// `INSTANT` `Listing`s and stays `PENDING` otherwise.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `INVALID_DATES` - `endDate` is not after `startDate`;
    /// - `LISTING_NOT_EXISTS` - the `Listing` does not exist;
    /// - `LISTING_INACTIVE` - the `Listing` is not available for rent;
    /// - `OWN_LISTING` - the current `User` owns the `Listing`;
    /// - `START_IN_PAST` - `startDate` is in the past;
    /// - `ADVANCE_NOTICE_REQUIRED` - `startDate` is too close;
    /// - `RENTAL_WINDOW` - rental period doesn't fit the `Listing`;
    /// - `DELIVERY_NOT_OFFERED` - the `Listing` doesn't offer a delivery;
    /// - `DELIVERY_ADDRESS_REQUIRED` - no `DeliveryAddress` for a delivery;
    /// - `LISTING_UNAVAILABLE` - the dates are already booked;
    /// - `PAYMENT_DECLINED` - the payment processor declined the charge;
    /// - `PAYMENT_UNAVAILABLE` - the payment processor is unavailable.
    #[expect(clippy::too_many_arguments, reason = "GraphQL arguments")]
    #[tracing::instrument(
        skip_all,
        fields(
            end_date = %end_date,
            gql.name = "createBooking",
            listing_id = %listing_id,
            otel.name = Self::SPAN_NAME,
            pickup_method = ?pickup_method,
            start_date = %start_date,
        ),
    )]
    pub async fn create_booking(
        listing_id: api::listing::Id,
        start_date: Date,
        end_date: Date,
        pickup_method: api::booking::PickupMethod,
        delivery_address: Option<api::booking::Address>,
        payment_method: api::booking::PaymentMethod,
        message: Option<api::booking::Message>,
        ctx: &Context,
    ) -> Result<api::Booking, Error> {
        define_error! {
            enum DatesError {
                #[code = "INVALID_DATES"]
                #[status = BAD_REQUEST]
                #[message = "`endDate` must be after `startDate`"]
                Invalid,
            }
        }

        let my_id = ctx.current_user().await?;
        let dates = domain::booking::DateRange::new(start_date, end_date)
            .ok_or_else(|| DatesError::Invalid.into())
            .map_err(ctx.error())?;

        ctx.service()
            .execute(command::CreateBooking {
                listing_id: listing_id.into(),
                renter_id: my_id,
                dates,
                pickup_method: pickup_method.into(),
                delivery_address: delivery_address.map(Into::into),
                payment_method: payment_method.into(),
                message: message.map(Into::into),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Approves the `PENDING` `Booking` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `BOOKING_NOT_EXISTS` - the `Booking` does not exist;
    /// - `NOT_PARTICIPANT` - the current `User` doesn't participate in it;
    /// - `NOT_PERMITTED` - the current `User` is not the owner;
    /// - `INVALID_STATUS` - the `Booking` is not `PENDING`;
    /// - `LISTING_UNAVAILABLE` - the dates got booked by someone else;
    /// - `STATUS_CHANGED` - the `Booking` was changed concurrently.
    #[tracing::instrument(
        skip_all,
        fields(
            booking_id = %booking_id,
            gql.name = "approveBooking",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn approve_booking(
        booking_id: api::booking::Id,
        ctx: &Context,
    ) -> Result<api::Booking, Error> {
        let my_id = ctx.current_user().await?;

        ctx.service()
            .execute(command::ApproveBooking {
                booking_id: booking_id.into(),
                initiator_id: my_id,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Declines the `PENDING` `Booking` with the specified ID, releasing
    /// the renter's payment.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `BOOKING_NOT_EXISTS` - the `Booking` does not exist;
    /// - `NOT_PARTICIPANT` - the current `User` doesn't participate in it;
    /// - `NOT_PERMITTED` - the current `User` is not the owner;
    /// - `INVALID_STATUS` - the `Booking` is not `PENDING`;
    /// - `STATUS_CHANGED` - the `Booking` was changed concurrently;
    /// - `PAYMENT_UNAVAILABLE` - the payment processor is unavailable, the
    ///   `Booking` stays `PENDING`.
    #[tracing::instrument(
        skip_all,
        fields(
            booking_id = %booking_id,
            gql.name = "declineBooking",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn decline_booking(
        booking_id: api::booking::Id,
        reason: Option<api::booking::DeclineReason>,
        ctx: &Context,
    ) -> Result<api::Booking, Error> {
        let my_id = ctx.current_user().await?;

        ctx.service()
            .execute(command::DeclineBooking {
                booking_id: booking_id.into(),
                initiator_id: my_id,
                reason: reason.map(Into::into),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Cancels the `Booking` with the specified ID.
    ///
    /// The renter is refunded according to the `CancellationPolicy` of the
    /// `Listing` when cancelling by themselves, and fully otherwise.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `BOOKING_NOT_EXISTS` - the `Booking` does not exist;
    /// - `NOT_PARTICIPANT` - the current `User` doesn't participate in it;
    /// - `INVALID_STATUS` - the `Booking` can't be cancelled anymore;
    /// - `STATUS_CHANGED` - the `Booking` was changed concurrently;
    /// - `PAYMENT_UNAVAILABLE` - the payment processor is unavailable.
    #[tracing::instrument(
        skip_all,
        fields(
            booking_id = %booking_id,
            gql.name = "cancelBooking",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn cancel_booking(
        booking_id: api::booking::Id,
        ctx: &Context,
    ) -> Result<api::Booking, Error> {
        let my_id = ctx.current_user().await?;

        ctx.service()
            .execute(command::CancelBooking {
                booking_id: booking_id.into(),
                initiator_id: my_id,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Marks the equipment of the `CONFIRMED` `Booking` with the specified
    /// ID as handed over to the renter.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `BOOKING_NOT_EXISTS` - the `Booking` does not exist;
    /// - `NOT_PARTICIPANT` - the current `User` doesn't participate in it;
    /// - `NOT_PERMITTED` - the current `User` is not the owner;
    /// - `INVALID_STATUS` - the `Booking` is not `CONFIRMED`;
    /// - `STATUS_CHANGED` - the `Booking` was changed concurrently.
    #[tracing::instrument(
        skip_all,
        fields(
            booking_id = %booking_id,
            gql.name = "startBooking",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn start_booking(
        booking_id: api::booking::Id,
        ctx: &Context,
    ) -> Result<api::Booking, Error> {
        let my_id = ctx.current_user().await?;

        ctx.service()
            .execute(command::StartBooking {
                booking_id: booking_id.into(),
                initiator_id: my_id,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Marks the equipment of the `IN_PROGRESS` `Booking` with the specified
    /// ID as returned.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `BOOKING_NOT_EXISTS` - the `Booking` does not exist;
    /// - `NOT_PARTICIPANT` - the current `User` doesn't participate in it;
    /// - `NOT_PERMITTED` - the current `User` is not the owner;
    /// - `INVALID_STATUS` - the `Booking` is not `IN_PROGRESS`;
    /// - `STATUS_CHANGED` - the `Booking` was changed concurrently.
    #[tracing::instrument(
        skip_all,
        fields(
            booking_id = %booking_id,
            gql.name = "completeBooking",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn complete_booking(
        booking_id: api::booking::Id,
        ctx: &Context,
    ) -> Result<api::Booking, Error> {
        let my_id = ctx.current_user().await?;

        ctx.service()
            .execute(command::CompleteBooking {
                booking_id: booking_id.into(),
                initiator_id: my_id,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Captures (some of) the security deposit of the `CONFIRMED` or
    /// `IN_PROGRESS` `Booking` with the specified ID, releasing the rest.
    ///
    /// The whole deposit is captured if no `amount` is specified.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `BOOKING_NOT_EXISTS` - the `Booking` does not exist;
    /// - `NOT_OWNER` - the current `User` is not the owner;
    /// - `INVALID_STATUS` - the `Booking` is not `CONFIRMED` or
    ///   `IN_PROGRESS`;
    /// - `NO_OUTSTANDING_HOLD` - the deposit is already released or captured;
    /// - `STATUS_CHANGED` - the `Booking` was changed concurrently;
    /// - `INVALID_AMOUNT` - `amount` is not positive or exceeds the deposit;
    /// - `PAYMENT_UNAVAILABLE` - the payment processor is unavailable.
    #[tracing::instrument(
        skip_all,
        fields(
            amount = ?amount,
            booking_id = %booking_id,
            gql.name = "captureDeposit",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn capture_deposit(
        booking_id: api::booking::Id,
        amount: Option<Money>,
        ctx: &Context,
    ) -> Result<api::Booking, Error> {
        let my_id = ctx.current_user().await?;

        ctx.service()
            .execute(command::CaptureDeposit {
                booking_id: booking_id.into(),
                initiator_id: my_id,
                amount,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Reviews the `COMPLETED` `Booking` with the specified ID.
    ///
    /// The `Review` stays hidden until the counterparty reviews too, or the
    /// review period ends.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `BAD_REQUEST` - a score is out of `1..=5` range, or both kinds of
    ///                   details are specified;
    /// - `BOOKING_NOT_EXISTS` - the `Booking` does not exist;
    /// - `NOT_PARTICIPANT` - the current `User` doesn't participate in it;
    /// - `WRONG_PARTY` - the current `User` can't leave this `ReviewKind`;
    /// - `DETAILS_MISMATCH` - details don't match the `ReviewKind`;
    /// - `BOOKING_NOT_COMPLETED` - the `Booking` is not `COMPLETED`;
    /// - `ALREADY_REVIEWED` - the current `User` has reviewed it already.
    #[expect(clippy::too_many_arguments, reason = "GraphQL arguments")]
    #[tracing::instrument(
        skip_all,
        fields(
            booking_id = %booking_id,
            gql.name = "submitReview",
            kind = ?kind,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn submit_review(
        booking_id: api::booking::Id,
        kind: api::review::Kind,
        overall: i32,
        listing_details: Option<api::review::ListingDetailsInput>,
        renter_details: Option<api::review::RenterDetailsInput>,
        text: Option<api::review::Text>,
        feedback: Option<api::review::Feedback>,
        ctx: &Context,
    ) -> Result<api::Review, Error> {
        let my_id = ctx.current_user().await?;
        let overall = api::review::score(overall).map_err(ctx.error())?;
        let details = match (listing_details, renter_details) {
            (Some(d), None) => Some(d.try_into()),
            (None, Some(d)) => Some(d.try_into()),
            (None, None) => None,
            (Some(_), Some(_)) => Some(Err(Error::bad_request(
                &"Only one kind of details may be specified",
            ))),
        }
        .transpose()
        .map_err(ctx.error())?;

        ctx.service()
            .execute(command::SubmitReview {
                booking_id: booking_id.into(),
                reviewer_id: my_id,
                kind: kind.into(),
                overall,
                details,
                text: text.map(Into::into),
                feedback: feedback.map(Into::into),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Responds to the published `LISTING` `Review` of the current `User`'s
    /// equipment, or edits the response.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `REVIEW_NOT_EXISTS` - the `Review` does not exist;
    /// - `NOT_REVIEWEE` - the current `User` is not the reviewed owner;
    /// - `REVIEW_NOT_PUBLISHED` - the `Review` is not published yet;
    /// - `RESPONSE_LOCKED` - the response can't be edited anymore.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "respondToReview",
            otel.name = Self::SPAN_NAME,
            review_id = %review_id,
        ),
    )]
    pub async fn respond_to_review(
        review_id: api::review::Id,
        text: api::review::ResponseText,
        ctx: &Context,
    ) -> Result<api::Review, Error> {
        let my_id = ctx.current_user().await?;

        ctx.service()
            .execute(command::RespondToReview {
                review_id: review_id.into(),
                initiator_id: my_id,
                text: text.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Flags the published `Review` of the current `User` for moderation.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `REVIEW_NOT_EXISTS` - the `Review` does not exist;
    /// - `NOT_REVIEWEE` - the current `User` is not the reviewed one;
    /// - `REVIEW_NOT_PUBLISHED` - the `Review` is not published yet.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "flagReview",
            otel.name = Self::SPAN_NAME,
            review_id = %review_id,
        ),
    )]
    pub async fn flag_review(
        review_id: api::review::Id,
        ctx: &Context,
    ) -> Result<api::Review, Error> {
        let my_id = ctx.current_user().await?;

        ctx.service()
            .execute(command::FlagReview {
                review_id: review_id.into(),
                initiator_id: my_id,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }
}

impl AsError for command::create_listing::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "INVALID_PRICING"]
                #[status = BAD_REQUEST]
                #[message = "Rates must be positive and fees non-negative"]
                InvalidPricing,

                #[code = "INVALID_RENTAL_WINDOW"]
                #[status = BAD_REQUEST]
                #[message = "Minimum rental period must be at least one day \
                             and not exceed the maximum"]
                InvalidRentalWindow,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::InvalidPricing => Some(Error::InvalidPricing.into()),
            Self::InvalidRentalWindow => {
                Some(Error::InvalidRentalWindow.into())
            }
        }
    }
}

impl AsError for command::record_listing_view::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::ListingNotExists(_) => Some(ListingError::NotExists.into()),
        }
    }
}

impl AsError for command::create_booking::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "ADVANCE_NOTICE_REQUIRED"]
                #[status = BAD_REQUEST]
                #[message = "`Listing` requires booking further in advance"]
                AdvanceNoticeRequired,

                #[code = "DELIVERY_ADDRESS_REQUIRED"]
                #[status = BAD_REQUEST]
                #[message = "`DeliveryAddress` is required for a delivery"]
                DeliveryAddressRequired,

                #[code = "DELIVERY_NOT_OFFERED"]
                #[status = BAD_REQUEST]
                #[message = "`Listing` doesn't offer a delivery"]
                DeliveryNotOffered,

                #[code = "LISTING_INACTIVE"]
                #[status = CONFLICT]
                #[message = "`Listing` is not available for rent"]
                ListingInactive,

                #[code = "OWN_LISTING"]
                #[status = FORBIDDEN]
                #[message = "`User` can't book their own `Listing`"]
                OwnListing,

                #[code = "START_IN_PAST"]
                #[status = BAD_REQUEST]
                #[message = "`startDate` must not be in the past"]
                StartInPast,
            }
        }

        define_error! {
            enum WindowError {
                #[code = "RENTAL_WINDOW"]
                #[status = BAD_REQUEST]
                #[message = "Rental period doesn't fit the `Listing`"]
                Violated,
            }
        }

        match self {
            Self::AdvanceNoticeRequired(_) => {
                Some(Error::AdvanceNoticeRequired.into())
            }
            Self::Db(e) => e.try_as_error(),
            Self::DeliveryAddressRequired => {
                Some(Error::DeliveryAddressRequired.into())
            }
            Self::DeliveryNotOffered(_) => {
                Some(Error::DeliveryNotOffered.into())
            }
            Self::ListingInactive(_) => Some(Error::ListingInactive.into()),
            Self::ListingNotExists(_) => Some(ListingError::NotExists.into()),
            Self::ListingUnavailable(_) => {
                Some(api::ConflictError::ListingUnavailable.into())
            }
            Self::OwnListing(_) => Some(Error::OwnListing.into()),
            Self::Payment(e) => e.try_as_error(),
            Self::RentalWindow(violation) => {
                let mut err = crate::Error::from(WindowError::Violated);
                err.message = violation.to_string();
                Some(err)
            }
            Self::StartInPast(_) => Some(Error::StartInPast.into()),
        }
    }
}

impl AsError for command::approve_booking::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::BookingNotExists(_) => Some(BookingError::NotExists.into()),
            Self::Db(e) => e.try_as_error(),
            Self::ListingUnavailable(_) => {
                Some(api::ConflictError::ListingUnavailable.into())
            }
            Self::StatusChanged(_) => {
                Some(api::ConflictError::StatusChanged.into())
            }
            Self::Transition(e) => e.try_as_error(),
        }
    }
}

impl AsError for command::decline_booking::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::BookingNotExists(_) => Some(BookingError::NotExists.into()),
            Self::Db(e) => e.try_as_error(),
            Self::Payment(e) => e.try_as_error(),
            Self::StatusChanged(_) => {
                Some(api::ConflictError::StatusChanged.into())
            }
            Self::Transition(e) => e.try_as_error(),
        }
    }
}

impl AsError for command::cancel_booking::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::BookingNotExists(_) => Some(BookingError::NotExists.into()),
            Self::Db(e) => e.try_as_error(),
            Self::ListingNotExists(_) => None,
            Self::Payment(e) => e.try_as_error(),
            Self::StatusChanged(_) => {
                Some(api::ConflictError::StatusChanged.into())
            }
            Self::Transition(e) => e.try_as_error(),
        }
    }
}

impl AsError for command::start_booking::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::BookingNotExists(_) => Some(BookingError::NotExists.into()),
            Self::Db(e) => e.try_as_error(),
            Self::StatusChanged(_) => {
                Some(api::ConflictError::StatusChanged.into())
            }
            Self::Transition(e) => e.try_as_error(),
        }
    }
}

impl AsError for command::complete_booking::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::BookingNotExists(_) => Some(BookingError::NotExists.into()),
            Self::Db(e) => e.try_as_error(),
            Self::StatusChanged(_) => {
                Some(api::ConflictError::StatusChanged.into())
            }
            Self::Transition(e) => e.try_as_error(),
        }
    }
}

impl AsError for command::capture_deposit::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "INVALID_AMOUNT"]
                #[status = BAD_REQUEST]
                #[message = "Captured amount must be positive and not exceed \
                             the deposit"]
                InvalidAmount,

                #[code = "NO_OUTSTANDING_HOLD"]
                #[status = CONFLICT]
                #[message = "Security deposit is already released"]
                NoOutstandingHold,

                #[code = "NOT_OWNER"]
                #[status = FORBIDDEN]
                #[message = "Only the owner may capture the deposit"]
                NotOwner,
            }
        }

        match self {
            Self::BookingNotExists(_) => Some(BookingError::NotExists.into()),
            Self::Db(e) => e.try_as_error(),
            Self::DepositChanged(_) => {
                Some(api::ConflictError::StatusChanged.into())
            }
            Self::InvalidAmount(_) => Some(Error::InvalidAmount.into()),
            Self::NoOutstandingHold(_) => {
                Some(Error::NoOutstandingHold.into())
            }
            Self::NotOwner(_) => Some(Error::NotOwner.into()),
            Self::Payment(e) => e.try_as_error(),
            Self::WrongStatus(_) => {
                Some(api::ConflictError::InvalidStatus.into())
            }
        }
    }
}

impl AsError for command::submit_review::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "ALREADY_REVIEWED"]
                #[status = CONFLICT]
                #[message = "`Booking` is already reviewed by the `User`"]
                AlreadyReviewed,

                #[code = "BOOKING_NOT_COMPLETED"]
                #[status = CONFLICT]
                #[message = "Only a completed `Booking` may be reviewed"]
                BookingNotCompleted,

                #[code = "DETAILS_MISMATCH"]
                #[status = BAD_REQUEST]
                #[message = "Details don't match the `ReviewKind`"]
                DetailsMismatch,

                #[code = "WRONG_PARTY"]
                #[status = FORBIDDEN]
                #[message = "`User` can't leave this `ReviewKind`"]
                WrongParty,
            }
        }

        match self {
            Self::AlreadyReviewed(_) => Some(Error::AlreadyReviewed.into()),
            Self::BookingNotCompleted(_) => {
                Some(Error::BookingNotCompleted.into())
            }
            Self::BookingNotExists(_) => Some(BookingError::NotExists.into()),
            Self::Db(e) => e.try_as_error(),
            Self::DetailsMismatch(_) => Some(Error::DetailsMismatch.into()),
            Self::NotParticipant(_) => {
                Some(api::PrivilegeError::Participant.into())
            }
            Self::WrongParty(..) => Some(Error::WrongParty.into()),
        }
    }
}

define_error! {
    enum ReviewAccessError {
        #[code = "NOT_REVIEWEE"]
        #[status = FORBIDDEN]
        #[message = "Authenticated `User` is not the reviewed one"]
        NotReviewee,

        #[code = "REVIEW_NOT_PUBLISHED"]
        #[status = CONFLICT]
        #[message = "`Review` is not published yet"]
        NotPublished,

        #[code = "RESPONSE_LOCKED"]
        #[status = CONFLICT]
        #[message = "Response can't be edited anymore"]
        ResponseLocked,
    }
}

impl AsError for command::respond_to_review::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        use domain::review::ResponseError;

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::NotReviewee(_) => {
                Some(ReviewAccessError::NotReviewee.into())
            }
            Self::Response(ResponseError::NotPublished) => {
                Some(ReviewAccessError::NotPublished.into())
            }
            Self::Response(ResponseError::Locked) => {
                Some(ReviewAccessError::ResponseLocked.into())
            }
            Self::ReviewNotExists(_) => Some(ReviewError::NotExists.into()),
        }
    }
}

impl AsError for command::flag_review::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::NotPublished(_) => {
                Some(ReviewAccessError::NotPublished.into())
            }
            Self::NotReviewee(_) => {
                Some(ReviewAccessError::NotReviewee.into())
            }
            Self::ReviewNotExists(_) => Some(ReviewError::NotExists.into()),
        }
    }
}

#[cfg(test)]
mod spec {
    use service::{
        command::{
            capture_deposit, create_booking, decline_booking,
            respond_to_review,
        },
        domain::{booking, listing, review},
        infra::payment,
    };

    use crate::AsError as _;

    #[test]
    fn maps_create_booking_errors() {
        use create_booking::ExecutionError as E;

        let id = listing::Id::new();
        let cases = [
            (E::ListingNotExists(id), "LISTING_NOT_EXISTS", 404),
            (E::OwnListing(id), "OWN_LISTING", 403),
            (E::ListingUnavailable(id), "LISTING_UNAVAILABLE", 409),
            (E::DeliveryAddressRequired, "DELIVERY_ADDRESS_REQUIRED", 400),
        ];
        for (err, code, status) in cases {
            let err = err.try_as_error().unwrap();
            assert_eq!(err.code, code);
            assert_eq!(err.status_code.as_u16(), status);
        }

        let err = E::RentalWindow(listing::WindowViolation::TooShort(3))
            .try_as_error()
            .unwrap();
        assert_eq!(err.code, "RENTAL_WINDOW");
        assert_eq!(err.message, "Minimum rental period is 3 days");
    }

    #[test]
    fn maps_deposit_errors() {
        use capture_deposit::ExecutionError as E;

        let id = booking::Id::new();
        let err = E::NotOwner(id).try_as_error().unwrap();
        assert_eq!(err.code, "NOT_OWNER");

        let err = E::WrongStatus(booking::Status::Completed)
            .try_as_error()
            .unwrap();
        assert_eq!(err.code, "INVALID_STATUS");
        assert_eq!(err.status_code.as_u16(), 409);

        let err = E::DepositChanged(id).try_as_error().unwrap();
        assert_eq!(err.code, "STATUS_CHANGED");
        assert_eq!(err.status_code.as_u16(), 409);
    }

    #[test]
    fn maps_unreleased_decline_to_unavailable_payment() {
        use decline_booking::ExecutionError as E;

        let err = E::Payment(payment::Error::Transient("timeout".into()))
            .try_as_error()
            .unwrap();
        assert_eq!(err.code, "PAYMENT_UNAVAILABLE");
        assert_eq!(err.status_code.as_u16(), 503);
    }

    #[test]
    fn maps_response_errors() {
        use respond_to_review::ExecutionError as E;

        let err = E::Response(review::ResponseError::Locked)
            .try_as_error()
            .unwrap();
        assert_eq!(err.code, "RESPONSE_LOCKED");

        let err = E::ReviewNotExists(review::Id::new())
            .try_as_error()
            .unwrap();
        assert_eq!(err.status_code.as_u16(), 404);
    }
}
