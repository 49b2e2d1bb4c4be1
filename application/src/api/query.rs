//! GraphQL [`Query`]s definitions.

use common::Money;
use juniper::graphql_object;
use service::{domain, query, read, Query as _};

use crate::{api, define_error, AsError, Context, Error};

/// Root of all GraphQL queries.
#[derive(Clone, Copy, Debug)]
pub struct Query;

impl Query {
    /// Name of the [`tracing::Span`] for the queries.
    pub(crate) const SPAN_NAME: &'static str = "GraphQL query";
}

#[graphql_object(context = Context)]
impl Query {
    /// Returns the `Booking` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the request is not authenticated;
    /// - `BOOKING_NOT_EXISTS` - the `Booking` with the specified ID does not
    ///                          exist;
    /// - `NOT_PARTICIPANT` - the current `User` is neither the renter nor the
    ///                       owner of the `Booking`.
    #[tracing::instrument(
        skip_all,
        fields(
            id = %id,
            gql.name = "booking",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn booking(
        id: api::booking::Id,
        ctx: &Context,
    ) -> Result<api::Booking, Error> {
        participant_booking(id, ctx).await.map(Into::into)
    }

    /// Returns the `Booking`s of the current `User`, newest first.
    ///
    /// Only the `Booking`s where the current `User` takes the specified
    /// `role` are returned, if any is specified.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "myBookings",
            otel.name = Self::SPAN_NAME,
            role = ?role,
        ),
    )]
    pub async fn my_bookings(
        role: Option<api::booking::Party>,
        ctx: &Context,
    ) -> Result<Vec<api::Booking>, Error> {
        let my_id = ctx.current_user().await?;
        ctx.service()
            .execute(query::booking::OfParticipant::by(
                read::booking::Participant {
                    user_id: my_id,
                    party: role.map(Into::into),
                },
            ))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|bookings| bookings.into_iter().map(Into::into).collect())
    }

    /// Returns the `Listing` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `LISTING_NOT_EXISTS` - the `Listing` with the specified ID does not
    ///                          exist.
    #[tracing::instrument(
        skip_all,
        fields(
            id = %id,
            gql.name = "listing",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn listing(
        id: api::listing::Id,
        ctx: &Context,
    ) -> Result<api::Listing, Error> {
        ctx.service()
            .execute(query::listing::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| ListingError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the published `Review`s of the `Listing` with the specified
    /// ID, newest first.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "listingReviews",
            listing_id = %listing_id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn listing_reviews(
        listing_id: api::listing::Id,
        ctx: &Context,
    ) -> Result<Vec<api::Review>, Error> {
        let viewer = ctx.viewer().await?;
        let reviews = ctx
            .service()
            .execute(query::review::OfListing::by(listing_id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;
        Ok(visible(reviews, viewer))
    }

    /// Returns the `Review`s of the `Booking` with the specified ID.
    ///
    /// Unpublished `Review`s are returned to their authors only.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the request is not authenticated;
    /// - `BOOKING_NOT_EXISTS` - the `Booking` with the specified ID does not
    ///                          exist;
    /// - `NOT_PARTICIPANT` - the current `User` is neither the renter nor the
    ///                       owner of the `Booking`.
    #[tracing::instrument(
        skip_all,
        fields(
            booking_id = %booking_id,
            gql.name = "bookingReviews",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn booking_reviews(
        booking_id: api::booking::Id,
        ctx: &Context,
    ) -> Result<Vec<api::Review>, Error> {
        let booking = participant_booking(booking_id, ctx).await?;
        let my_id = ctx.current_user().await?;
        let reviews = ctx
            .service()
            .execute(query::review::OfBooking::by(booking.id))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;
        Ok(visible(reviews, Some(my_id)))
    }

    /// Returns the `Rating` of the `User` with the specified ID.
    ///
    /// A `User` without published `RENTER` `Review`s has an empty `Rating`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "userRating",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn user_rating(
        id: api::user::Id,
        ctx: &Context,
    ) -> Result<api::Rating, Error> {
        ctx.service()
            .execute(query::user::RatingById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Quotes the marketplace fees of the specified rental `amount`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `BAD_REQUEST` - the `amount` is negative.
    #[tracing::instrument(
        skip_all,
        fields(
            amount = %amount,
            gql.name = "feeQuote",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn fee_quote(
        amount: Money,
        ctx: &Context,
    ) -> Result<api::fee::Fees, Error> {
        if amount.amount.is_sign_negative() {
            return Err(Error::bad_request(&"Amount must not be negative"))
                .map_err(ctx.error());
        }
        ctx.service()
            .execute(query::fee::Quote { amount })
            .await
            .map(Into::into)
            .or_else(|e| match e {})
    }
}

/// Loads the `Booking` with the provided ID, ensuring the current `User`
/// participates in it.
///
/// # Errors
///
/// Possible error codes are the ones of the `booking` query.
pub(crate) async fn participant_booking(
    id: api::booking::Id,
    ctx: &Context,
) -> Result<domain::Booking, Error> {
    let my_id = ctx.current_user().await?;
    let booking = ctx
        .service()
        .execute(query::booking::ById::by(id.into()))
        .await
        .map_err(AsError::into_error)
        .map_err(ctx.error())?
        .ok_or_else(|| BookingError::NotExists.into())
        .map_err(ctx.error())?;
    if booking.party_of(my_id).is_none() {
        return Err(api::PrivilegeError::Participant.into())
            .map_err(ctx.error());
    }
    Ok(booking)
}

/// Filters the provided [`domain::Review`]s down to the ones visible to the
/// `viewer`.
fn visible(
    reviews: Vec<domain::Review>,
    viewer: Option<domain::user::Id>,
) -> Vec<api::Review> {
    reviews
        .into_iter()
        .filter(|r| r.is_visible_to(viewer))
        .map(Into::into)
        .collect()
}

define_error! {
    enum BookingError {
        #[code = "BOOKING_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Booking` with the specified ID does not exist"]
        NotExists,
    }
}

define_error! {
    enum ListingError {
        #[code = "LISTING_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Listing` with the specified ID does not exist"]
        NotExists,
    }
}

define_error! {
    enum ReviewError {
        #[code = "REVIEW_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Review` with the specified ID does not exist"]
        NotExists,
    }
}
