//! [`Listing`]-related definitions.

use std::future;

use common::{DateTime, Handler as _, Money};
use derive_more::{AsRef, Display, From, Into};
use futures::TryFutureExt as _;
use juniper::{graphql_object, GraphQLInputObject, GraphQLObject, GraphQLScalar};
use service::{domain, query};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::{api, api::scalar, AsError, Context, Error};

/// A golf equipment listing.
#[derive(Clone, Debug)]
pub struct Listing {
    /// ID of this [`Listing`].
    id: Id,

    /// Underlying [`domain::Listing`].
    listing: OnceCell<domain::Listing>,
}

impl From<domain::Listing> for Listing {
    fn from(listing: domain::Listing) -> Self {
        Self {
            id: listing.id.into(),
            listing: OnceCell::new_with(Some(listing)),
        }
    }
}

impl Listing {
    /// Creates a new [`Listing`] with the provided ID.
    ///
    /// # Safety
    ///
    /// Caller must ensure that [`Listing`] with the provided ID exists,
    /// otherwise accessing this [`Listing`] will result with an error.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            listing: OnceCell::new(),
        }
    }

    /// Returns the underlying [`domain::Listing`].
    ///
    /// # Errors
    ///
    /// Errors if the [`domain::Listing`] doesn't exist.
    async fn listing(&self, ctx: &Context) -> Result<&domain::Listing, Error> {
        let id = self.id.into();
        self.listing
            .get_or_try_init(|| {
                ctx.service()
                    .execute(query::listing::ById::by(id))
                    .map_err(AsError::into_error)
                    .map_err(ctx.error())
                    .and_then(|l| {
                        future::ready(l.ok_or_else(|| {
                            api::query::ListingError::NotExists.into()
                        }))
                    })
            })
            .await
    }
}

/// A golf equipment listing.
#[graphql_object(context = Context)]
impl Listing {
    /// Unique identifier of this `Listing`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Listing.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.id
    }

    /// ID of the `User` owning the listed equipment.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Listing.ownerId",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn owner_id(&self, ctx: &Context) -> Result<api::user::Id, Error> {
        Ok(self.listing(ctx).await?.owner_id.into())
    }

    /// Title of this `Listing`.
    pub async fn title(&self, ctx: &Context) -> Result<Title, Error> {
        Ok(self.listing(ctx).await?.title.clone().into())
    }

    /// Listed `Club`.
    pub async fn club(&self, ctx: &Context) -> Result<Club, Error> {
        Ok(self.listing(ctx).await?.club.clone().into())
    }

    /// Rental prices of this `Listing`.
    pub async fn pricing(&self, ctx: &Context) -> Result<Pricing, Error> {
        Ok(self.listing(ctx).await?.pricing.into())
    }

    /// Allowed rental periods of this `Listing`.
    pub async fn rental_window(
        &self,
        ctx: &Context,
    ) -> Result<RentalWindow, Error> {
        Ok(self.listing(ctx).await?.window.into())
    }

    /// Whether bookings of this `Listing` are confirmed instantly or need the
    /// owner's approval.
    pub async fn booking_mode(
        &self,
        ctx: &Context,
    ) -> Result<BookingMode, Error> {
        Ok(self.listing(ctx).await?.booking_mode.into())
    }

    /// Refund rules applied when a booking of this `Listing` is cancelled.
    pub async fn cancellation_policy(
        &self,
        ctx: &Context,
    ) -> Result<CancellationPolicy, Error> {
        Ok(self.listing(ctx).await?.cancellation_policy.into())
    }

    /// Indicator whether this `Listing` accepts new bookings.
    pub async fn is_active(&self, ctx: &Context) -> Result<bool, Error> {
        Ok(self.listing(ctx).await?.is_active)
    }

    /// Number of times this `Listing` was viewed.
    pub async fn view_count(&self, ctx: &Context) -> Result<i32, Error> {
        Ok(saturate(self.listing(ctx).await?.view_count))
    }

    /// Number of confirmed bookings of this `Listing`.
    pub async fn booking_count(&self, ctx: &Context) -> Result<i32, Error> {
        Ok(saturate(self.listing(ctx).await?.booking_count))
    }

    /// `Rating` of this `Listing` given by its renters.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Listing.rating",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn rating(&self, ctx: &Context) -> Result<api::Rating, Error> {
        Ok(self.listing(ctx).await?.rating.into())
    }

    /// `DateTime` when this `Listing` was created.
    pub async fn created_at(&self, ctx: &Context) -> Result<DateTime, Error> {
        Ok(self.listing(ctx).await?.created_at.coerce())
    }
}

/// Converts the provided counter into a GraphQL `Int`.
fn saturate(counter: u64) -> i32 {
    i32::try_from(counter).unwrap_or(i32::MAX)
}

/// Unique identifier of a `Listing`.
#[derive(Clone, Copy, Debug, Display, Into, From, GraphQLScalar)]
#[from(domain::listing::Id)]
#[into(domain::listing::Id)]
#[graphql(name = "ListingId", transparent)]
pub struct Id(Uuid);

/// Title of a `Listing`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "ListingTitle",
    with = scalar::Via::<domain::listing::Title>,
)]
pub struct Title(domain::listing::Title);

/// Brand of a `Club`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(name = "ClubBrand", with = scalar::Via::<domain::listing::Brand>)]
pub struct Brand(domain::listing::Brand);

/// Listed golf club (or set of clubs).
#[derive(Clone, Debug, GraphQLObject)]
#[graphql(context = Context)]
pub struct Club {
    /// Kind of this `Club`.
    pub kind: ClubKind,

    /// Brand of this `Club`.
    pub brand: Brand,

    /// Handedness of this `Club`.
    pub handedness: Handedness,

    /// Shaft flex of this `Club`, if applicable.
    pub flex: Option<Flex>,

    /// Condition of this `Club`.
    pub condition: Condition,
}

impl From<domain::listing::Club> for Club {
    fn from(club: domain::listing::Club) -> Self {
        let domain::listing::Club {
            kind,
            brand,
            handedness,
            flex,
            condition,
        } = club;
        Self {
            kind: kind.into(),
            brand: brand.into(),
            handedness: handedness.into(),
            flex: flex.map(Into::into),
            condition: condition.into(),
        }
    }
}

/// Listed golf club (or set of clubs).
#[derive(Clone, Debug, GraphQLInputObject)]
pub struct ClubInput {
    /// Kind of the `Club`.
    pub kind: ClubKind,

    /// Brand of the `Club`.
    pub brand: Brand,

    /// Handedness of the `Club`.
    pub handedness: Handedness,

    /// Shaft flex of the `Club`, if applicable.
    pub flex: Option<Flex>,

    /// Condition of the `Club`.
    pub condition: Condition,
}

impl From<ClubInput> for domain::listing::Club {
    fn from(input: ClubInput) -> Self {
        let ClubInput {
            kind,
            brand,
            handedness,
            flex,
            condition,
        } = input;
        Self {
            kind: kind.into(),
            brand: brand.into(),
            handedness: handedness.into(),
            flex: flex.map(Into::into),
            condition: condition.into(),
        }
    }
}

/// Rental prices of a `Listing`.
#[derive(Clone, Copy, Debug, GraphQLObject)]
#[graphql(context = Context)]
pub struct Pricing {
    /// Price of a single rental day.
    pub daily_rate: Money,

    /// Discounted price of a full rental week, if any.
    pub weekly_rate: Option<Money>,

    /// Security deposit held for the rental period.
    pub security_deposit: Money,

    /// Fee of delivering the equipment, if delivery is offered.
    pub delivery_fee: Option<Money>,
}

impl From<domain::listing::Pricing> for Pricing {
    fn from(pricing: domain::listing::Pricing) -> Self {
        let domain::listing::Pricing {
            daily_rate,
            weekly_rate,
            security_deposit,
            delivery_fee,
        } = pricing;
        Self {
            daily_rate,
            weekly_rate,
            security_deposit,
            delivery_fee,
        }
    }
}

/// Rental prices of a `Listing`.
#[derive(Clone, Copy, Debug, GraphQLInputObject)]
pub struct PricingInput {
    /// Price of a single rental day.
    pub daily_rate: Money,

    /// Discounted price of a full rental week, if any.
    pub weekly_rate: Option<Money>,

    /// Security deposit held for the rental period.
    pub security_deposit: Money,

    /// Fee of delivering the equipment, if delivery is offered.
    pub delivery_fee: Option<Money>,
}

impl From<PricingInput> for domain::listing::Pricing {
    fn from(input: PricingInput) -> Self {
        let PricingInput {
            daily_rate,
            weekly_rate,
            security_deposit,
            delivery_fee,
        } = input;
        Self {
            daily_rate,
            weekly_rate,
            security_deposit,
            delivery_fee,
        }
    }
}

/// Allowed rental periods of a `Listing`.
#[derive(Clone, Copy, Debug, GraphQLObject)]
#[graphql(context = Context)]
pub struct RentalWindow {
    /// Minimum number of rental days.
    pub min_days: i32,

    /// Maximum number of rental days, if limited.
    pub max_days: Option<i32>,

    /// Number of days a rental must be booked in advance.
    pub advance_notice_days: i32,
}

impl From<domain::listing::RentalWindow> for RentalWindow {
    fn from(window: domain::listing::RentalWindow) -> Self {
        let domain::listing::RentalWindow {
            min_days,
            max_days,
            advance_notice_days,
        } = window;
        Self {
            min_days: min_days.into(),
            max_days: max_days.map(Into::into),
            advance_notice_days: advance_notice_days.into(),
        }
    }
}

/// Allowed rental periods of a `Listing`.
#[derive(Clone, Copy, Debug, GraphQLInputObject)]
pub struct RentalWindowInput {
    /// Minimum number of rental days.
    pub min_days: i32,

    /// Maximum number of rental days, if limited.
    pub max_days: Option<i32>,

    /// Number of days a rental must be booked in advance.
    pub advance_notice_days: i32,
}

impl TryFrom<RentalWindowInput> for domain::listing::RentalWindow {
    type Error = Error;

    fn try_from(input: RentalWindowInput) -> Result<Self, Self::Error> {
        let RentalWindowInput {
            min_days,
            max_days,
            advance_notice_days,
        } = input;
        let days = |n: i32| {
            u16::try_from(n).map_err(|_| {
                Error::bad_request(&"Rental period days must be in \
                                     `0..=65535` range")
            })
        };
        Ok(Self {
            min_days: days(min_days)?,
            max_days: max_days.map(days).transpose()?,
            advance_notice_days: days(advance_notice_days)?,
        })
    }
}

mirror_kind! {
    #[doc = "Kind of a `Club`."]
    #[graphql(name = "ClubKind")]
    enum ClubKind: domain::listing::ClubKind {
        #[doc = "Complete set of clubs."]
        FullSet,
        #[doc = "Driver."]
        Driver,
        #[doc = "Fairway wood."]
        FairwayWood,
        #[doc = "Hybrid."]
        Hybrid,
        #[doc = "Set of irons."]
        Irons,
        #[doc = "Wedge."]
        Wedge,
        #[doc = "Putter."]
        Putter,
    }
}

mirror_kind! {
    #[doc = "Handedness of a `Club`."]
    #[graphql(name = "ClubHandedness")]
    enum Handedness: domain::listing::Handedness {
        #[doc = "Right-handed."]
        Right,
        #[doc = "Left-handed."]
        Left,
    }
}

mirror_kind! {
    #[doc = "Shaft flex of a `Club`."]
    #[graphql(name = "ClubFlex")]
    enum Flex: domain::listing::Flex {
        #[doc = "Ladies flex."]
        Ladies,
        #[doc = "Senior flex."]
        Senior,
        #[doc = "Regular flex."]
        Regular,
        #[doc = "Stiff flex."]
        Stiff,
        #[doc = "Extra stiff flex."]
        ExtraStiff,
    }
}

mirror_kind! {
    #[doc = "Condition of a `Club`."]
    #[graphql(name = "ClubCondition")]
    enum Condition: domain::listing::Condition {
        #[doc = "Brand new."]
        New,
        #[doc = "Barely used."]
        Excellent,
        #[doc = "Used, fully functional."]
        Good,
        #[doc = "Visible wear."]
        Fair,
    }
}

mirror_kind! {
    #[doc = "Mode of confirming bookings of a `Listing`."]
    #[graphql(name = "BookingMode")]
    enum BookingMode: domain::listing::BookingMode {
        #[doc = "Bookings are confirmed right away."]
        Instant,
        #[doc = "Bookings await the owner's approval."]
        Request,
    }
}

mirror_kind! {
    #[doc = "Refund rules of a cancelled booking."]
    #[graphql(name = "CancellationPolicy")]
    enum CancellationPolicy: domain::listing::CancellationPolicy {
        #[doc = "Full refund until 1 day before the start."]
        Flexible,
        #[doc = "Full refund until 5 days before the start."]
        Moderate,
        #[doc = "Half refund until 7 days before the start."]
        Strict,
    }
}
