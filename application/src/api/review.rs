//! [`Review`]-related definitions.

use common::DateTime;
use derive_more::{AsRef, Display, From, Into};
use juniper::{
    graphql_object, GraphQLInputObject, GraphQLObject, GraphQLScalar,
};
use service::domain::{self, rating::Score};
use uuid::Uuid;

use crate::{api, api::scalar, Context, Error};

/// A review left after a completed `Booking`.
///
/// Stays hidden from everyone but its author until published.
#[derive(Clone, Debug, From)]
pub struct Review(domain::Review);

/// A review left after a completed `Booking`.
#[graphql_object(context = Context)]
impl Review {
    /// Unique identifier of this `Review`.
    #[must_use]
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// ID of the reviewed `Booking`.
    #[must_use]
    pub fn booking_id(&self) -> api::booking::Id {
        self.0.booking_id.into()
    }

    /// `Listing` of the reviewed `Booking`.
    #[must_use]
    pub fn listing(&self) -> api::Listing {
        #[expect(
            unsafe_code,
            reason = "`Review` loaded from repository guarantees `Listing` \
                      existence"
        )]
        unsafe {
            api::Listing::new_unchecked(self.0.listing_id)
        }
    }

    /// ID of the reviewing `User`.
    #[must_use]
    pub fn reviewer_id(&self) -> api::user::Id {
        self.0.reviewer_id.into()
    }

    /// ID of the reviewed `User`.
    #[must_use]
    pub fn reviewee_id(&self) -> api::user::Id {
        self.0.reviewee_id.into()
    }

    /// Kind of this `Review`.
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.0.kind.into()
    }

    /// Overall score in the `1..=5` range.
    #[must_use]
    pub fn overall(&self) -> i32 {
        self.0.overall.get().into()
    }

    /// Detailed scores of this `Review`.
    #[must_use]
    pub fn details(&self) -> Details {
        self.0.details.into()
    }

    /// Public text of this `Review`.
    #[must_use]
    pub fn text(&self) -> Option<Text> {
        self.0.text.clone().map(Into::into)
    }

    /// Private feedback to the platform.
    ///
    /// Visible to the author of this `Review` only.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Review.feedback",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn feedback(
        &self,
        ctx: &Context,
    ) -> Result<Option<Feedback>, Error> {
        let viewer = ctx.viewer().await?;
        Ok(self
            .0
            .feedback_for(viewer)
            .cloned()
            .map(Into::into))
    }

    /// Response of the reviewed owner.
    #[must_use]
    pub fn response(&self) -> Option<Response> {
        self.0.response.clone().map(|r| Response {
            text: r.text.into(),
            responded_at: r.responded_at.coerce(),
            locked_at: r.locked_at.coerce(),
        })
    }

    /// `DateTime` when this `Review` was published.
    ///
    /// `null` while it's hidden.
    #[must_use]
    pub fn published_at(&self) -> Option<DateTime> {
        self.0.published_at.map(|at| at.coerce())
    }

    /// Indicator whether this `Review` was flagged for moderation.
    #[must_use]
    pub fn is_flagged(&self) -> bool {
        self.0.flagged_at.is_some()
    }

    /// `DateTime` when this `Review` was submitted.
    #[must_use]
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }
}

/// Unique identifier of a `Review`.
#[derive(Clone, Copy, Debug, Display, Into, From, GraphQLScalar)]
#[from(domain::review::Id)]
#[into(domain::review::Id)]
#[graphql(name = "ReviewId", transparent)]
pub struct Id(Uuid);

/// Public text of a `Review`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(name = "ReviewText", with = scalar::Via::<domain::review::Text>)]
pub struct Text(domain::review::Text);

/// Private feedback of a `Review` author to the platform.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "ReviewFeedback",
    with = scalar::Via::<domain::review::Feedback>,
)]
pub struct Feedback(domain::review::Feedback);

/// Text of an owner's response to a `Review`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "ReviewResponseText",
    with = scalar::Via::<domain::review::ResponseText>,
)]
pub struct ResponseText(domain::review::ResponseText);

/// Owner's response to a `Review`.
#[derive(Clone, Debug, GraphQLObject)]
#[graphql(name = "ReviewResponse", context = Context)]
pub struct Response {
    /// Text of this `ReviewResponse`.
    pub text: ResponseText,

    /// `DateTime` of the first response.
    pub responded_at: DateTime,

    /// `DateTime` after which this `ReviewResponse` can't be edited.
    pub locked_at: DateTime,
}

/// Detailed scores of a `Review`.
///
/// Only the scores of the `Review` kind may be set.
#[derive(Clone, Copy, Debug, Default, GraphQLObject)]
#[graphql(name = "ReviewDetails", context = Context)]
pub struct Details {
    /// Quality of the rented equipment.
    pub equipment_quality: Option<i32>,

    /// Cleanliness of the rented equipment.
    pub cleanliness: Option<i32>,

    /// Communication with the owner.
    pub communication: Option<i32>,

    /// Accuracy of the `Listing` description.
    pub accuracy: Option<i32>,

    /// Value for the money.
    pub value: Option<i32>,

    /// Respect of the renter to the equipment and the owner.
    pub respect: Option<i32>,

    /// Timeliness of the pickup and the return.
    pub timeliness: Option<i32>,

    /// Condition of the equipment on return.
    pub condition_on_return: Option<i32>,
}

impl From<domain::review::Details> for Details {
    fn from(details: domain::review::Details) -> Self {
        use domain::review::Details as D;

        let score = |s: Option<Score>| s.map(|s| i32::from(s.get()));
        match details {
            D::Listing {
                equipment_quality,
                cleanliness,
                communication,
                accuracy,
                value,
            } => Self {
                equipment_quality: score(equipment_quality),
                cleanliness: score(cleanliness),
                communication: score(communication),
                accuracy: score(accuracy),
                value: score(value),
                ..Self::default()
            },
            D::Renter {
                respect,
                timeliness,
                condition_on_return,
            } => Self {
                respect: score(respect),
                timeliness: score(timeliness),
                condition_on_return: score(condition_on_return),
                ..Self::default()
            },
        }
    }
}

/// Detailed scores of a `LISTING` `Review`.
#[derive(Clone, Copy, Debug, GraphQLInputObject)]
pub struct ListingDetailsInput {
    /// Quality of the rented equipment.
    pub equipment_quality: Option<i32>,

    /// Cleanliness of the rented equipment.
    pub cleanliness: Option<i32>,

    /// Communication with the owner.
    pub communication: Option<i32>,

    /// Accuracy of the `Listing` description.
    pub accuracy: Option<i32>,

    /// Value for the money.
    pub value: Option<i32>,
}

impl TryFrom<ListingDetailsInput> for domain::review::Details {
    type Error = Error;

    fn try_from(input: ListingDetailsInput) -> Result<Self, Self::Error> {
        let ListingDetailsInput {
            equipment_quality,
            cleanliness,
            communication,
            accuracy,
            value,
        } = input;
        Ok(Self::Listing {
            equipment_quality: equipment_quality.map(score).transpose()?,
            cleanliness: cleanliness.map(score).transpose()?,
            communication: communication.map(score).transpose()?,
            accuracy: accuracy.map(score).transpose()?,
            value: value.map(score).transpose()?,
        })
    }
}

/// Detailed scores of a `RENTER` `Review`.
#[derive(Clone, Copy, Debug, GraphQLInputObject)]
pub struct RenterDetailsInput {
    /// Respect of the renter to the equipment and the owner.
    pub respect: Option<i32>,

    /// Timeliness of the pickup and the return.
    pub timeliness: Option<i32>,

    /// Condition of the equipment on return.
    pub condition_on_return: Option<i32>,
}

impl TryFrom<RenterDetailsInput> for domain::review::Details {
    type Error = Error;

    fn try_from(input: RenterDetailsInput) -> Result<Self, Self::Error> {
        let RenterDetailsInput {
            respect,
            timeliness,
            condition_on_return,
        } = input;
        Ok(Self::Renter {
            respect: respect.map(score).transpose()?,
            timeliness: timeliness.map(score).transpose()?,
            condition_on_return: condition_on_return.map(score).transpose()?,
        })
    }
}

/// Parses the provided GraphQL `Int` into a [`Score`].
///
/// # Errors
///
/// If the provided value is out of the `1..=5` range.
pub fn score(value: i32) -> Result<Score, Error> {
    u8::try_from(value)
        .ok()
        .and_then(Score::new)
        .ok_or_else(|| Error::bad_request(&"Scores must be in `1..=5` range"))
}

mirror_kind! {
    #[doc = "Kind of a `Review`."]
    #[graphql(name = "ReviewKind")]
    enum Kind: domain::review::Kind {
        #[doc = "Renter reviews the equipment and its owner."]
        Listing,
        #[doc = "Owner reviews the renter."]
        Renter,
    }
}
