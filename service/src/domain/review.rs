//! [`Review`] definitions.

use std::time::Duration;

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, Date, DateTimeOf};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{booking, listing, rating::Score, user};
#[cfg(doc)]
use crate::domain::{Booking, Listing};

/// Period after a [`Booking`] end when pending [`Review`]s get published
/// even without a counterpart.
pub const PUBLICATION_GRACE: Duration = Duration::from_secs(14 * 24 * 60 * 60);

/// Period an owner [`Response`] stays editable.
pub const RESPONSE_EDIT_WINDOW: Duration = Duration::from_secs(48 * 60 * 60);

/// Review of a completed [`Booking`] left by one of its parties.
#[derive(Clone, Debug)]
pub struct Review {
    /// ID of this [`Review`].
    pub id: Id,

    /// ID of the reviewed [`Booking`].
    pub booking_id: booking::Id,

    /// ID of the [`Listing`] the reviewed [`Booking`] rents.
    pub listing_id: listing::Id,

    /// ID of the user who wrote this [`Review`].
    pub reviewer_id: user::Id,

    /// ID of the user this [`Review`] is about.
    pub reviewee_id: user::Id,

    /// [`Kind`] of this [`Review`].
    pub kind: Kind,

    /// Overall [`Score`] of this [`Review`].
    pub overall: Score,

    /// Optional sub-[`Score`]s of this [`Review`].
    pub details: Details,

    /// Public [`Text`] of this [`Review`].
    pub text: Option<Text>,

    /// Private [`Feedback`], visible to the reviewer only.
    pub feedback: Option<Feedback>,

    /// [`Response`] of the reviewee.
    pub response: Option<Response>,

    /// [`DateTime`] when this [`Review`] was published.
    pub published_at: Option<PublicationDateTime>,

    /// [`DateTime`] when this [`Review`] was flagged for moderation.
    pub flagged_at: Option<FlagDateTime>,

    /// [`DateTime`] when this [`Review`] was created.
    pub created_at: CreationDateTime,
}

impl Review {
    /// Indicates whether this [`Review`] is published.
    #[must_use]
    pub const fn is_published(&self) -> bool {
        self.published_at.is_some()
    }

    /// Indicates whether this [`Review`] is visible to the provided viewer.
    ///
    /// Unpublished [`Review`]s are visible to their reviewer only.
    #[must_use]
    pub fn is_visible_to(&self, viewer: Option<user::Id>) -> bool {
        self.is_published() || viewer == Some(self.reviewer_id)
    }

    /// Returns the private [`Feedback`] of this [`Review`] if the provided
    /// viewer is its reviewer.
    #[must_use]
    pub fn feedback_for(&self, viewer: Option<user::Id>) -> Option<&Feedback> {
        (viewer == Some(self.reviewer_id))
            .then_some(self.feedback.as_ref())
            .flatten()
    }

    /// Responds to this [`Review`] with the provided [`ResponseText`].
    ///
    /// The first [`Response`] opens the [`RESPONSE_EDIT_WINDOW`], during which
    /// the text may be replaced.
    ///
    /// # Errors
    ///
    /// With a [`ResponseError`] if this [`Review`] isn't published yet, or its
    /// [`Response`] is locked already.
    pub fn respond(
        &mut self,
        text: ResponseText,
        now: common::DateTime,
    ) -> Result<&Response, ResponseError> {
        if !self.is_published() {
            return Err(ResponseError::NotPublished);
        }
        let response = match self.response.take() {
            Some(mut response) => {
                if response.is_locked(now) {
                    self.response = Some(response);
                    return Err(ResponseError::Locked);
                }
                response.text = text;
                response
            }
            None => Response {
                text,
                responded_at: now.coerce(),
                locked_at: (now + RESPONSE_EDIT_WINDOW).coerce(),
            },
        };
        Ok(self.response.insert(response))
    }
}

/// Decides whether a just submitted [`Review`] (and its counterpart, if any)
/// should be published.
///
/// Both sides are published once the counterpart exists, or once the
/// [`PUBLICATION_GRACE`] after the [`Booking`] end has passed.
#[must_use]
pub fn should_publish<Of: ?Sized>(
    has_counterpart: bool,
    end_date: Date,
    now: DateTimeOf<Of>,
) -> bool {
    has_counterpart || now.coerce() >= publication_deadline(end_date)
}

/// Returns the moment pending [`Review`]s of a [`Booking`] ended on the
/// provided [`Date`] are published regardless of the counterpart.
#[must_use]
pub fn publication_deadline(end_date: Date) -> common::DateTime {
    end_date.start::<()>() + PUBLICATION_GRACE
}

/// ID of a [`Review`].
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

define_kind! {
    #[doc = "Kind of a [`Review`]."]
    enum Kind {
        #[doc = "Renter reviews the equipment and its owner."]
        Listing = 1,

        #[doc = "Owner reviews the renter."]
        Renter = 2,
    }
}

impl Kind {
    /// Returns the [`booking::Party`] authoring [`Review`]s of this [`Kind`].
    #[must_use]
    pub const fn author(self) -> booking::Party {
        match self {
            Self::Listing => booking::Party::Renter,
            Self::Renter => booking::Party::Owner,
        }
    }

    /// Returns the opposite [`Kind`], written by the other party.
    #[must_use]
    pub const fn counterpart(self) -> Self {
        match self {
            Self::Listing => Self::Renter,
            Self::Renter => Self::Listing,
        }
    }
}

/// Optional sub-[`Score`]s of a [`Review`], depending on its [`Kind`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Details {
    /// Sub-[`Score`]s of a [`Kind::Listing`] [`Review`].
    Listing {
        /// Quality of the equipment.
        equipment_quality: Option<Score>,

        /// Cleanliness of the equipment.
        cleanliness: Option<Score>,

        /// Communication with the owner.
        communication: Option<Score>,

        /// Accuracy of the listing description.
        accuracy: Option<Score>,

        /// Value for money.
        value: Option<Score>,
    },

    /// Sub-[`Score`]s of a [`Kind::Renter`] [`Review`].
    Renter {
        /// Respect shown to the equipment and the owner.
        respect: Option<Score>,

        /// Timeliness of pickup and return.
        timeliness: Option<Score>,

        /// Condition of the equipment on return.
        condition_on_return: Option<Score>,
    },
}

impl Details {
    /// Returns empty [`Details`] of the provided [`Kind`].
    #[must_use]
    pub const fn empty(kind: Kind) -> Self {
        match kind {
            Kind::Listing => Self::Listing {
                equipment_quality: None,
                cleanliness: None,
                communication: None,
                accuracy: None,
                value: None,
            },
            Kind::Renter => Self::Renter {
                respect: None,
                timeliness: None,
                condition_on_return: None,
            },
        }
    }

    /// Returns the [`Kind`] of [`Review`]s these [`Details`] belong to.
    #[must_use]
    pub const fn kind(&self) -> Kind {
        match self {
            Self::Listing { .. } => Kind::Listing,
            Self::Renter { .. } => Kind::Renter,
        }
    }
}

/// Response of a reviewee to a [`Review`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Response {
    /// [`ResponseText`] of this [`Response`].
    pub text: ResponseText,

    /// [`DateTime`] of the first response.
    pub responded_at: ResponseDateTime,

    /// [`DateTime`] after which this [`Response`] can't be edited.
    pub locked_at: ResponseLockDateTime,
}

impl Response {
    /// Indicates whether this [`Response`] is immutable at the provided
    /// moment.
    #[must_use]
    pub fn is_locked(&self, now: common::DateTime) -> bool {
        now >= self.locked_at.coerce()
    }
}

/// Error of responding to a [`Review`].
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum ResponseError {
    /// [`Review`] is not published yet.
    #[display("review is not published yet")]
    NotPublished,

    /// [`Response`] edit window has passed.
    #[display("response can no longer be edited")]
    Locked,
}

/// Defines a length-bounded text newtype of a [`Review`].
macro_rules! define_text {
    ($(#[doc = $doc:literal])* $name:ident, $max:literal) => {
        $(#[doc = $doc])*
        #[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
        #[cfg_attr(
            feature = "postgres",
            derive(FromSql, ToSql),
            postgres(transparent),
        )]
        #[as_ref(forward)]
        pub struct $name(String);

        impl $name {
            /// Maximum number of characters.
            pub const MAX_LEN: usize = $max;

            /// Creates a new value out of the provided `text`, trimming it.
            ///
            /// [`None`] is returned if the trimmed `text` is empty or too
            /// long.
            #[must_use]
            pub fn new(text: impl AsRef<str>) -> Option<Self> {
                let text = text.as_ref().trim();
                Self::check(text).then(|| Self(text.to_owned()))
            }

            /// Checks whether the given trimmed `text` fits the bounds.
            fn check(text: &str) -> bool {
                !text.is_empty() && text.chars().count() <= Self::MAX_LEN
            }
        }

        impl FromStr for $name {
            type Err = &'static str;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s).ok_or(concat!("invalid `", stringify!($name), "`"))
            }
        }
    };
}

define_text! {
    /// Public text of a [`Review`].
    Text, 2000
}

define_text! {
    /// Private feedback of a [`Review`], never published.
    Feedback, 2000
}

define_text! {
    /// Text of a [`Response`].
    ResponseText, 1000
}

/// [`DateTime`] when a [`Review`] was created.
pub type CreationDateTime = DateTimeOf<(Review, unit::Creation)>;

/// [`DateTime`] when a [`Review`] was published.
pub type PublicationDateTime = DateTimeOf<(Review, unit::Publication)>;

/// [`DateTime`] when a [`Review`] was flagged.
pub type FlagDateTime = DateTimeOf<(Review, unit::Flag)>;

/// [`DateTime`] when a [`Response`] was first given.
pub type ResponseDateTime = DateTimeOf<(Response, unit::Creation)>;

/// [`DateTime`] when a [`Response`] becomes immutable.
pub type ResponseLockDateTime = DateTimeOf<(Response, unit::Lock)>;
