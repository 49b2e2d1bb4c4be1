//! [`Command`] for submitting a [`Review`] of a completed [`Booking`].

use std::collections::BTreeMap;

use common::{
    operations::{
        By, Commit, Dispatch, Insert, Lock, Select, Transact, Transacted,
        Update,
    },
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        booking,
        rating::{Score, Target},
        review, user, Booking, Rating, Review,
    },
    infra::{database, notification, Database, Dispatcher},
    Service,
};

use super::{update_rating, Command, UpdateRating};

/// Name of the unique constraint over `(booking_id, reviewer_id, kind)`.
const UNIQUE_CONSTRAINT: &str = "reviews_booking_reviewer_kind_key";

/// [`Command`] for submitting a [`Review`] of a completed [`Booking`].
///
/// Reviews are double-blind: a submitted [`Review`] stays hidden until its
/// counterpart is submitted, or until the [`review::PUBLICATION_GRACE`] has
/// passed since the [`Booking`] end.
#[derive(Clone, Debug)]
pub struct SubmitReview {
    /// ID of the reviewed [`Booking`].
    pub booking_id: booking::Id,

    /// ID of the user submitting the [`Review`].
    pub reviewer_id: user::Id,

    /// [`review::Kind`] of the [`Review`].
    pub kind: review::Kind,

    /// Overall [`Score`] of the [`Review`].
    pub overall: Score,

    /// Optional sub-[`Score`]s of the [`Review`].
    pub details: Option<review::Details>,

    /// Public [`review::Text`] of the [`Review`].
    pub text: Option<review::Text>,

    /// Private [`review::Feedback`] of the [`Review`].
    pub feedback: Option<review::Feedback>,
}

impl<Db, Pg, Nt> Command<SubmitReview> for Service<Db, Pg, Nt>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Booking>, booking::Id>>,
            Ok = Option<Booking>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Booking, booking::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Review>, booking::Id>>,
            Ok = Vec<Review>,
            Err = Traced<database::Error>,
        > + Database<Insert<Review>, Ok = (), Err = Traced<database::Error>>
        + Database<
            Update<(booking::Id, booking::Reviewed)>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Update<(booking::Id, review::PublicationDateTime)>,
            Ok = Vec<Review>,
            Err = Traced<database::Error>,
        > + Database<Commit, Err = Traced<database::Error>>,
    Nt: Dispatcher<
        Dispatch<notification::Notification>,
        Ok = (),
        Err = Traced<notification::Error>,
    >,
    Self: Command<
        UpdateRating,
        Ok = Rating,
        Err = Traced<update_rating::ExecutionError>,
    >,
{
    type Ok = Review;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: SubmitReview) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let SubmitReview {
            booking_id,
            reviewer_id,
            kind,
            overall,
            details,
            text,
            feedback,
        } = cmd;

        let details = details.unwrap_or(review::Details::empty(kind));
        if details.kind() != kind {
            return Err(tracerr::new!(E::DetailsMismatch(kind)));
        }

        let booking = self
            .database()
            .execute(Select(By::<Option<Booking>, _>::new(booking_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::BookingNotExists(booking_id))
            .map_err(tracerr::wrap!())?;
        let party = booking
            .party_of(reviewer_id)
            .ok_or(E::NotParticipant(booking_id))
            .map_err(tracerr::wrap!())?;
        if party != kind.author() {
            return Err(tracerr::new!(E::WrongParty(party, kind)));
        }
        if booking.status != booking::Status::Completed {
            return Err(tracerr::new!(E::BookingNotCompleted(booking.status)));
        }

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent publication decisions of the same `Booking`.
        tx.execute(Lock(By::<Booking, _>::new(booking_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let existing = tx
            .execute(Select(By::<Vec<Review>, _>::new(booking_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if existing
            .iter()
            .any(|r| r.reviewer_id == reviewer_id && r.kind == kind)
        {
            return Err(tracerr::new!(E::AlreadyReviewed(booking_id)));
        }
        let has_counterpart =
            existing.iter().any(|r| r.kind == kind.counterpart());

        let now = DateTime::now();
        let mut review = Review {
            id: review::Id::new(),
            booking_id,
            listing_id: booking.listing_id,
            reviewer_id,
            reviewee_id: booking.user_of(party.counterparty()),
            kind,
            overall,
            details,
            text,
            feedback,
            response: None,
            published_at: None,
            flagged_at: None,
            created_at: now.coerce(),
        };
        tx.execute(Insert(review.clone())).await.map_err(|e| {
            if e.as_ref().is_unique_violation(UNIQUE_CONSTRAINT) {
                tracerr::new!(E::AlreadyReviewed(booking_id))
            } else {
                tracerr::map_from(e)
            }
        })?;
        tx.execute(Update((booking_id, booking::Reviewed(party))))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let published = if review::should_publish(
            has_counterpart,
            booking.dates.end(),
            now,
        ) {
            let published_at: review::PublicationDateTime = now.coerce();
            tx.execute(Update((booking_id, published_at)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
        } else {
            vec![]
        };

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        if let Some(own) = published.iter().find(|r| r.id == review.id) {
            review.published_at = own.published_at;
        }
        self.announce_published(&published).await;

        Ok(review)
    }
}

impl<Db, Pg, Nt> Service<Db, Pg, Nt>
where
    Nt: Dispatcher<
        Dispatch<notification::Notification>,
        Ok = (),
        Err = Traced<notification::Error>,
    >,
    Self: Command<
        UpdateRating,
        Ok = Rating,
        Err = Traced<update_rating::ExecutionError>,
    >,
{
    /// Notifies the reviewees of the provided just published [`Review`]s and
    /// recomputes the affected [`Rating`]s.
    ///
    /// Failures are logged and swallowed.
    pub(crate) async fn announce_published(&self, published: &[Review]) {
        let mut targets = Vec::<Target>::new();
        for review in published {
            self.notify(
                review.reviewee_id,
                notification::Template::ReviewPublished,
                BTreeMap::from([
                    ("review_id", review.id.to_string()),
                    ("booking_id", review.booking_id.to_string()),
                    ("kind", review.kind.to_string()),
                ]),
            )
            .await;

            let listing = (review.kind == review::Kind::Listing)
                .then_some(Target::Listing(review.listing_id));
            for target in listing.into_iter().chain([review.reviewee_id.into()])
            {
                if !targets.contains(&target) {
                    targets.push(target);
                }
            }
        }

        for target in targets {
            if let Err(e) = self.execute(UpdateRating { target }).await {
                log::error!("failed to update `{target}` rating: {e}");
            }
        }
    }
}

/// Error of [`SubmitReview`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Review`] of this [`review::Kind`] is submitted already.
    #[display("`Booking(id: {_0})` is already reviewed")]
    #[from(ignore)]
    AlreadyReviewed(#[error(not(source))] booking::Id),

    /// [`Booking`] is not completed yet.
    #[display("Only completed bookings can be reviewed, not `{_0}` ones")]
    #[from(ignore)]
    BookingNotCompleted(#[error(not(source))] booking::Status),

    /// [`Booking`] with the provided ID does not exist.
    #[display("`Booking(id: {_0})` does not exist")]
    #[from(ignore)]
    BookingNotExists(#[error(not(source))] booking::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`review::Details`] don't belong to the [`review::Kind`].
    #[display("Details don't match `{_0}` review")]
    #[from(ignore)]
    DetailsMismatch(#[error(not(source))] review::Kind),

    /// Reviewer doesn't participate in the [`Booking`].
    #[display("Reviewer doesn't participate in `Booking(id: {_0})`")]
    #[from(ignore)]
    NotParticipant(#[error(not(source))] booking::Id),

    /// Reviewer's [`booking::Party`] can't write this [`review::Kind`].
    #[display("`{_0}` cannot write `{_1}` reviews")]
    #[from(ignore)]
    WrongParty(#[error(not(source))] booking::Party, review::Kind),
}

#[cfg(test)]
mod spec {
    use common::operations::{By, Select};
    use rust_decimal::Decimal;

    use crate::{
        domain::{
            booking::{self, Status},
            listing::{BookingMode, CancellationPolicy},
            rating::Score,
            review::{self, Kind},
            Booking, Listing, Rating,
        },
        fixture::{self, dates, TestService},
        infra::{notification::Template, Database as _},
        Command as _,
    };

    use super::{ExecutionError, SubmitReview};

    async fn completed(
        svc: &TestService,
        ended_days_ago: i64,
    ) -> (Listing, Booking) {
        let listing = fixture::listing(
            svc,
            BookingMode::Instant,
            CancellationPolicy::Flexible,
        )
        .await;
        let booking = fixture::booking(
            svc,
            &listing,
            dates(-ended_days_ago - 3, -ended_days_ago),
            Status::Completed,
        )
        .await;
        (listing, booking)
    }

    fn submit(booking: &Booking, kind: Kind, overall: u8) -> SubmitReview {
        SubmitReview {
            booking_id: booking.id,
            reviewer_id: booking.user_of(kind.author()),
            kind,
            overall: Score::new(overall).unwrap(),
            details: None,
            text: review::Text::new("Smooth rental"),
            feedback: review::Feedback::new("Bring a towel next time"),
        }
    }

    async fn user_rating(svc: &TestService, booking: &Booking) -> Rating {
        svc.database()
            .execute(Select(By::<Rating, _>::new(booking.renter_id)))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn single_review_stays_hidden_within_grace() {
        let svc = fixture::service();
        let (listing, booking) = completed(&svc, 10).await;

        let review = svc
            .execute(submit(&booking, Kind::Listing, 5))
            .await
            .unwrap();

        assert!(!review.is_published());
        assert_eq!(review.reviewee_id, listing.owner_id);
        let stored = fixture::reload_booking(&svc, booking.id).await;
        assert!(stored.is_reviewed_by(booking::Party::Renter));
        assert!(!stored.is_reviewed_by(booking::Party::Owner));
        assert_eq!(fixture::reload_listing(&svc, listing.id).await.rating.total, 0);
        assert!(svc.notifier().sent().await.is_empty());
    }

    #[tokio::test]
    async fn counterpart_publishes_both() {
        let svc = fixture::service();
        let (listing, booking) = completed(&svc, 10).await;
        let first = svc
            .execute(submit(&booking, Kind::Listing, 4))
            .await
            .unwrap();

        let second = svc
            .execute(submit(&booking, Kind::Renter, 5))
            .await
            .unwrap();

        assert!(second.is_published());
        let reviews = svc
            .database()
            .execute(Select(By::<Vec<review::Review>, _>::new(booking.id)))
            .await
            .unwrap();
        assert_eq!(reviews.len(), 2);
        assert!(reviews.iter().all(|r| r.published_at == second.published_at));
        assert!(reviews.iter().any(|r| r.id == first.id));

        let listing = fixture::reload_listing(&svc, listing.id).await;
        assert_eq!(listing.rating.total, 1);
        assert_eq!(listing.rating.average, Some(Decimal::new(4, 0)));
        let renter = user_rating(&svc, &booking).await;
        assert_eq!(renter.total, 1);
        assert_eq!(renter.average, Some(Decimal::new(5, 0)));

        assert_eq!(
            svc.notifier().templates_of(booking.owner_id).await,
            [Template::ReviewPublished],
        );
        assert_eq!(
            svc.notifier().templates_of(booking.renter_id).await,
            [Template::ReviewPublished],
        );
    }

    #[tokio::test]
    async fn publishes_alone_after_grace() {
        let svc = fixture::service();
        let (listing, booking) = completed(&svc, 15).await;

        let review = svc
            .execute(submit(&booking, Kind::Listing, 3))
            .await
            .unwrap();

        assert!(review.is_published());
        let listing = fixture::reload_listing(&svc, listing.id).await;
        assert_eq!(listing.rating.average, Some(Decimal::new(3, 0)));
    }

    #[tokio::test]
    async fn rejects_duplicate() {
        let svc = fixture::service();
        let (_, booking) = completed(&svc, 2).await;
        _ = svc
            .execute(submit(&booking, Kind::Listing, 5))
            .await
            .unwrap();

        let err = svc
            .execute(submit(&booking, Kind::Listing, 1))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::AlreadyReviewed(_)));
    }

    #[tokio::test]
    async fn rejects_wrong_party_and_unfinished_booking() {
        let svc = fixture::service();
        let (listing, completed) = completed(&svc, 2).await;

        let err = svc
            .execute(SubmitReview {
                reviewer_id: completed.owner_id,
                ..submit(&completed, Kind::Listing, 5)
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::WrongParty(booking::Party::Owner, Kind::Listing),
        ));

        let ongoing =
            fixture::booking(&svc, &listing, dates(1, 3), Status::Confirmed)
                .await;
        let err = svc
            .execute(submit(&ongoing, Kind::Listing, 5))
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::BookingNotCompleted(Status::Confirmed),
        ));
    }

    #[tokio::test]
    async fn rejects_foreign_details() {
        let svc = fixture::service();
        let (_, booking) = completed(&svc, 2).await;

        let err = svc
            .execute(SubmitReview {
                details: Some(review::Details::empty(Kind::Renter)),
                ..submit(&booking, Kind::Listing, 5)
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::DetailsMismatch(Kind::Listing),
        ));
    }
}
