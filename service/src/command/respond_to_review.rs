//! [`Command`] for responding to a [`Review`].

use common::{
    operations::{By, Select, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{review, user, Review},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for responding to a [`review::Kind::Listing`] [`Review`] by
/// the owner of the reviewed equipment.
#[derive(Clone, Debug)]
pub struct RespondToReview {
    /// ID of the [`Review`] to respond to.
    pub review_id: review::Id,

    /// ID of the user responding.
    pub initiator_id: user::Id,

    /// [`review::ResponseText`] of the response.
    pub text: review::ResponseText,
}

impl<Db, Pg, Nt> Command<RespondToReview> for Service<Db, Pg, Nt>
where
    Db: Database<
            Select<By<Option<Review>, review::Id>>,
            Ok = Option<Review>,
            Err = Traced<database::Error>,
        > + Database<
            Update<(review::Id, review::Response)>,
            Ok = (),
            Err = Traced<database::Error>,
        >,
{
    type Ok = Review;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: RespondToReview,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RespondToReview {
            review_id,
            initiator_id,
            text,
        } = cmd;

        let mut review = self
            .database()
            .execute(Select(By::<Option<Review>, _>::new(review_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ReviewNotExists(review_id))
            .map_err(tracerr::wrap!())?;
        if review.kind != review::Kind::Listing
            || review.reviewee_id != initiator_id
        {
            return Err(tracerr::new!(E::NotReviewee(review_id)));
        }

        let response = review
            .respond(text, DateTime::now())
            .map_err(|e| tracerr::new!(E::Response(e)))?
            .clone();
        self.database()
            .execute(Update((review_id, response)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(review)
    }
}

/// Error of [`RespondToReview`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Initiator is not the owner reviewed by the [`Review`].
    #[display("Only the reviewed owner may respond to `Review(id: {_0})`")]
    #[from(ignore)]
    NotReviewee(#[error(not(source))] review::Id),

    /// [`review::Response`] can't be given.
    #[display("{_0}")]
    #[from(ignore)]
    Response(#[error(not(source))] review::ResponseError),

    /// [`Review`] with the provided ID does not exist.
    #[display("`Review(id: {_0})` does not exist")]
    #[from(ignore)]
    ReviewNotExists(#[error(not(source))] review::Id),
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::{
        operations::{Insert, Update},
        DateTime,
    };

    use crate::{
        domain::{
            booking,
            listing::{BookingMode, CancellationPolicy},
            rating::Score,
            review::{self, Kind, ResponseError, ResponseText},
            Review,
        },
        fixture::{self, TestService},
        infra::Database as _,
        Command as _,
    };

    use super::{ExecutionError, RespondToReview};

    async fn review(svc: &TestService, kind: Kind, published: bool) -> Review {
        let listing = fixture::listing(
            svc,
            BookingMode::Instant,
            CancellationPolicy::Flexible,
        )
        .await;
        let renter = crate::domain::user::Id::new();
        let (reviewer_id, reviewee_id) = match kind {
            Kind::Listing => (renter, listing.owner_id),
            Kind::Renter => (listing.owner_id, renter),
        };
        let review = Review {
            id: review::Id::new(),
            booking_id: booking::Id::new(),
            listing_id: listing.id,
            reviewer_id,
            reviewee_id,
            kind,
            overall: Score::new(2).unwrap(),
            details: review::Details::empty(kind),
            text: review::Text::new("Grips were worn"),
            feedback: None,
            response: None,
            published_at: published.then(|| DateTime::now().coerce()),
            flagged_at: None,
            created_at: DateTime::now().coerce(),
        };
        svc.database().execute(Insert(review.clone())).await.unwrap();
        review
    }

    fn respond(review: &Review, text: &str) -> RespondToReview {
        RespondToReview {
            review_id: review.id,
            initiator_id: review.reviewee_id,
            text: ResponseText::new(text).unwrap(),
        }
    }

    #[tokio::test]
    async fn owner_responds_and_edits() {
        let svc = fixture::service();
        let review = review(&svc, Kind::Listing, true).await;

        let first = svc
            .execute(respond(&review, "Regripped since"))
            .await
            .unwrap()
            .response
            .unwrap();
        let edited = svc
            .execute(respond(&review, "Regripped all irons since"))
            .await
            .unwrap()
            .response
            .unwrap();

        assert_eq!(edited.text.to_string(), "Regripped all irons since");
        assert_eq!(edited.responded_at, first.responded_at);
        assert_eq!(
            edited.locked_at,
            (first.responded_at.coerce::<()>()
                + review::RESPONSE_EDIT_WINDOW)
                .coerce(),
        );
    }

    #[tokio::test]
    async fn locked_response_is_immutable() {
        let svc = fixture::service();
        let review = review(&svc, Kind::Listing, true).await;
        let past = DateTime::now() - Duration::from_secs(49 * 60 * 60);
        svc.database()
            .execute(Update((
                review.id,
                review::Response {
                    text: ResponseText::new("Old reply").unwrap(),
                    responded_at: past.coerce(),
                    locked_at: (past + review::RESPONSE_EDIT_WINDOW).coerce(),
                },
            )))
            .await
            .unwrap();

        let err = svc
            .execute(respond(&review, "New reply"))
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::Response(ResponseError::Locked),
        ));
    }

    #[tokio::test]
    async fn only_reviewed_owner_responds_to_published() {
        let svc = fixture::service();

        let hidden = review(&svc, Kind::Listing, false).await;
        let err = svc.execute(respond(&hidden, "Hi")).await.unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::Response(ResponseError::NotPublished),
        ));

        let renter_review = review(&svc, Kind::Renter, true).await;
        let err = svc
            .execute(respond(&renter_review, "Hi"))
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::NotReviewee(_)));

        let listing_review = review(&svc, Kind::Listing, true).await;
        let err = svc
            .execute(RespondToReview {
                initiator_id: listing_review.reviewer_id,
                ..respond(&listing_review, "Hi")
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::NotReviewee(_)));
    }
}
