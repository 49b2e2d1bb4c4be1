//! [`Command`] for flagging a [`Review`] for moderation.

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

/// [`Command`] for flagging a published [`Review`] for moderation by its
/// reviewee.
#[derive(Clone, Copy, Debug)]
pub struct FlagReview {
    /// ID of the [`Review`] to flag.
    pub review_id: review::Id,

    /// ID of the user flagging the [`Review`].
    pub initiator_id: user::Id,
}

impl<Db, Pg, Nt> Command<FlagReview> for Service<Db, Pg, Nt>
where
    Db: Database<
            Select<By<Option<Review>, review::Id>>,
            Ok = Option<Review>,
            Err = Traced<database::Error>,
        > + Database<
            Update<(review::Id, review::FlagDateTime)>,
            Ok = (),
            Err = Traced<database::Error>,
        >,
{
    type Ok = Review;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: FlagReview) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let FlagReview {
            review_id,
            initiator_id,
        } = cmd;

        let mut review = self
            .database()
            .execute(Select(By::<Option<Review>, _>::new(review_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ReviewNotExists(review_id))
            .map_err(tracerr::wrap!())?;
        if review.reviewee_id != initiator_id {
            return Err(tracerr::new!(E::NotReviewee(review_id)));
        }
        if !review.is_published() {
            return Err(tracerr::new!(E::NotPublished(review_id)));
        }
        if review.flagged_at.is_some() {
            return Ok(review);
        }

        let flagged_at: review::FlagDateTime = DateTime::now().coerce();
        self.database()
            .execute(Update((review_id, flagged_at)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        review.flagged_at = Some(flagged_at);

        Ok(review)
    }
}

/// Error of [`FlagReview`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Review`] is not published yet.
    #[display("`Review(id: {_0})` is not published yet")]
    #[from(ignore)]
    NotPublished(#[error(not(source))] review::Id),

    /// Initiator is not the reviewee of the [`Review`].
    #[display("Only the reviewee may flag `Review(id: {_0})`")]
    #[from(ignore)]
    NotReviewee(#[error(not(source))] review::Id),

    /// [`Review`] with the provided ID does not exist.
    #[display("`Review(id: {_0})` does not exist")]
    #[from(ignore)]
    ReviewNotExists(#[error(not(source))] review::Id),
}
