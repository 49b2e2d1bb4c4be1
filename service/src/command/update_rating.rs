//! [`Command`] for recomputing a [`Rating`].

use common::operations::{By, Select, Update};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        listing,
        rating::{Score, Target},
        user, Rating,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for recomputing the [`Rating`] of a [`Target`] out of all its
/// published review [`Score`]s.
#[derive(Clone, Copy, Debug)]
pub struct UpdateRating {
    /// [`Target`] to recompute the [`Rating`] of.
    pub target: Target,
}

impl<Db, Pg, Nt> Command<UpdateRating> for Service<Db, Pg, Nt>
where
    Db: Database<
            Select<By<Vec<Score>, listing::Id>>,
            Ok = Vec<Score>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Score>, user::Id>>,
            Ok = Vec<Score>,
            Err = Traced<database::Error>,
        > + Database<
            Update<(listing::Id, Rating)>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Update<(user::Id, Rating)>,
            Ok = (),
            Err = Traced<database::Error>,
        >,
{
    type Ok = Rating;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: UpdateRating) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let rating = match cmd.target {
            Target::Listing(id) => {
                let scores = self
                    .database()
                    .execute(Select(By::<Vec<Score>, _>::new(id)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?;
                let rating = Rating::aggregate(scores);
                self.database()
                    .execute(Update((id, rating)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?;
                rating
            }
            Target::User(id) => {
                let scores = self
                    .database()
                    .execute(Select(By::<Vec<Score>, _>::new(id)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?;
                let rating = Rating::aggregate(scores);
                self.database()
                    .execute(Update((id, rating)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?;
                rating
            }
        };
        Ok(rating)
    }
}

/// Error of [`UpdateRating`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),
}

#[cfg(test)]
mod spec {
    use common::{
        operations::{By, Insert, Select},
        DateTime,
    };
    use rust_decimal::Decimal;

    use crate::{
        domain::{
            booking,
            listing::{BookingMode, CancellationPolicy},
            rating::{Score, Target},
            review, user, Listing, Rating, Review,
        },
        fixture,
        infra::Database as _,
        Command as _,
    };

    use super::UpdateRating;

    fn review(listing: &Listing, overall: u8, published: bool) -> Review {
        Review {
            id: review::Id::new(),
            booking_id: booking::Id::new(),
            listing_id: listing.id,
            reviewer_id: user::Id::new(),
            reviewee_id: listing.owner_id,
            kind: review::Kind::Listing,
            overall: Score::new(overall).unwrap(),
            details: review::Details::empty(review::Kind::Listing),
            text: None,
            feedback: None,
            response: None,
            published_at: published.then(|| DateTime::now().coerce()),
            flagged_at: None,
            created_at: DateTime::now().coerce(),
        }
    }

    #[tokio::test]
    async fn aggregates_published_scores_only() {
        let svc = fixture::service();
        let listing = fixture::listing(
            &svc,
            BookingMode::Instant,
            CancellationPolicy::Flexible,
        )
        .await;
        for (overall, published) in [(5, true), (4, true), (4, true), (1, false)]
        {
            svc.database()
                .execute(Insert(review(&listing, overall, published)))
                .await
                .unwrap();
        }

        let rating = svc
            .execute(UpdateRating {
                target: Target::Listing(listing.id),
            })
            .await
            .unwrap();

        assert_eq!(rating.total, 3);
        assert_eq!(rating.average, Some("4.33".parse::<Decimal>().unwrap()));
        assert_eq!(
            fixture::reload_listing(&svc, listing.id).await.rating,
            rating,
        );

        let owner = svc
            .execute(UpdateRating {
                target: Target::User(listing.owner_id),
            })
            .await
            .unwrap();
        assert_eq!(owner, rating);
        let stored = svc
            .database()
            .execute(Select(By::<Rating, _>::new(listing.owner_id)))
            .await
            .unwrap();
        assert_eq!(stored, rating);
    }

    #[tokio::test]
    async fn is_idempotent() {
        let svc = fixture::service();
        let listing = fixture::listing(
            &svc,
            BookingMode::Instant,
            CancellationPolicy::Flexible,
        )
        .await;
        svc.database()
            .execute(Insert(review(&listing, 3, true)))
            .await
            .unwrap();
        let update = UpdateRating {
            target: Target::Listing(listing.id),
        };

        let first = svc.execute(update).await.unwrap();
        let second = svc.execute(update).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn unrated_user_has_no_average() {
        let svc = fixture::service();

        let rating = svc
            .execute(UpdateRating {
                target: Target::User(user::Id::new()),
            })
            .await
            .unwrap();

        assert_eq!(rating, Rating::default());
    }
}
