//! [`PublishOverdueReviews`] [`Task`].

use std::{collections::HashSet, convert::Infallible, error::Error, time};

use common::{
    operations::{By, Dispatch, Perform, Select, Start, Update},
    Date, DateTime,
};
use smart_default::SmartDefault;
use tokio::time::interval;
use tracerr::Traced;
use tracing as log;

use crate::{
    command::{update_rating, UpdateRating},
    domain::{booking, review, Rating, Review},
    infra::{database, notification, Database, Dispatcher},
    read, Command, Service,
};

use super::Task;

/// Configuration for [`PublishOverdueReviews`] [`Task`].
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct Config {
    /// Interval between publication rounds.
    #[default(time::Duration::from_secs(60 * 60))]
    pub interval: time::Duration,
}

/// [`Task`] publishing the [`Review`]s whose counterpart never came, once the
/// [`review::PUBLICATION_GRACE`] after their booking end has passed.
#[derive(Clone, Copy, Debug)]
pub struct PublishOverdueReviews<S> {
    /// [`Config`] of this [`Task`].
    config: Config,

    /// [`Service`] instance.
    service: S,
}

impl<Db, Pg, Nt> Task<Start<By<PublishOverdueReviews<Self>, Config>>>
    for Service<Db, Pg, Nt>
where
    PublishOverdueReviews<Self>:
        Task<Perform<()>, Ok = usize, Err: Error> + 'static,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<PublishOverdueReviews<Self>, Config>>,
    ) -> Result<Self::Ok, Self::Err> {
        let config = by.into_inner();
        let task = PublishOverdueReviews {
            config,
            service: self.clone(),
        };

        let mut interval = interval(task.config.interval);
        loop {
            let _ = interval.tick().await;
            match task.execute(Perform(())).await {
                Ok(0) => {}
                Ok(n) => log::info!("`task::PublishOverdueReviews` published {n} reviews"),
                Err(e) => {
                    log::error!("`task::PublishOverdueReviews` failed: {e}");
                }
            }
        }
    }
}

impl<Db, Pg, Nt> Task<Perform<()>> for PublishOverdueReviews<Service<Db, Pg, Nt>>
where
    Db: Database<
            Select<By<Vec<Review>, read::review::Overdue>>,
            Ok = Vec<Review>,
            Err = Traced<database::Error>,
        > + Database<
            Update<(booking::Id, review::PublicationDateTime)>,
            Ok = Vec<Review>,
            Err = Traced<database::Error>,
        >,
    Nt: Dispatcher<
        Dispatch<notification::Notification>,
        Ok = (),
        Err = Traced<notification::Error>,
    >,
    Service<Db, Pg, Nt>: Command<
        UpdateRating,
        Ok = Rating,
        Err = Traced<update_rating::ExecutionError>,
    >,
{
    type Ok = usize;
    type Err = ExecutionError;

    async fn execute(&self, _: Perform<()>) -> Result<Self::Ok, Self::Err> {
        let now = DateTime::now();
        let ended_by = Date::of(now - review::PUBLICATION_GRACE);

        let overdue = self
            .service
            .database()
            .execute(Select(By::<Vec<Review>, _>::new(read::review::Overdue {
                ended_by,
            })))
            .await
            .map_err(tracerr::wrap!())?;

        let bookings = overdue
            .iter()
            .map(|r| r.booking_id)
            .collect::<HashSet<_>>();
        let published_at: review::PublicationDateTime = now.coerce();
        let mut published = Vec::with_capacity(overdue.len());
        for booking_id in bookings {
            published.extend(
                self.service
                    .database()
                    .execute(Update((booking_id, published_at)))
                    .await
                    .map_err(tracerr::wrap!())?,
            );
        }

        self.service.announce_published(&published).await;

        Ok(published.len())
    }
}

/// Error of [`PublishOverdueReviews`] execution.
pub type ExecutionError = Traced<database::Error>;

#[cfg(test)]
mod spec {
    use common::{
        operations::{By, Insert, Perform, Select},
        DateTime,
    };

    use crate::{
        domain::{
            booking::{self, Status},
            listing::{BookingMode, CancellationPolicy},
            rating::Score,
            review::{self, Kind},
            Booking, Review,
        },
        fixture::{self, dates, TestService},
        infra::{notification::Template, Database as _},
    };

    use super::{Config, PublishOverdueReviews, Task as _};

    async fn hidden_review(svc: &TestService, booking: &Booking) -> Review {
        let review = Review {
            id: review::Id::new(),
            booking_id: booking.id,
            listing_id: booking.listing_id,
            reviewer_id: booking.renter_id,
            reviewee_id: booking.owner_id,
            kind: Kind::Listing,
            overall: Score::new(5).unwrap(),
            details: review::Details::empty(Kind::Listing),
            text: None,
            feedback: None,
            response: None,
            published_at: None,
            flagged_at: None,
            created_at: DateTime::now().coerce(),
        };
        svc.database().execute(Insert(review.clone())).await.unwrap();
        review
    }

    async fn reviews_of(svc: &TestService, id: booking::Id) -> Vec<Review> {
        svc.database()
            .execute(Select(By::<Vec<Review>, _>::new(id)))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn publishes_reviews_past_grace_only() {
        let svc = fixture::service();
        let listing = fixture::listing(
            &svc,
            BookingMode::Instant,
            CancellationPolicy::Flexible,
        )
        .await;
        let recent =
            fixture::booking(&svc, &listing, dates(-8, -5), Status::Completed)
                .await;
        let old =
            fixture::booking(&svc, &listing, dates(-20, -16), Status::Completed)
                .await;
        _ = hidden_review(&svc, &recent).await;
        _ = hidden_review(&svc, &old).await;
        let task = PublishOverdueReviews {
            config: Config::default(),
            service: svc.clone(),
        };

        let published = task.execute(Perform(())).await.unwrap();

        assert_eq!(published, 1);
        assert!(reviews_of(&svc, old.id).await.iter().all(Review::is_published));
        assert!(!reviews_of(&svc, recent.id).await[0].is_published());
        assert_eq!(
            svc.notifier().templates_of(listing.owner_id).await,
            [Template::ReviewPublished],
        );
        let listing = fixture::reload_listing(&svc, listing.id).await;
        assert_eq!(listing.rating.total, 1);

        assert_eq!(task.execute(Perform(())).await.unwrap(), 0);
    }
}
