//! [`ReleasePendingDeposits`] [`Task`].

use std::{convert::Infallible, error::Error, time};

use common::operations::{By, Perform, Release, Select, Start, Update};
use smart_default::SmartDefault;
use tokio::time::interval;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{booking, payment::IntentId, Booking},
    infra::{database, payment, Database, Gateway},
    read, Service,
};

use super::Task;

/// Configuration for [`ReleasePendingDeposits`] [`Task`].
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct Config {
    /// Interval between release rounds.
    #[default(time::Duration::from_secs(15 * 60))]
    pub interval: time::Duration,
}

/// [`Task`] retrying the deposit releases of terminal [`Booking`]s, which
/// failed when the [`Booking`]s were finished.
#[derive(Clone, Copy, Debug)]
pub struct ReleasePendingDeposits<S> {
    /// [`Config`] of this [`Task`].
    config: Config,

    /// [`Service`] instance.
    service: S,
}

impl<Db, Pg, Nt> Task<Start<By<ReleasePendingDeposits<Self>, Config>>>
    for Service<Db, Pg, Nt>
where
    ReleasePendingDeposits<Self>:
        Task<Perform<()>, Ok = (), Err: Error> + 'static,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<ReleasePendingDeposits<Self>, Config>>,
    ) -> Result<Self::Ok, Self::Err> {
        let config = by.into_inner();
        let task = ReleasePendingDeposits {
            config,
            service: self.clone(),
        };

        let mut interval = interval(task.config.interval);
        loop {
            let _ = interval.tick().await;
            _ = task.execute(Perform(())).await.map_err(|e| {
                log::error!("`task::ReleasePendingDeposits` failed: {e}");
            });
        }
    }
}

impl<Db, Pg, Nt> Task<Perform<()>> for ReleasePendingDeposits<Service<Db, Pg, Nt>>
where
    Db: Database<
            Select<By<Vec<Booking>, read::booking::PendingRelease>>,
            Ok = Vec<Booking>,
            Err = Traced<database::Error>,
        > + Database<
            Update<booking::Settle>,
            Ok = bool,
            Err = Traced<database::Error>,
        > + Database<
            Update<booking::Unsettle>,
            Ok = bool,
            Err = Traced<database::Error>,
        >,
    Pg: Gateway<Release<IntentId>, Ok = (), Err = Traced<payment::Error>>,
{
    type Ok = ();
    type Err = ExecutionError;

    async fn execute(&self, _: Perform<()>) -> Result<Self::Ok, Self::Err> {
        let pending = self
            .service
            .database()
            .execute(Select(By::<Vec<Booking>, _>::new(
                read::booking::PendingRelease,
            )))
            .await
            .map_err(tracerr::wrap!())?;

        for mut booking in pending {
            self.service.release_deposit(&mut booking).await;
        }

        Ok(())
    }
}

/// Error of [`ReleasePendingDeposits`] execution.
pub type ExecutionError = Traced<database::Error>;

#[cfg(test)]
mod spec {
    use common::operations::{Perform, Update};

    use crate::{
        domain::{
            booking::{self, Status},
            listing::{BookingMode, CancellationPolicy},
            Booking,
        },
        fixture::{self, dates},
        infra::Database as _,
    };

    use super::{Config, ReleasePendingDeposits, Task as _};

    #[tokio::test]
    async fn retries_failed_releases() {
        let svc = fixture::service();
        let listing = fixture::listing(
            &svc,
            BookingMode::Instant,
            CancellationPolicy::Flexible,
        )
        .await;
        let declined =
            fixture::booking(&svc, &listing, dates(3, 5), Status::Declined)
                .await;
        let active =
            fixture::booking(&svc, &listing, dates(7, 9), Status::Confirmed)
                .await;
        let captured =
            fixture::booking(&svc, &listing, dates(-9, -6), Status::InProgress)
                .await;
        assert!(svc
            .database()
            .execute(Update(booking::Settle {
                booking_id: captured.id,
                settlement: booking::Settlement::Capture(fixture::usd("50")),
            }))
            .await
            .unwrap());
        assert!(svc
            .database()
            .execute(Update(booking::Transition {
                booking: Booking {
                    status: Status::Completed,
                    ..captured.clone()
                },
                from: Status::InProgress,
            }))
            .await
            .unwrap());
        let task = ReleasePendingDeposits {
            config: Config::default(),
            service: svc.clone(),
        };

        svc.payments().set_available(false);
        task.execute(Perform(())).await.unwrap();
        let stored = fixture::reload_booking(&svc, declined.id).await;
        assert!(stored.has_outstanding_hold());

        svc.payments().set_available(true);
        task.execute(Perform(())).await.unwrap();

        let stored = fixture::reload_booking(&svc, declined.id).await;
        assert!(stored.deposit.released_at.is_some());
        let hold_id = declined.deposit.hold_id.unwrap();
        assert!(svc.payments().intent(&hold_id).await.unwrap().released);
        let stored = fixture::reload_booking(&svc, active.id).await;
        assert!(stored.deposit.released_at.is_none());
        let stored = fixture::reload_booking(&svc, captured.id).await;
        assert!(stored.deposit.released_at.is_none());
    }
}
