//! [`Command`] for approving a requested [`Booking`].

use std::collections::BTreeMap;

use common::operations::{
    By, Commit, Dispatch, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{booking, listing, user, Booking, Listing},
    infra::{database, notification, Database, Dispatcher},
    read::booking::Occupying,
    Service,
};

use super::{create_booking::OVERLAP_CONSTRAINT, Command};

/// [`Command`] for approving a requested [`Booking`].
#[derive(Clone, Copy, Debug)]
pub struct ApproveBooking {
    /// ID of the [`Booking`] to be approved.
    pub booking_id: booking::Id,

    /// ID of the user approving the [`Booking`].
    pub initiator_id: user::Id,
}

impl<Db, Pg, Nt> Command<ApproveBooking> for Service<Db, Pg, Nt>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Booking>, booking::Id>>,
            Ok = Option<Booking>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Listing, listing::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<booking::Id>, Occupying>>,
            Ok = Vec<booking::Id>,
            Err = Traced<database::Error>,
        > + Database<
            Update<booking::Transition>,
            Ok = bool,
            Err = Traced<database::Error>,
        > + Database<
            Update<(listing::Id, listing::Counter)>,
            Ok = bool,
            Err = Traced<database::Error>,
        > + Database<Commit, Err = Traced<database::Error>>,
    Nt: Dispatcher<
        Dispatch<notification::Notification>,
        Ok = (),
        Err = Traced<notification::Error>,
    >,
{
    type Ok = Booking;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: ApproveBooking) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ApproveBooking {
            booking_id,
            initiator_id,
        } = cmd;

        let mut booking = self
            .database()
            .execute(Select(By::<Option<Booking>, _>::new(booking_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::BookingNotExists(booking_id))
            .map_err(tracerr::wrap!())?;
        let (_, from) = booking
            .apply(booking::Event::Approve, initiator_id)
            .map_err(tracerr::from_and_wrap!(=> E))?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent bookings of the same `Listing`.
        tx.execute(Lock(By::new(booking.listing_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let occupying = Occupying {
            listing_id: booking.listing_id,
            dates: booking.dates,
            except: Some(booking_id),
        };
        if !tx
            .execute(Select(By::<Vec<booking::Id>, _>::new(occupying)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .is_empty()
        {
            return Err(tracerr::new!(E::ListingUnavailable(
                booking.listing_id
            )));
        }

        let swapped = tx
            .execute(Update(booking::Transition {
                booking: booking.clone(),
                from,
            }))
            .await
            .map_err(|e| {
                if e.as_ref().is_exclusion_violation(OVERLAP_CONSTRAINT) {
                    tracerr::new!(E::ListingUnavailable(booking.listing_id))
                } else {
                    tracerr::map_from(e)
                }
            })?;
        if !swapped {
            return Err(tracerr::new!(E::StatusChanged(booking_id)));
        }

        _ = tx
            .execute(Update((booking.listing_id, listing::Counter::Bookings)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        self.notify(
            booking.renter_id,
            notification::Template::BookingConfirmed,
            BTreeMap::from([
                ("booking_id", booking.id.to_string()),
                ("start_date", booking.dates.start().to_string()),
                ("end_date", booking.dates.end().to_string()),
            ]),
        )
        .await;

        Ok(booking)
    }
}

/// Error of [`ApproveBooking`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Booking`] with the provided ID does not exist.
    #[display("`Booking(id: {_0})` does not exist")]
    #[from(ignore)]
    BookingNotExists(#[error(not(source))] booking::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Listing`] is already booked for (some of) the [`Booking`] dates.
    #[display("`Listing(id: {_0})` is unavailable for the requested dates")]
    #[from(ignore)]
    ListingUnavailable(#[error(not(source))] listing::Id),

    /// [`Booking`] status was changed concurrently.
    #[display("`Booking(id: {_0})` was changed concurrently")]
    #[from(ignore)]
    StatusChanged(#[error(not(source))] booking::Id),

    /// Transition is not allowed.
    #[display("{_0}")]
    Transition(booking::TransitionError),
}

#[cfg(test)]
mod spec {
    use crate::{
        domain::{
            booking::{Status, TransitionError},
            listing::{BookingMode, CancellationPolicy},
        },
        fixture::{self, dates},
        infra::notification::Template,
        Command as _,
    };

    use super::{ApproveBooking, ExecutionError};

    #[tokio::test]
    async fn owner_confirms_pending_booking() {
        let svc = fixture::service();
        let listing = fixture::listing(
            &svc,
            BookingMode::Request,
            CancellationPolicy::Flexible,
        )
        .await;
        let booking =
            fixture::booking(&svc, &listing, dates(5, 8), Status::Pending)
                .await;

        let approved = svc
            .execute(ApproveBooking {
                booking_id: booking.id,
                initiator_id: listing.owner_id,
            })
            .await
            .unwrap();

        assert_eq!(approved.status, Status::Confirmed);
        assert!(approved.confirmed_at.is_some());
        let stored = fixture::reload_booking(&svc, booking.id).await;
        assert_eq!(stored.status, Status::Confirmed);
        assert_eq!(
            fixture::reload_listing(&svc, listing.id).await.booking_count,
            1,
        );
        assert_eq!(
            svc.notifier().templates_of(booking.renter_id).await,
            [Template::BookingConfirmed],
        );
    }

    #[tokio::test]
    async fn ignores_failed_notifications() {
        let svc = fixture::service();
        let listing = fixture::listing(
            &svc,
            BookingMode::Request,
            CancellationPolicy::Flexible,
        )
        .await;
        let booking =
            fixture::booking(&svc, &listing, dates(5, 8), Status::Pending)
                .await;
        svc.notifier().set_failing(true);

        let approved = svc
            .execute(ApproveBooking {
                booking_id: booking.id,
                initiator_id: listing.owner_id,
            })
            .await
            .unwrap();

        assert_eq!(approved.status, Status::Confirmed);
        assert!(svc.notifier().sent().await.is_empty());
    }

    #[tokio::test]
    async fn renter_cannot_approve() {
        let svc = fixture::service();
        let listing = fixture::listing(
            &svc,
            BookingMode::Request,
            CancellationPolicy::Flexible,
        )
        .await;
        let booking =
            fixture::booking(&svc, &listing, dates(5, 8), Status::Pending)
                .await;

        let err = svc
            .execute(ApproveBooking {
                booking_id: booking.id,
                initiator_id: booking.renter_id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::Transition(TransitionError::NotPermitted(..)),
        ));
    }

    #[tokio::test]
    async fn rechecks_availability() {
        let svc = fixture::service();
        let listing = fixture::listing(
            &svc,
            BookingMode::Request,
            CancellationPolicy::Flexible,
        )
        .await;
        let pending =
            fixture::booking(&svc, &listing, dates(5, 8), Status::Pending)
                .await;
        _ = fixture::booking(&svc, &listing, dates(8, 10), Status::Confirmed)
            .await;

        let err = svc
            .execute(ApproveBooking {
                booking_id: pending.id,
                initiator_id: listing.owner_id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::ListingUnavailable(_),
        ));
        assert_eq!(
            fixture::reload_booking(&svc, pending.id).await.status,
            Status::Pending,
        );
    }

    #[tokio::test]
    async fn terminal_booking_cannot_be_approved() {
        let svc = fixture::service();
        let listing = fixture::listing(
            &svc,
            BookingMode::Request,
            CancellationPolicy::Flexible,
        )
        .await;
        let booking =
            fixture::booking(&svc, &listing, dates(5, 8), Status::Declined)
                .await;

        let err = svc
            .execute(ApproveBooking {
                booking_id: booking.id,
                initiator_id: listing.owner_id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::Transition(TransitionError::InvalidState(
                Status::Declined,
                _,
            )),
        ));
    }
}
