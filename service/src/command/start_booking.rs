//! [`Command`] for handing the equipment of a [`Booking`] over.

use common::operations::{By, Select, Update};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{booking, user, Booking},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for marking the equipment of a confirmed [`Booking`] as
/// handed over to the renter.
#[derive(Clone, Copy, Debug)]
pub struct StartBooking {
    /// ID of the [`Booking`] to be started.
    pub booking_id: booking::Id,

    /// ID of the user starting the [`Booking`].
    pub initiator_id: user::Id,
}

impl<Db, Pg, Nt> Command<StartBooking> for Service<Db, Pg, Nt>
where
    Db: Database<
            Select<By<Option<Booking>, booking::Id>>,
            Ok = Option<Booking>,
            Err = Traced<database::Error>,
        > + Database<
            Update<booking::Transition>,
            Ok = bool,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Booking;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: StartBooking) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let StartBooking {
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
            .apply(booking::Event::Start, initiator_id)
            .map_err(tracerr::from_and_wrap!(=> E))?;

        let swapped = self
            .database()
            .execute(Update(booking::Transition {
                booking: booking.clone(),
                from,
            }))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if !swapped {
            return Err(tracerr::new!(E::StatusChanged(booking_id)));
        }

        Ok(booking)
    }
}

/// Error of [`StartBooking`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Booking`] with the provided ID does not exist.
    #[display("`Booking(id: {_0})` does not exist")]
    #[from(ignore)]
    BookingNotExists(#[error(not(source))] booking::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

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
        Command as _,
    };

    use super::{ExecutionError, StartBooking};

    #[tokio::test]
    async fn owner_hands_equipment_over() {
        let svc = fixture::service();
        let listing = fixture::listing(
            &svc,
            BookingMode::Instant,
            CancellationPolicy::Flexible,
        )
        .await;
        let booking =
            fixture::booking(&svc, &listing, dates(0, 2), Status::Confirmed)
                .await;

        let started = svc
            .execute(StartBooking {
                booking_id: booking.id,
                initiator_id: listing.owner_id,
            })
            .await
            .unwrap();

        assert_eq!(started.status, Status::InProgress);
        let stored = fixture::reload_booking(&svc, booking.id).await;
        assert_eq!(stored.status, Status::InProgress);
        assert!(stored.started_at.is_some());
    }

    #[tokio::test]
    async fn pending_booking_cannot_start() {
        let svc = fixture::service();
        let listing = fixture::listing(
            &svc,
            BookingMode::Request,
            CancellationPolicy::Flexible,
        )
        .await;
        let booking =
            fixture::booking(&svc, &listing, dates(0, 2), Status::Pending)
                .await;

        let err = svc
            .execute(StartBooking {
                booking_id: booking.id,
                initiator_id: listing.owner_id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::Transition(TransitionError::InvalidState(
                Status::Pending,
                _,
            )),
        ));
    }

    #[tokio::test]
    async fn unknown_booking() {
        let svc = fixture::service();

        let err = svc
            .execute(StartBooking {
                booking_id: crate::domain::booking::Id::new(),
                initiator_id: crate::domain::user::Id::new(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::BookingNotExists(_)));
    }
}
