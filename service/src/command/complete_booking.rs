//! [`Command`] for completing a [`Booking`].

use std::collections::BTreeMap;

use common::operations::{By, Dispatch, Release, Select, Update};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{booking, payment::IntentId, user, Booking},
    infra::{database, notification, payment, Database, Dispatcher, Gateway},
    Service,
};

use super::Command;

/// [`Command`] for marking a [`Booking`] rental as finished.
///
/// Releases the deposit hold (unless captured) and invites both parties to
/// review each other.
#[derive(Clone, Copy, Debug)]
pub struct CompleteBooking {
    /// ID of the [`Booking`] to be completed.
    pub booking_id: booking::Id,

    /// ID of the user completing the [`Booking`].
    pub initiator_id: user::Id,
}

impl<Db, Pg, Nt> Command<CompleteBooking> for Service<Db, Pg, Nt>
where
    Db: Database<
            Select<By<Option<Booking>, booking::Id>>,
            Ok = Option<Booking>,
            Err = Traced<database::Error>,
        > + Database<
            Update<booking::Transition>,
            Ok = bool,
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
    Nt: Dispatcher<
        Dispatch<notification::Notification>,
        Ok = (),
        Err = Traced<notification::Error>,
    >,
{
    type Ok = Booking;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CompleteBooking,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CompleteBooking {
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
            .apply(booking::Event::Complete, initiator_id)
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

        self.release_deposit(&mut booking).await;

        self.notify(
            booking.owner_id,
            notification::Template::Payout,
            BTreeMap::from([
                ("booking_id", booking.id.to_string()),
                ("owner_earnings", booking.pricing.owner_earnings.to_string()),
            ]),
        )
        .await;
        for user_id in [booking.renter_id, booking.owner_id] {
            self.notify(
                user_id,
                notification::Template::ReviewReminder,
                BTreeMap::from([("booking_id", booking.id.to_string())]),
            )
            .await;
        }

        Ok(booking)
    }
}

/// Error of [`CompleteBooking`] [`Command`] execution.
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
