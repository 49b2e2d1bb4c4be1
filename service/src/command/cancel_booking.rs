//! [`Command`] for cancelling a [`Booking`].

use std::collections::BTreeMap;

use common::{
    operations::{By, Dispatch, Refund, Release, Select, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{booking, listing, payment::IntentId, user, Booking, Listing},
    infra::{
        database, notification, payment, payment::Reimbursement, Database,
        Dispatcher, Gateway,
    },
    Service,
};

use super::Command;

/// [`Command`] for cancelling a [`Booking`] by any of its parties.
///
/// The renter is refunded according to the [`listing::CancellationPolicy`]
/// of the rented [`Listing`].
#[derive(Clone, Copy, Debug)]
pub struct CancelBooking {
    /// ID of the [`Booking`] to be cancelled.
    pub booking_id: booking::Id,

    /// ID of the user cancelling the [`Booking`].
    pub initiator_id: user::Id,
}

impl<Db, Pg, Nt> Command<CancelBooking> for Service<Db, Pg, Nt>
where
    Db: Database<
            Select<By<Option<Booking>, booking::Id>>,
            Ok = Option<Booking>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Listing>, listing::Id>>,
            Ok = Option<Listing>,
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
    Pg: Gateway<
            Refund<Reimbursement>,
            Ok = (),
            Err = Traced<payment::Error>,
        > + Gateway<Release<IntentId>, Ok = (), Err = Traced<payment::Error>>,
    Nt: Dispatcher<
        Dispatch<notification::Notification>,
        Ok = (),
        Err = Traced<notification::Error>,
    >,
{
    type Ok = Booking;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CancelBooking) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CancelBooking {
            booking_id,
            initiator_id,
        } = cmd;

        let original = self
            .database()
            .execute(Select(By::<Option<Booking>, _>::new(booking_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::BookingNotExists(booking_id))
            .map_err(tracerr::wrap!())?;
        _ = original
            .check(booking::Event::Cancel, initiator_id)
            .map_err(tracerr::from_and_wrap!(=> E))?;

        let listing = self
            .database()
            .execute(Select(By::<Option<Listing>, _>::new(original.listing_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ListingNotExists(original.listing_id))
            .map_err(tracerr::wrap!())?;

        let mut booking = original.clone();
        let (party, from) = booking
            .apply(booking::Event::Cancel, initiator_id)
            .map_err(tracerr::from_and_wrap!(=> E))?;
        let share = listing
            .cancellation_policy
            .refund_share(booking.dates.start().days_after(DateTime::now()));
        let refund = booking.pricing.total_amount.percent(share);
        if let Some(cancellation) = &mut booking.cancellation {
            cancellation.refund = refund;
        }

        // Claim the `Booking` before any money moves.
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

        if !refund.is_zero() {
            let reimbursement = Reimbursement {
                intent_id: booking.charge_id.clone(),
                amount: refund,
                reason: "booking cancelled",
            };
            if let Err(e) =
                self.payments().execute(Refund(reimbursement)).await
            {
                self.revert(original, booking::Status::Cancelled).await;
                return Err(e).map_err(tracerr::map_from_and_wrap!(=> E));
            }
        }

        self.release_deposit(&mut booking).await;

        self.notify(
            booking.user_of(party.counterparty()),
            notification::Template::BookingCancelled,
            BTreeMap::from([
                ("booking_id", booking.id.to_string()),
                ("cancelled_by", party.to_string()),
                ("refund_amount", refund.to_string()),
            ]),
        )
        .await;

        Ok(booking)
    }
}

/// Error of [`CancelBooking`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Booking`] with the provided ID does not exist.
    #[display("`Booking(id: {_0})` does not exist")]
    #[from(ignore)]
    BookingNotExists(#[error(not(source))] booking::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Listing`] of the [`Booking`] does not exist.
    #[display("`Listing(id: {_0})` does not exist")]
    #[from(ignore)]
    ListingNotExists(#[error(not(source))] listing::Id),

    /// Refund failed, the [`Booking`] stays in its previous status.
    #[display("Refund failed: {_0}")]
    Payment(payment::Error),

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
    use rust_decimal::Decimal;

    use crate::{
        domain::{
            booking::{Party, Status, TransitionError},
            listing::{BookingMode, CancellationPolicy},
        },
        fixture::{self, dates, usd},
        infra::{notification::Template, payment},
        Command as _,
    };

    use super::{CancelBooking, ExecutionError};

    #[tokio::test]
    async fn flexible_refunds_in_full() {
        let svc = fixture::service();
        let listing = fixture::listing(
            &svc,
            BookingMode::Instant,
            CancellationPolicy::Flexible,
        )
        .await;
        let booking =
            fixture::booking(&svc, &listing, dates(5, 8), Status::Confirmed)
                .await;

        let cancelled = svc
            .execute(CancelBooking {
                booking_id: booking.id,
                initiator_id: booking.renter_id,
            })
            .await
            .unwrap();

        assert_eq!(cancelled.status, Status::Cancelled);
        let cancellation = cancelled.cancellation.unwrap();
        assert_eq!(cancellation.by, Party::Renter);
        assert_eq!(cancellation.refund, usd("247.26"));

        let charge = svc.payments().intent(&booking.charge_id).await.unwrap();
        assert_eq!(charge.refunded, usd("247.26").amount);
        let hold_id = booking.deposit.hold_id.unwrap();
        assert!(svc.payments().intent(&hold_id).await.unwrap().released);

        let stored = fixture::reload_booking(&svc, booking.id).await;
        assert_eq!(stored.status, Status::Cancelled);
        assert!(stored.deposit.released_at.is_some());
        assert_eq!(
            svc.notifier().templates_of(listing.owner_id).await,
            [Template::BookingCancelled],
        );
        assert!(svc.notifier().templates_of(booking.renter_id).await.is_empty());
    }

    #[tokio::test]
    async fn strict_refunds_half_well_ahead() {
        let svc = fixture::service();
        let listing = fixture::listing(
            &svc,
            BookingMode::Instant,
            CancellationPolicy::Strict,
        )
        .await;
        let booking =
            fixture::booking(&svc, &listing, dates(10, 13), Status::Confirmed)
                .await;

        let cancelled = svc
            .execute(CancelBooking {
                booking_id: booking.id,
                initiator_id: listing.owner_id,
            })
            .await
            .unwrap();

        assert_eq!(cancelled.cancellation.unwrap().refund, usd("123.63"));
        assert_eq!(
            svc.notifier().templates_of(booking.renter_id).await,
            [Template::BookingCancelled],
        );
    }

    #[tokio::test]
    async fn late_cancellation_refunds_nothing() {
        let svc = fixture::service();
        let listing = fixture::listing(
            &svc,
            BookingMode::Instant,
            CancellationPolicy::Moderate,
        )
        .await;
        let booking =
            fixture::booking(&svc, &listing, dates(3, 6), Status::Confirmed)
                .await;

        let cancelled = svc
            .execute(CancelBooking {
                booking_id: booking.id,
                initiator_id: booking.renter_id,
            })
            .await
            .unwrap();

        assert!(cancelled.cancellation.unwrap().refund.is_zero());
        let charge = svc.payments().intent(&booking.charge_id).await.unwrap();
        assert_eq!(charge.refunded, Decimal::ZERO);
    }

    #[tokio::test]
    async fn failed_refund_keeps_booking() {
        let svc = fixture::service();
        let listing = fixture::listing(
            &svc,
            BookingMode::Instant,
            CancellationPolicy::Flexible,
        )
        .await;
        let booking =
            fixture::booking(&svc, &listing, dates(5, 8), Status::Confirmed)
                .await;
        svc.payments().set_available(false);

        let err = svc
            .execute(CancelBooking {
                booking_id: booking.id,
                initiator_id: booking.renter_id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::Payment(payment::Error::Transient(_)),
        ));
        let stored = fixture::reload_booking(&svc, booking.id).await;
        assert_eq!(stored.status, Status::Confirmed);
        assert!(stored.cancellation.is_none());
        assert!(stored.deposit.released_at.is_none());
        assert!(svc.notifier().sent().await.is_empty());
    }

    #[tokio::test]
    async fn terminal_booking_cannot_be_cancelled() {
        let svc = fixture::service();
        let listing = fixture::listing(
            &svc,
            BookingMode::Instant,
            CancellationPolicy::Flexible,
        )
        .await;
        let booking =
            fixture::booking(&svc, &listing, dates(-5, -2), Status::Completed)
                .await;

        let err = svc
            .execute(CancelBooking {
                booking_id: booking.id,
                initiator_id: booking.renter_id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::Transition(TransitionError::InvalidState(
                Status::Completed,
                _,
            )),
        ));
    }
}
