//! [`Command`] for capturing a [`Booking`] security deposit.

use common::{
    operations::{By, Capture, Select, Update},
    Money,
};
use derive_more::{Display, Error, From};
use rust_decimal::Decimal;
use tracerr::Traced;

use crate::{
    domain::{booking, user, Booking},
    infra::{database, payment, payment::Claim, Database, Gateway},
    Service,
};

use super::Command;

/// [`Command`] for claiming (a part of) the security deposit of a
/// [`Booking`] by its owner, in case of damage.
#[derive(Clone, Copy, Debug)]
pub struct CaptureDeposit {
    /// ID of the [`Booking`] whose deposit is captured.
    pub booking_id: booking::Id,

    /// ID of the user capturing the deposit.
    pub initiator_id: user::Id,

    /// Amount to capture.
    ///
    /// The whole deposit is captured if [`None`].
    pub amount: Option<Money>,
}

impl<Db, Pg, Nt> Command<CaptureDeposit> for Service<Db, Pg, Nt>
where
    Db: Database<
            Select<By<Option<Booking>, booking::Id>>,
            Ok = Option<Booking>,
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
    Pg: Gateway<Capture<Claim>, Ok = (), Err = Traced<payment::Error>>,
{
    type Ok = Booking;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CaptureDeposit) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CaptureDeposit {
            booking_id,
            initiator_id,
            amount,
        } = cmd;

        let mut booking = self
            .database()
            .execute(Select(By::<Option<Booking>, _>::new(booking_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::BookingNotExists(booking_id))
            .map_err(tracerr::wrap!())?;

        if initiator_id != booking.owner_id {
            return Err(tracerr::new!(E::NotOwner(booking_id)));
        }
        if !booking.status.is_occupying() {
            return Err(tracerr::new!(E::WrongStatus(booking.status)));
        }
        let Some(hold_id) = booking
            .has_outstanding_hold()
            .then(|| booking.deposit.hold_id.clone())
            .flatten()
        else {
            return Err(tracerr::new!(E::NoOutstandingHold(booking_id)));
        };

        let deposit = booking.pricing.security_deposit;
        let amount = amount.unwrap_or(deposit);
        if amount.currency != deposit.currency
            || amount.amount <= Decimal::ZERO
            || amount.amount > deposit.amount
        {
            return Err(tracerr::new!(E::InvalidAmount(amount)));
        }

        // Claim the hold before any money moves.
        let settle = booking::Settle {
            booking_id,
            settlement: booking::Settlement::Capture(amount),
        };
        let claimed = self
            .database()
            .execute(Update(settle))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if !claimed {
            return Err(tracerr::new!(E::DepositChanged(booking_id)));
        }

        if let Err(e) = self
            .payments()
            .execute(Capture(Claim {
                intent_id: hold_id,
                amount,
            }))
            .await
        {
            self.unsettle(settle).await;
            return Err(e).map_err(tracerr::map_from_and_wrap!(=> E));
        }

        booking.deposit.captured = Some(amount);
        Ok(booking)
    }
}

/// Error of [`CaptureDeposit`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Booking`] with the provided ID does not exist.
    #[display("`Booking(id: {_0})` does not exist")]
    #[from(ignore)]
    BookingNotExists(#[error(not(source))] booking::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Booking`] status or deposit was changed concurrently.
    #[display("`Booking(id: {_0})` was changed concurrently")]
    #[from(ignore)]
    DepositChanged(#[error(not(source))] booking::Id),

    /// Requested amount exceeds the deposit, or is not positive.
    #[display("Cannot capture {_0} of the deposit")]
    #[from(ignore)]
    InvalidAmount(#[error(not(source))] Money),

    /// Deposit hold is already released or captured.
    #[display("`Booking(id: {_0})` has no outstanding deposit hold")]
    #[from(ignore)]
    NoOutstandingHold(#[error(not(source))] booking::Id),

    /// Initiator doesn't own the rented equipment.
    #[display("Only the owner may capture the deposit of `Booking(id: {_0})`")]
    #[from(ignore)]
    NotOwner(#[error(not(source))] booking::Id),

    /// Payment [`Gateway`] error.
    #[display("Deposit capture failed: {_0}")]
    Payment(payment::Error),

    /// Deposit can't be captured in the current [`booking::Status`].
    #[display("Cannot capture the deposit of a `{_0}` booking")]
    #[from(ignore)]
    WrongStatus(#[error(not(source))] booking::Status),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::CancelBooking,
        domain::{
            booking::Status,
            listing::{BookingMode, CancellationPolicy},
        },
        fixture::{self, dates, usd},
        infra::payment,
        Command as _,
    };

    use super::{CaptureDeposit, ExecutionError};

    #[tokio::test]
    async fn captures_part_of_deposit() {
        let svc = fixture::service();
        let listing = fixture::listing(
            &svc,
            BookingMode::Instant,
            CancellationPolicy::Flexible,
        )
        .await;
        let booking =
            fixture::booking(&svc, &listing, dates(-2, 1), Status::InProgress)
                .await;

        let captured = svc
            .execute(CaptureDeposit {
                booking_id: booking.id,
                initiator_id: listing.owner_id,
                amount: Some(usd("75")),
            })
            .await
            .unwrap();

        assert_eq!(captured.deposit.captured, Some(usd("75")));
        let stored = fixture::reload_booking(&svc, booking.id).await;
        assert_eq!(stored.deposit.captured, Some(usd("75")));
        let hold_id = booking.deposit.hold_id.unwrap();
        let hold = svc.payments().intent(&hold_id).await.unwrap();
        assert_eq!(hold.captured, Some(usd("75")));
    }

    #[tokio::test]
    async fn defaults_to_whole_deposit() {
        let svc = fixture::service();
        let listing = fixture::listing(
            &svc,
            BookingMode::Instant,
            CancellationPolicy::Flexible,
        )
        .await;
        let booking =
            fixture::booking(&svc, &listing, dates(1, 3), Status::Confirmed)
                .await;

        let captured = svc
            .execute(CaptureDeposit {
                booking_id: booking.id,
                initiator_id: listing.owner_id,
                amount: None,
            })
            .await
            .unwrap();

        assert_eq!(captured.deposit.captured, Some(usd("200")));
    }

    #[tokio::test]
    async fn rejects_excessive_amount_and_second_capture() {
        let svc = fixture::service();
        let listing = fixture::listing(
            &svc,
            BookingMode::Instant,
            CancellationPolicy::Flexible,
        )
        .await;
        let booking =
            fixture::booking(&svc, &listing, dates(-2, 1), Status::InProgress)
                .await;
        let capture = |amount| CaptureDeposit {
            booking_id: booking.id,
            initiator_id: listing.owner_id,
            amount: Some(usd(amount)),
        };

        let err = svc.execute(capture("200.01")).await.unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::InvalidAmount(_)));
        let err = svc.execute(capture("0")).await.unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::InvalidAmount(_)));

        _ = svc.execute(capture("20")).await.unwrap();
        let err = svc.execute(capture("20")).await.unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::NoOutstandingHold(_)));
    }

    #[tokio::test]
    async fn only_owner_of_active_booking_captures() {
        let svc = fixture::service();
        let listing = fixture::listing(
            &svc,
            BookingMode::Request,
            CancellationPolicy::Flexible,
        )
        .await;
        let pending =
            fixture::booking(&svc, &listing, dates(3, 5), Status::Pending)
                .await;

        let err = svc
            .execute(CaptureDeposit {
                booking_id: pending.id,
                initiator_id: pending.renter_id,
                amount: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::NotOwner(_)));

        let err = svc
            .execute(CaptureDeposit {
                booking_id: pending.id,
                initiator_id: listing.owner_id,
                amount: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::WrongStatus(Status::Pending),
        ));
    }

    #[tokio::test]
    async fn capture_racing_cancellation_settles_hold_once() {
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

        let (captured, cancelled) = tokio::join!(
            svc.execute(CaptureDeposit {
                booking_id: booking.id,
                initiator_id: listing.owner_id,
                amount: Some(usd("150")),
            }),
            svc.execute(CancelBooking {
                booking_id: booking.id,
                initiator_id: booking.renter_id,
            }),
        );

        assert!(cancelled.is_ok());
        let stored = fixture::reload_booking(&svc, booking.id).await;
        assert_eq!(stored.status, Status::Cancelled);
        let hold_id = booking.deposit.hold_id.unwrap();
        let hold = svc.payments().intent(&hold_id).await.unwrap();
        assert_eq!(hold.captured, stored.deposit.captured);
        assert_eq!(hold.released, stored.deposit.released_at.is_some());
        assert_eq!(captured.is_ok(), hold.captured.is_some());
        assert_ne!(hold.released, hold.captured.is_some());
    }

    #[tokio::test]
    async fn keeps_hold_outstanding_if_processor_fails() {
        let svc = fixture::service();
        let listing = fixture::listing(
            &svc,
            BookingMode::Instant,
            CancellationPolicy::Flexible,
        )
        .await;
        let booking =
            fixture::booking(&svc, &listing, dates(-2, 1), Status::InProgress)
                .await;
        let capture = CaptureDeposit {
            booking_id: booking.id,
            initiator_id: listing.owner_id,
            amount: Some(usd("50")),
        };

        svc.payments().set_available(false);
        let err = svc.execute(capture).await.unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::Payment(payment::Error::Transient(_)),
        ));
        let stored = fixture::reload_booking(&svc, booking.id).await;
        assert!(stored.has_outstanding_hold());

        svc.payments().set_available(true);
        let captured = svc.execute(capture).await.unwrap();
        assert_eq!(captured.deposit.captured, Some(usd("50")));
    }
}
