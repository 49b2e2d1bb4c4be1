//! [`Command`] for declining a requested [`Booking`].

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

/// [`Command`] for declining a requested [`Booking`].
#[derive(Clone, Debug)]
pub struct DeclineBooking {
    /// ID of the [`Booking`] to be declined.
    pub booking_id: booking::Id,

    /// ID of the user declining the [`Booking`].
    pub initiator_id: user::Id,

    /// [`booking::DeclineReason`] shared with the renter.
    pub reason: Option<booking::DeclineReason>,
}

impl<Db, Pg, Nt> Command<DeclineBooking> for Service<Db, Pg, Nt>
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

    async fn execute(&self, cmd: DeclineBooking) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeclineBooking {
            booking_id,
            initiator_id,
            reason,
        } = cmd;

        let original = self
            .database()
            .execute(Select(By::<Option<Booking>, _>::new(booking_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::BookingNotExists(booking_id))
            .map_err(tracerr::wrap!())?;
        let mut booking = original.clone();
        let (_, from) = booking
            .apply(booking::Event::Decline, initiator_id)
            .map_err(tracerr::from_and_wrap!(=> E))?;
        booking.decline_reason = reason;

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

        // Nothing is charged for a declined request.
        if let Err(e) = self
            .payments()
            .execute(Release(booking.charge_id.clone()))
            .await
        {
            self.revert(original, booking::Status::Declined).await;
            return Err(e).map_err(tracerr::map_from_and_wrap!(=> E));
        }
        self.release_deposit(&mut booking).await;

        let mut data = BTreeMap::from([
            ("booking_id", booking.id.to_string()),
            ("start_date", booking.dates.start().to_string()),
            ("end_date", booking.dates.end().to_string()),
        ]);
        if let Some(reason) = &booking.decline_reason {
            _ = data.insert("reason", reason.to_string());
        }
        self.notify(
            booking.renter_id,
            notification::Template::BookingDeclined,
            data,
        )
        .await;

        Ok(booking)
    }
}

/// Error of [`DeclineBooking`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Booking`] with the provided ID does not exist.
    #[display("`Booking(id: {_0})` does not exist")]
    #[from(ignore)]
    BookingNotExists(#[error(not(source))] booking::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Payment [`Gateway`] error.
    #[display("Charge release failed: {_0}")]
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
    use crate::{
        domain::{
            booking::{DeclineReason, Status, TransitionError},
            listing::{BookingMode, CancellationPolicy},
        },
        fixture::{self, dates},
        infra::{notification::Template, payment},
        Command as _,
    };

    use super::{DeclineBooking, ExecutionError};

    #[tokio::test]
    async fn releases_both_authorizations() {
        let svc = fixture::service();
        let listing = fixture::listing(
            &svc,
            BookingMode::Request,
            CancellationPolicy::Moderate,
        )
        .await;
        let booking =
            fixture::booking(&svc, &listing, dates(5, 8), Status::Pending)
                .await;

        let declined = svc
            .execute(DeclineBooking {
                booking_id: booking.id,
                initiator_id: listing.owner_id,
                reason: DeclineReason::new("Clubs are being regripped"),
            })
            .await
            .unwrap();

        assert_eq!(declined.status, Status::Declined);
        assert!(declined.declined_at.is_some());
        let stored = fixture::reload_booking(&svc, booking.id).await;
        assert_eq!(stored.status, Status::Declined);
        assert_eq!(
            stored.decline_reason.map(|r| r.to_string()).as_deref(),
            Some("Clubs are being regripped"),
        );
        assert!(stored.deposit.released_at.is_some());
        assert!(svc.payments().intent(&booking.charge_id).await.unwrap().released);
        let hold_id = booking.deposit.hold_id.unwrap();
        assert!(svc.payments().intent(&hold_id).await.unwrap().released);
        assert_eq!(
            svc.notifier().templates_of(booking.renter_id).await,
            [Template::BookingDeclined],
        );
    }

    #[tokio::test]
    async fn stays_pending_if_charge_is_not_released() {
        let svc = fixture::service();
        let listing = fixture::listing(
            &svc,
            BookingMode::Request,
            CancellationPolicy::Moderate,
        )
        .await;
        let booking =
            fixture::booking(&svc, &listing, dates(5, 8), Status::Pending)
                .await;
        let decline = DeclineBooking {
            booking_id: booking.id,
            initiator_id: listing.owner_id,
            reason: None,
        };

        svc.payments().set_available(false);
        let err = svc.execute(decline.clone()).await.unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::Payment(payment::Error::Transient(_)),
        ));
        let stored = fixture::reload_booking(&svc, booking.id).await;
        assert_eq!(stored.status, Status::Pending);
        assert!(stored.declined_at.is_none());
        assert!(stored.has_outstanding_hold());
        assert!(
            !svc.payments().intent(&booking.charge_id).await.unwrap().released
        );
        assert!(svc.notifier().sent().await.is_empty());

        svc.payments().set_available(true);
        let declined = svc.execute(decline).await.unwrap();

        assert_eq!(declined.status, Status::Declined);
        assert!(svc.payments().intent(&booking.charge_id).await.unwrap().released);
    }

    #[tokio::test]
    async fn only_pending_booking_is_declined() {
        let svc = fixture::service();
        let listing = fixture::listing(
            &svc,
            BookingMode::Instant,
            CancellationPolicy::Moderate,
        )
        .await;
        let booking =
            fixture::booking(&svc, &listing, dates(5, 8), Status::Confirmed)
                .await;

        let err = svc
            .execute(DeclineBooking {
                booking_id: booking.id,
                initiator_id: listing.owner_id,
                reason: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::Transition(TransitionError::InvalidState(
                Status::Confirmed,
                _,
            )),
        ));
    }

    #[tokio::test]
    async fn stranger_cannot_decline() {
        let svc = fixture::service();
        let listing = fixture::listing(
            &svc,
            BookingMode::Request,
            CancellationPolicy::Moderate,
        )
        .await;
        let booking =
            fixture::booking(&svc, &listing, dates(5, 8), Status::Pending)
                .await;

        let err = svc
            .execute(DeclineBooking {
                booking_id: booking.id,
                initiator_id: crate::domain::user::Id::new(),
                reason: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::Transition(TransitionError::NotParticipant),
        ));
    }
}
