//! [`Command`] for creating a new [`Booking`].

use std::collections::BTreeMap;

use common::{
    operations::{
        Authorize, By, Commit, Dispatch, Insert, Lock, Release, Select,
        Transact, Transacted, Update,
    },
    Date, DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        booking, listing,
        payment::{IntentId, MethodRef},
        user, Booking, Listing,
    },
    infra::{
        database, notification, payment, Database, Dispatcher, Gateway,
    },
    read::booking::Occupying,
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`Booking`].
#[derive(Clone, Debug)]
pub struct CreateBooking {
    /// ID of the [`Listing`] to be booked.
    pub listing_id: listing::Id,

    /// ID of the user renting the equipment.
    pub renter_id: user::Id,

    /// [`booking::DateRange`] of the rental.
    pub dates: booking::DateRange,

    /// [`booking::PickupMethod`] of the equipment.
    pub pickup_method: booking::PickupMethod,

    /// Delivery [`booking::Address`], required for a delivery.
    pub delivery_address: Option<booking::Address>,

    /// [`MethodRef`] to pay with.
    pub payment_method: MethodRef,

    /// [`booking::Message`] to the owner.
    pub message: Option<booking::Message>,
}

impl<Db, Pg, Nt> Command<CreateBooking> for Service<Db, Pg, Nt>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Listing>, listing::Id>>,
            Ok = Option<Listing>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<booking::Id>, Occupying>>,
            Ok = Vec<booking::Id>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Listing, listing::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<booking::Id>, Occupying>>,
            Ok = Vec<booking::Id>,
            Err = Traced<database::Error>,
        > + Database<Insert<Booking>, Err = Traced<database::Error>>
        + Database<
            Update<(listing::Id, listing::Counter)>,
            Ok = bool,
            Err = Traced<database::Error>,
        > + Database<Commit, Err = Traced<database::Error>>,
    Pg: Gateway<
            Authorize<payment::Charge>,
            Ok = IntentId,
            Err = Traced<payment::Error>,
        > + Gateway<
            Authorize<payment::Hold>,
            Ok = IntentId,
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

    async fn execute(&self, cmd: CreateBooking) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateBooking {
            listing_id,
            renter_id,
            dates,
            pickup_method,
            delivery_address,
            payment_method,
            message,
        } = cmd;

        let listing = self
            .database()
            .execute(Select(By::<Option<Listing>, _>::new(listing_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ListingNotExists(listing_id))
            .map_err(tracerr::wrap!())?;
        if !listing.is_active {
            return Err(tracerr::new!(E::ListingInactive(listing_id)));
        }
        if listing.owner_id == renter_id {
            return Err(tracerr::new!(E::OwnListing(listing_id)));
        }

        listing
            .window
            .check(dates.days())
            .map_err(tracerr::from_and_wrap!(=> E))?;
        let today = Date::today();
        if dates.start() < today {
            return Err(tracerr::new!(E::StartInPast(dates.start())));
        }
        let notice = listing.window.advance_notice_days;
        if today.days_until(dates.start()) < i64::from(notice) {
            return Err(tracerr::new!(E::AdvanceNoticeRequired(notice)));
        }

        let address = match pickup_method {
            booking::PickupMethod::Pickup => None,
            booking::PickupMethod::Delivery => Some(
                delivery_address
                    .ok_or(E::DeliveryAddressRequired)
                    .map_err(tracerr::wrap!())?,
            ),
        };
        let pricing = booking::Pricing::quote(
            &listing.pricing,
            dates.days(),
            pickup_method,
            &self.config().fees,
        )
        .ok_or(E::DeliveryNotOffered(listing_id))
        .map_err(tracerr::wrap!())?;

        let occupying = Occupying {
            listing_id,
            dates,
            except: None,
        };
        if !self
            .database()
            .execute(Select(By::<Vec<booking::Id>, _>::new(occupying)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .is_empty()
        {
            return Err(tracerr::new!(E::ListingUnavailable(listing_id)));
        }

        let id = booking::Id::new();
        let charge_id = self
            .payments()
            .execute(Authorize(payment::Charge {
                booking_id: id,
                payer_id: renter_id,
                method: payment_method.clone(),
                amount: pricing.total_amount,
            }))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        let hold_id = if pricing.security_deposit.is_zero() {
            None
        } else {
            let hold = self
                .payments()
                .execute(Authorize(payment::Hold {
                    booking_id: id,
                    payer_id: renter_id,
                    method: payment_method,
                    amount: pricing.security_deposit,
                }))
                .await;
            match hold {
                Ok(hold_id) => Some(hold_id),
                Err(e) => {
                    _ = self.release(charge_id).await;
                    return Err(e).map_err(tracerr::map_from_and_wrap!(=> E));
                }
            }
        };

        let status = Booking::initial_status(listing.booking_mode);
        let now = DateTime::now();
        let booking = Booking {
            id,
            listing_id,
            renter_id,
            owner_id: listing.owner_id,
            dates,
            pricing,
            charge_id: charge_id.clone(),
            deposit: booking::Deposit {
                hold_id: hold_id.clone(),
                released_at: None,
                captured: None,
            },
            status,
            pickup: booking::Pickup {
                method: pickup_method,
                address,
            },
            message,
            decline_reason: None,
            cancellation: None,
            renter_reviewed: false,
            owner_reviewed: false,
            created_at: now.coerce(),
            confirmed_at: (status == booking::Status::Confirmed)
                .then(|| now.coerce()),
            started_at: None,
            completed_at: None,
            declined_at: None,
        };

        let persisted: Result<(), Traced<E>> = async {
            let tx = self
                .database()
                .execute(Transact)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;

            // Avoid concurrent bookings of the same `Listing`.
            tx.execute(Lock(By::new(listing_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;

            if !tx
                .execute(Select(By::<Vec<booking::Id>, _>::new(occupying)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .is_empty()
            {
                return Err(tracerr::new!(E::ListingUnavailable(listing_id)));
            }

            tx.execute(Insert(booking.clone()))
                .await
                .map_err(|e| {
                    if e.as_ref().is_exclusion_violation(OVERLAP_CONSTRAINT) {
                        tracerr::new!(E::ListingUnavailable(listing_id))
                    } else {
                        tracerr::map_from(e)
                    }
                })
                .map(drop)?;

            if status == booking::Status::Confirmed {
                _ = tx
                    .execute(Update((listing_id, listing::Counter::Bookings)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?;
            }

            tx.execute(Commit)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)
        }
        .await;
        if let Err(e) = persisted {
            _ = self.release(charge_id).await;
            if let Some(hold_id) = hold_id {
                _ = self.release(hold_id).await;
            }
            return Err(e);
        }

        let data = BTreeMap::from([
            ("booking_id", booking.id.to_string()),
            ("listing_title", listing.title.to_string()),
            ("start_date", dates.start().to_string()),
            ("end_date", dates.end().to_string()),
            ("total_amount", booking.pricing.total_amount.to_string()),
        ]);
        match status {
            booking::Status::Confirmed => {
                for user_id in [booking.renter_id, booking.owner_id] {
                    self.notify(
                        user_id,
                        notification::Template::BookingConfirmed,
                        data.clone(),
                    )
                    .await;
                }
            }
            booking::Status::Pending
            | booking::Status::InProgress
            | booking::Status::Completed
            | booking::Status::Cancelled
            | booking::Status::Declined => {
                self.notify(
                    booking.owner_id,
                    notification::Template::BookingRequested,
                    data,
                )
                .await;
            }
        }

        Ok(booking)
    }
}

/// Name of the constraint preventing overlapping occupying [`Booking`]s.
pub(crate) const OVERLAP_CONSTRAINT: &str = "bookings_no_overlap";

/// Error of [`CreateBooking`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// Advance notice of the [`Listing`] is not respected.
    #[display("Booking requires {_0} days of advance notice")]
    #[from(ignore)]
    AdvanceNoticeRequired(#[error(not(source))] u16),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Delivery is requested without an address.
    #[display("Delivery address is required")]
    #[from(ignore)]
    DeliveryAddressRequired,

    /// Delivery is requested, but not offered by the [`Listing`].
    #[display("`Listing(id: {_0})` doesn't offer delivery")]
    #[from(ignore)]
    DeliveryNotOffered(#[error(not(source))] listing::Id),

    /// [`Listing`] doesn't accept new [`Booking`]s.
    #[display("`Listing(id: {_0})` is not active")]
    #[from(ignore)]
    ListingInactive(#[error(not(source))] listing::Id),

    /// [`Listing`] with the provided ID does not exist.
    #[display("`Listing(id: {_0})` does not exist")]
    #[from(ignore)]
    ListingNotExists(#[error(not(source))] listing::Id),

    /// [`Listing`] is already booked for (some of) the requested dates.
    #[display("`Listing(id: {_0})` is unavailable for the requested dates")]
    #[from(ignore)]
    ListingUnavailable(#[error(not(source))] listing::Id),

    /// Owner tries to book their own [`Listing`].
    #[display("`Listing(id: {_0})` cannot be booked by its owner")]
    #[from(ignore)]
    OwnListing(#[error(not(source))] listing::Id),

    /// Payment [`Gateway`] error.
    #[display("Payment failed: {_0}")]
    Payment(payment::Error),

    /// Rental period doesn't fit the [`listing::RentalWindow`].
    #[display("{_0}")]
    RentalWindow(#[error(not(source))] listing::WindowViolation),

    /// Rental starts in the past.
    #[display("Rental cannot start in the past ({_0})")]
    #[from(ignore)]
    StartInPast(#[error(not(source))] Date),
}
