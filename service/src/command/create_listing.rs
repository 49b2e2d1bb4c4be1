//! [`Command`] for creating a new [`Listing`].

use common::{operations::Insert, DateTime};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{listing, user, Listing, Rating},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`Listing`].
#[derive(Clone, Debug)]
pub struct CreateListing {
    /// ID of the user owning a new [`Listing`].
    pub owner_id: user::Id,

    /// [`listing::Title`] of a new [`Listing`].
    pub title: listing::Title,

    /// [`listing::Club`] offered by a new [`Listing`].
    pub club: listing::Club,

    /// [`listing::Pricing`] of a new [`Listing`].
    pub pricing: listing::Pricing,

    /// [`listing::RentalWindow`] of a new [`Listing`].
    pub window: listing::RentalWindow,

    /// [`listing::BookingMode`] of a new [`Listing`].
    pub booking_mode: listing::BookingMode,

    /// [`listing::CancellationPolicy`] of a new [`Listing`].
    pub cancellation_policy: listing::CancellationPolicy,
}

impl<Db, Pg, Nt> Command<CreateListing> for Service<Db, Pg, Nt>
where
    Db: Database<Insert<Listing>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Listing;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateListing) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateListing {
            owner_id,
            title,
            club,
            pricing,
            window,
            booking_mode,
            cancellation_policy,
        } = cmd;

        if !pricing.is_valid() {
            return Err(tracerr::new!(E::InvalidPricing));
        }
        if !window.is_valid() {
            return Err(tracerr::new!(E::InvalidRentalWindow));
        }

        let listing = Listing {
            id: listing::Id::new(),
            owner_id,
            title,
            club,
            pricing,
            window,
            booking_mode,
            cancellation_policy,
            is_active: true,
            view_count: 0,
            booking_count: 0,
            rating: Rating::default(),
            created_at: DateTime::now().coerce(),
        };

        self.database()
            .execute(Insert(listing.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(listing)
    }
}

/// Error of [`CreateListing`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`listing::Pricing`] amounts are negative or of different currencies.
    #[display("Listing prices are inconsistent")]
    #[from(ignore)]
    InvalidPricing,

    /// [`listing::RentalWindow`] bounds are inconsistent.
    #[display("Rental period bounds must satisfy `1 <= min <= max`")]
    #[from(ignore)]
    InvalidRentalWindow,
}
