//! [`Command`] for recording a view of a [`Listing`].

use common::operations::Update;
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{listing, Listing},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for recording a view of a [`Listing`].
#[derive(Clone, Copy, Debug)]
pub struct RecordListingView {
    /// ID of the viewed [`Listing`].
    pub listing_id: listing::Id,
}

impl<Db, Pg, Nt> Command<RecordListingView> for Service<Db, Pg, Nt>
where
    Db: Database<
        Update<(listing::Id, listing::Counter)>,
        Ok = bool,
        Err = Traced<database::Error>,
    >,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: RecordListingView,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RecordListingView { listing_id } = cmd;

        let updated = self
            .database()
            .execute(Update((listing_id, listing::Counter::Views)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if !updated {
            return Err(tracerr::new!(E::ListingNotExists(listing_id)));
        }
        Ok(())
    }
}

/// Error of [`RecordListingView`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Listing`] with the provided ID does not exist.
    #[display("`Listing(id: {_0})` does not exist")]
    #[from(ignore)]
    ListingNotExists(#[error(not(source))] listing::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        domain::listing::{self, BookingMode, CancellationPolicy},
        fixture,
        Command as _,
    };

    use super::{ExecutionError, RecordListingView};

    #[tokio::test]
    async fn increments_view_counter() {
        let svc = fixture::service();
        let listing = fixture::listing(
            &svc,
            BookingMode::Instant,
            CancellationPolicy::Flexible,
        )
        .await;

        for _ in 0..3 {
            svc.execute(RecordListingView {
                listing_id: listing.id,
            })
            .await
            .unwrap();
        }

        let stored = fixture::reload_listing(&svc, listing.id).await;
        assert_eq!(stored.view_count, 3);
        assert_eq!(stored.booking_count, 0);
    }

    #[tokio::test]
    async fn unknown_listing() {
        let svc = fixture::service();

        let err = svc
            .execute(RecordListingView {
                listing_id: listing::Id::new(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::ListingNotExists(_)));
    }
}
