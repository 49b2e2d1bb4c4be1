//! Service contains the business logic of the application.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod command;
pub mod domain;
#[cfg(test)]
mod fixture;
pub mod infra;
pub mod query;
pub mod read;
pub mod task;

use common::{
    operations::{By, Dispatch, Release, Start, Update},
    DateTime,
};
use derive_more::{Debug, Error};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{booking, fee, payment::IntentId, user, Booking},
    infra::{
        database, notification, payment, Database, Dispatcher, Gateway,
    },
};

pub use self::{command::Command, query::Query, task::Task};

/// [`Service`] configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// [JWT] decoding key of the identity provider.
    ///
    /// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
    #[debug(skip)]
    pub jwt_decoding_key: jsonwebtoken::DecodingKey,

    /// [`fee::Calculator`] of the marketplace fees.
    pub fees: fee::Calculator,

    /// [`task::PublishOverdueReviews`] configuration.
    pub publish_overdue_reviews: task::publish_overdue_reviews::Config,

    /// [`task::ReleasePendingDeposits`] configuration.
    pub release_pending_deposits: task::release_pending_deposits::Config,
}

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<Db, Pg, Nt> {
    /// Configuration of this [`Service`].
    config: Config,

    /// [`Database`] of this [`Service`].
    database: Db,

    /// Payment [`Gateway`] of this [`Service`].
    payments: Pg,

    /// Notification [`Dispatcher`] of this [`Service`].
    notifier: Nt,
}

impl<Db, Pg, Nt> Service<Db, Pg, Nt> {
    /// Creates a new [`Service`] with the provided parameters.
    pub fn new(
        config: Config,
        database: Db,
        payments: Pg,
        notifier: Nt,
    ) -> (Self, task::Background)
    where
        Self: Task<
                Start<
                    By<
                        task::PublishOverdueReviews<Self>,
                        task::publish_overdue_reviews::Config,
                    >,
                >,
                Ok = (),
                Err: Error,
            > + Task<
                Start<
                    By<
                        task::ReleasePendingDeposits<Self>,
                        task::release_pending_deposits::Config,
                    >,
                >,
                Ok = (),
                Err: Error,
            > + Clone
            + 'static,
    {
        let this = Service {
            config,
            database,
            payments,
            notifier,
        };

        let mut bg = task::Background::default();
        let svc = this.clone();
        bg.spawn("PublishOverdueReviews", async move {
            svc.execute(Start(By::<task::PublishOverdueReviews<_>, _>::new(
                svc.config().publish_overdue_reviews,
            )))
            .await
        });
        let svc = this.clone();
        bg.spawn("ReleasePendingDeposits", async move {
            svc.execute(Start(By::<task::ReleasePendingDeposits<_>, _>::new(
                svc.config().release_pending_deposits,
            )))
            .await
        });

        (this, bg)
    }

    /// Returns [`Config`] of this [`Service`].
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns [`Database`] of this [`Service`].
    #[must_use]
    pub fn database(&self) -> &Db {
        &self.database
    }

    /// Returns payment [`Gateway`] of this [`Service`].
    #[must_use]
    pub fn payments(&self) -> &Pg {
        &self.payments
    }

    /// Returns notification [`Dispatcher`] of this [`Service`].
    #[must_use]
    pub fn notifier(&self) -> &Nt {
        &self.notifier
    }
}

impl<Db, Pg, Nt> Service<Db, Pg, Nt>
where
    Nt: Dispatcher<
        Dispatch<notification::Notification>,
        Ok = (),
        Err = Traced<notification::Error>,
    >,
{
    /// Dispatches a [`notification::Notification`], logging (and swallowing)
    /// a failure.
    async fn notify(
        &self,
        user_id: user::Id,
        template: notification::Template,
        data: notification::Data,
    ) {
        let notification = notification::Notification {
            user_id,
            template,
            data,
        };
        if let Err(e) = self.notifier.execute(Dispatch(notification)).await {
            log::warn!(
                "failed to notify `User(id: {user_id})` with `{template}`: {e}",
            );
        }
    }
}

impl<Db, Pg, Nt> Service<Db, Pg, Nt>
where
    Pg: Gateway<Release<IntentId>, Ok = (), Err = Traced<payment::Error>>,
{
    /// Releases the provided authorization, logging (and swallowing) a
    /// failure.
    async fn release(&self, intent_id: IntentId) -> bool {
        match self.payments.execute(Release(intent_id.clone())).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("failed to release `{intent_id}`: {e}");
                false
            }
        }
    }
}

impl<Db, Pg, Nt> Service<Db, Pg, Nt>
where
    Db: Database<
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
    /// Releases the outstanding deposit hold of the provided [`Booking`] (if
    /// any) and records the release.
    ///
    /// The release is claimed in the [`Database`] before the hold is
    /// released, so a concurrent capture of the same hold wins or loses as a
    /// whole. Failures are logged and left for
    /// [`task::ReleasePendingDeposits`] to retry.
    async fn release_deposit(&self, booking: &mut Booking) {
        if !booking.has_outstanding_hold() {
            return;
        }
        let Some(hold_id) = booking.deposit.hold_id.clone() else {
            return;
        };

        let settle = booking::Settle {
            booking_id: booking.id,
            settlement: booking::Settlement::Release(DateTime::now().coerce()),
        };
        match self.database.execute(Update(settle)).await {
            Ok(true) => {}
            Ok(false) => {
                log::debug!(
                    "deposit of `Booking(id: {})` was settled concurrently",
                    booking.id,
                );
                return;
            }
            Err(e) => {
                log::error!(
                    "failed to claim deposit release of `Booking(id: {})`: {e}",
                    booking.id,
                );
                return;
            }
        }

        if self.release(hold_id).await {
            if let booking::Settlement::Release(at) = settle.settlement {
                booking.deposit.released_at = Some(at);
            }
        } else {
            self.unsettle(settle).await;
        }
    }
}

impl<Db, Pg, Nt> Service<Db, Pg, Nt>
where
    Db: Database<
        Update<booking::Unsettle>,
        Ok = bool,
        Err = Traced<database::Error>,
    >,
{
    /// Makes the deposit hold settled by the provided [`booking::Settle`]
    /// outstanding again, logging (and swallowing) a failure.
    async fn unsettle(&self, settle: booking::Settle) {
        let id = settle.booking_id;
        match self.database.execute(Update(booking::Unsettle(settle))).await {
            Ok(true) => {}
            Ok(false) => {
                log::error!(
                    "failed to undo deposit settlement of `Booking(id: {id})`: \
                     deposit was changed concurrently",
                );
            }
            Err(e) => {
                log::error!(
                    "failed to undo deposit settlement of `Booking(id: {id})`: \
                     {e}",
                );
            }
        }
    }
}

impl<Db, Pg, Nt> Service<Db, Pg, Nt>
where
    Db: Database<
        Update<booking::Transition>,
        Ok = bool,
        Err = Traced<database::Error>,
    >,
{
    /// Moves a [`Booking`] claimed into the provided [`booking::Status`] back
    /// to its `original` state, after the payment operation of the claim
    /// failed.
    async fn revert(&self, original: Booking, claimed: booking::Status) {
        let id = original.id;
        match self
            .database
            .execute(Update(booking::Transition {
                booking: original,
                from: claimed,
            }))
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                log::error!(
                    "failed to revert `{claimed}` claim of `Booking(id: {id})`: \
                     status was changed concurrently",
                );
            }
            Err(e) => {
                log::error!(
                    "failed to revert `{claimed}` claim of `Booking(id: {id})`: \
                     {e}",
                );
            }
        }
    }
}
