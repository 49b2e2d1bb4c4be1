//! In-memory [`Database`] implementation for tests.

use std::{collections::HashMap, sync::Arc};

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Update},
    Date,
};
use tokio::{
    sync::{Mutex, OwnedMutexGuard},
    task::yield_now,
};
use tracerr::Traced;

use crate::{
    domain::{
        booking, listing, rating::Score, review, user, Booking, Listing,
        Rating, Review,
    },
    infra::{database, Database},
    read,
};

/// In-memory [`Database`].
///
/// Writes are visible immediately (no rollback), while [`Lock`]s are held
/// until the transaction is committed or dropped.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    /// Shared [`State`] of this [`Memory`].
    state: Arc<Mutex<State>>,

    /// [`Lock`]s held by the current transaction.
    held: Arc<Mutex<Vec<OwnedMutexGuard<()>>>>,
}

/// Stored entities.
#[derive(Debug, Default)]
struct State {
    /// Stored [`Listing`]s.
    listings: HashMap<listing::Id, Listing>,

    /// Stored [`Booking`]s.
    bookings: HashMap<booking::Id, Booking>,

    /// Stored [`Review`]s.
    reviews: HashMap<review::Id, Review>,

    /// Stored user [`Rating`]s.
    user_ratings: HashMap<user::Id, Rating>,

    /// Lockable keys.
    locks: HashMap<LockKey, Arc<Mutex<()>>>,
}

/// Key of a [`Lock`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
enum LockKey {
    /// [`Listing`] lock.
    Listing(listing::Id),

    /// [`Booking`] lock.
    Booking(booking::Id),
}

impl Memory {
    /// Gives other tasks a chance to interleave, then locks the [`State`].
    async fn state(&self) -> tokio::sync::MutexGuard<'_, State> {
        yield_now().await;
        self.state.lock().await
    }

    /// Acquires the lock of the provided [`LockKey`] until [`Commit`].
    async fn lock(&self, key: LockKey) {
        let lock = self.state().await.locks.entry(key).or_default().clone();
        let guard = lock.lock_owned().await;
        self.held.lock().await.push(guard);
    }
}

/// Result of a [`Memory`] operation.
type Result<T> = std::result::Result<T, Traced<database::Error>>;

impl Database<Transact> for Memory {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self> {
        Ok(Self {
            state: Arc::clone(&self.state),
            held: Arc::default(),
        })
    }
}

impl Database<Commit> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<()> {
        self.held.lock().await.clear();
        Ok(())
    }
}

impl Database<Lock<By<Listing, listing::Id>>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Listing, listing::Id>>,
    ) -> Result<()> {
        self.lock(LockKey::Listing(by.into_inner())).await;
        Ok(())
    }
}

impl Database<Lock<By<Booking, booking::Id>>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Booking, booking::Id>>,
    ) -> Result<()> {
        self.lock(LockKey::Booking(by.into_inner())).await;
        Ok(())
    }
}

impl Database<Select<By<Option<Listing>, listing::Id>>> for Memory {
    type Ok = Option<Listing>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Listing>, listing::Id>>,
    ) -> Result<Self::Ok> {
        Ok(self.state().await.listings.get(&by.into_inner()).cloned())
    }
}

impl Database<Insert<Listing>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, Insert(listing): Insert<Listing>) -> Result<()> {
        _ = self.state().await.listings.insert(listing.id, listing);
        Ok(())
    }
}

impl Database<Update<(listing::Id, listing::Counter)>> for Memory {
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update((id, counter)): Update<(listing::Id, listing::Counter)>,
    ) -> Result<bool> {
        Ok(self
            .state()
            .await
            .listings
            .get_mut(&id)
            .map(|l| match counter {
                listing::Counter::Views => l.view_count += 1,
                listing::Counter::Bookings => l.booking_count += 1,
            })
            .is_some())
    }
}

impl Database<Update<(listing::Id, Rating)>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update((id, rating)): Update<(listing::Id, Rating)>,
    ) -> Result<()> {
        if let Some(l) = self.state().await.listings.get_mut(&id) {
            l.rating = rating;
        }
        Ok(())
    }
}

impl Database<Select<By<Vec<Score>, listing::Id>>> for Memory {
    type Ok = Vec<Score>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Score>, listing::Id>>,
    ) -> Result<Vec<Score>> {
        let id = by.into_inner();
        Ok(self
            .state()
            .await
            .reviews
            .values()
            .filter(|r| {
                r.listing_id == id
                    && r.kind == review::Kind::Listing
                    && r.is_published()
            })
            .map(|r| r.overall)
            .collect())
    }
}

impl Database<Select<By<Option<Booking>, booking::Id>>> for Memory {
    type Ok = Option<Booking>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Booking>, booking::Id>>,
    ) -> Result<Self::Ok> {
        Ok(self.state().await.bookings.get(&by.into_inner()).cloned())
    }
}

impl Database<Insert<Booking>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, Insert(booking): Insert<Booking>) -> Result<()> {
        _ = self.state().await.bookings.insert(booking.id, booking);
        Ok(())
    }
}

impl Database<Update<booking::Transition>> for Memory {
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(transition): Update<booking::Transition>,
    ) -> Result<bool> {
        let booking::Transition { booking, from } = transition;
        let mut state = self.state().await;
        let Some(stored) = state.bookings.get_mut(&booking.id) else {
            return Ok(false);
        };
        if stored.status != from {
            return Ok(false);
        }
        // Deposit custody and review marks have their own updates.
        *stored = Booking {
            deposit: stored.deposit.clone(),
            renter_reviewed: stored.renter_reviewed,
            owner_reviewed: stored.owner_reviewed,
            ..booking
        };
        Ok(true)
    }
}

impl Database<Update<booking::Settle>> for Memory {
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(settle): Update<booking::Settle>,
    ) -> Result<bool> {
        let mut state = self.state().await;
        let Some(b) = state.bookings.get_mut(&settle.booking_id) else {
            return Ok(false);
        };
        if !b.has_outstanding_hold() {
            return Ok(false);
        }
        match settle.settlement {
            booking::Settlement::Capture(amount) => {
                if !b.status.is_occupying() {
                    return Ok(false);
                }
                b.deposit.captured = Some(amount);
            }
            booking::Settlement::Release(at) => {
                b.deposit.released_at = Some(at);
            }
        }
        Ok(true)
    }
}

impl Database<Update<booking::Unsettle>> for Memory {
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(booking::Unsettle(settle)): Update<booking::Unsettle>,
    ) -> Result<bool> {
        let mut state = self.state().await;
        let Some(b) = state.bookings.get_mut(&settle.booking_id) else {
            return Ok(false);
        };
        match settle.settlement {
            booking::Settlement::Capture(amount)
                if b.deposit.captured == Some(amount) =>
            {
                b.deposit.captured = None;
            }
            booking::Settlement::Release(at)
                if b.deposit.released_at == Some(at) =>
            {
                b.deposit.released_at = None;
            }
            booking::Settlement::Capture(_)
            | booking::Settlement::Release(_) => return Ok(false),
        }
        Ok(true)
    }
}

impl Database<Update<(booking::Id, booking::Reviewed)>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update((id, booking::Reviewed(party))): Update<(
            booking::Id,
            booking::Reviewed,
        )>,
    ) -> Result<()> {
        if let Some(b) = self.state().await.bookings.get_mut(&id) {
            match party {
                booking::Party::Renter => b.renter_reviewed = true,
                booking::Party::Owner => b.owner_reviewed = true,
            }
        }
        Ok(())
    }
}

impl Database<Select<By<Vec<booking::Id>, read::booking::Occupying>>>
    for Memory
{
    type Ok = Vec<booking::Id>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<booking::Id>, read::booking::Occupying>>,
    ) -> Result<Self::Ok> {
        let read::booking::Occupying {
            listing_id,
            dates,
            except,
        } = by.into_inner();
        Ok(self
            .state()
            .await
            .bookings
            .values()
            .filter(|b| {
                b.listing_id == listing_id
                    && Some(b.id) != except
                    && b.status.is_occupying()
                    && b.dates.overlaps(&dates)
            })
            .map(|b| b.id)
            .collect())
    }
}

impl Database<Select<By<Vec<Booking>, read::booking::Participant>>>
    for Memory
{
    type Ok = Vec<Booking>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Booking>, read::booking::Participant>>,
    ) -> Result<Self::Ok> {
        let read::booking::Participant { user_id, party } = by.into_inner();
        let mut bookings = self
            .state()
            .await
            .bookings
            .values()
            .filter(|b| {
                b.party_of(user_id)
                    .is_some_and(|p| party.map_or(true, |party| p == party))
            })
            .cloned()
            .collect::<Vec<_>>();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }
}

impl Database<Select<By<Vec<Booking>, read::booking::PendingRelease>>>
    for Memory
{
    type Ok = Vec<Booking>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<Vec<Booking>, read::booking::PendingRelease>>,
    ) -> Result<Self::Ok> {
        Ok(self
            .state()
            .await
            .bookings
            .values()
            .filter(|b| b.status.is_terminal() && b.has_outstanding_hold())
            .cloned()
            .collect())
    }
}

impl Database<Select<By<Option<Review>, review::Id>>> for Memory {
    type Ok = Option<Review>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Review>, review::Id>>,
    ) -> Result<Self::Ok> {
        Ok(self.state().await.reviews.get(&by.into_inner()).cloned())
    }
}

impl Database<Select<By<Vec<Review>, booking::Id>>> for Memory {
    type Ok = Vec<Review>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Review>, booking::Id>>,
    ) -> Result<Self::Ok> {
        let id = by.into_inner();
        Ok(self
            .state()
            .await
            .reviews
            .values()
            .filter(|r| r.booking_id == id)
            .cloned()
            .collect())
    }
}

impl Database<Select<By<Vec<Review>, listing::Id>>> for Memory {
    type Ok = Vec<Review>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Review>, listing::Id>>,
    ) -> Result<Self::Ok> {
        let id = by.into_inner();
        let mut reviews = self
            .state()
            .await
            .reviews
            .values()
            .filter(|r| {
                r.listing_id == id
                    && r.kind == review::Kind::Listing
                    && r.is_published()
            })
            .cloned()
            .collect::<Vec<_>>();
        reviews.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        Ok(reviews)
    }
}

impl Database<Select<By<Vec<Review>, read::review::Overdue>>> for Memory {
    type Ok = Vec<Review>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Review>, read::review::Overdue>>,
    ) -> Result<Self::Ok> {
        let read::review::Overdue { ended_by } = by.into_inner();
        let state = self.state().await;
        let ended = |id: &booking::Id| -> Option<Date> {
            state
                .bookings
                .get(id)
                .filter(|b| b.status == booking::Status::Completed)
                .map(|b| b.dates.end())
        };
        Ok(state
            .reviews
            .values()
            .filter(|r| {
                !r.is_published()
                    && ended(&r.booking_id).is_some_and(|end| end <= ended_by)
            })
            .cloned()
            .collect())
    }
}

impl Database<Insert<Review>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, Insert(review): Insert<Review>) -> Result<()> {
        _ = self.state().await.reviews.insert(review.id, review);
        Ok(())
    }
}

impl Database<Update<(booking::Id, review::PublicationDateTime)>> for Memory {
    type Ok = Vec<Review>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update((id, at)): Update<(booking::Id, review::PublicationDateTime)>,
    ) -> Result<Self::Ok> {
        Ok(self
            .state()
            .await
            .reviews
            .values_mut()
            .filter(|r| r.booking_id == id && !r.is_published())
            .map(|r| {
                r.published_at = Some(at);
                r.clone()
            })
            .collect())
    }
}

impl Database<Update<(review::Id, review::Response)>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update((id, response)): Update<(review::Id, review::Response)>,
    ) -> Result<()> {
        if let Some(r) = self.state().await.reviews.get_mut(&id) {
            r.response = Some(response);
        }
        Ok(())
    }
}

impl Database<Update<(review::Id, review::FlagDateTime)>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update((id, at)): Update<(review::Id, review::FlagDateTime)>,
    ) -> Result<()> {
        if let Some(r) = self.state().await.reviews.get_mut(&id) {
            _ = r.flagged_at.get_or_insert(at);
        }
        Ok(())
    }
}

impl Database<Select<By<Vec<Score>, user::Id>>> for Memory {
    type Ok = Vec<Score>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Score>, user::Id>>,
    ) -> Result<Vec<Score>> {
        let id = by.into_inner();
        Ok(self
            .state()
            .await
            .reviews
            .values()
            .filter(|r| r.reviewee_id == id && r.is_published())
            .map(|r| r.overall)
            .collect())
    }
}

impl Database<Select<By<Rating, user::Id>>> for Memory {
    type Ok = Rating;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Rating, user::Id>>,
    ) -> Result<Rating> {
        Ok(self
            .state()
            .await
            .user_ratings
            .get(&by.into_inner())
            .copied()
            .unwrap_or_default())
    }
}

impl Database<Update<(user::Id, Rating)>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update((id, rating)): Update<(user::Id, Rating)>,
    ) -> Result<()> {
        _ = self.state().await.user_ratings.insert(id, rating);
        Ok(())
    }
}
