//! [`Query`] collection related to [`Review`]s.

use crate::domain::{booking, listing, review, Review};
#[cfg(doc)]
use crate::{
    domain::{Booking, Listing},
    Query,
};

use super::Lookup;

/// Queries a [`Review`] by its [`review::Id`].
pub type ById = Lookup<Option<Review>, review::Id>;

/// Queries all the [`Review`]s of a [`Booking`], published or not.
pub type OfBooking = Lookup<Vec<Review>, booking::Id>;

/// Queries published [`Review`]s of a [`Listing`], newest first.
pub type OfListing = Lookup<Vec<Review>, listing::Id>;
