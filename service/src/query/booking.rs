//! [`Query`] collection related to [`Booking`]s.

use crate::{
    domain::{booking, Booking},
    read,
};
#[cfg(doc)]
use crate::Query;

use super::Lookup;

/// Queries a [`Booking`] by its [`booking::Id`].
pub type ById = Lookup<Option<Booking>, booking::Id>;

/// Queries [`Booking`]s a user participates in.
pub type OfParticipant =
    Lookup<Vec<Booking>, read::booking::Participant>;
