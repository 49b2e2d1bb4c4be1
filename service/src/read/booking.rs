//! [`Booking`] read model definitions.

use crate::domain::{booking, listing, user};
#[cfg(doc)]
use crate::domain::{Booking, Listing};

/// Selector of [`Booking`]s occupying a [`Listing`] for (some of) the
/// provided [`booking::DateRange`].
///
/// Only [`Booking`]s in an [occupying](booking::Status::is_occupying)
/// [`booking::Status`] are considered.
#[derive(Clone, Copy, Debug)]
pub struct Occupying {
    /// ID of the [`Listing`] to check.
    pub listing_id: listing::Id,

    /// [`booking::DateRange`] to check.
    pub dates: booking::DateRange,

    /// ID of a [`Booking`] to ignore (the one being approved).
    pub except: Option<booking::Id>,
}

/// Selector of [`Booking`]s a user participates in, newest first.
#[derive(Clone, Copy, Debug)]
pub struct Participant {
    /// ID of the participating user.
    pub user_id: user::Id,

    /// [`booking::Party`] the user takes, if any particular.
    pub party: Option<booking::Party>,
}

/// Selector of terminal [`Booking`]s whose deposit hold is still
/// outstanding.
#[derive(Clone, Copy, Debug)]
pub struct PendingRelease;
