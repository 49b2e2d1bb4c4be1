//! [`Booking`] lifecycle definitions.

use common::define_kind;
use derive_more::{Display, Error};

#[cfg(doc)]
use crate::domain::Booking;

define_kind! {
    #[doc = "Status of a [`Booking`]."]
    enum Status {
        #[doc = "Awaiting the owner's approval."]
        Pending = 1,

        #[doc = "Confirmed, equipment not handed over yet."]
        Confirmed = 2,

        #[doc = "Equipment is handed over to the renter."]
        InProgress = 3,

        #[doc = "Rental is finished."]
        Completed = 4,

        #[doc = "Cancelled by the renter or the owner."]
        Cancelled = 5,

        #[doc = "Declined by the owner."]
        Declined = 6,
    }
}

impl Status {
    /// Returns the [`Status`] the provided [`Event`] moves this [`Status`]
    /// into.
    ///
    /// [`None`] is returned if the [`Event`] is not allowed in this
    /// [`Status`].
    #[must_use]
    pub const fn apply(self, event: Event) -> Option<Self> {
        use Event as E;
        use Status as S;

        Some(match (self, event) {
            (S::Pending, E::Approve) => S::Confirmed,
            (S::Pending, E::Decline) => S::Declined,
            (S::Pending | S::Confirmed | S::InProgress, E::Cancel) => {
                S::Cancelled
            }
            (S::Confirmed, E::Start) => S::InProgress,
            (S::Confirmed | S::InProgress, E::Complete) => S::Completed,
            (S::Pending, E::Start | E::Complete)
            | (S::Confirmed | S::InProgress, E::Approve | E::Decline)
            | (S::InProgress, E::Start)
            | (S::Completed | S::Cancelled | S::Declined, _) => return None,
        })
    }

    /// Indicates whether no [`Event`] can move a [`Booking`] out of this
    /// [`Status`].
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Declined)
    }

    /// Indicates whether a [`Booking`] in this [`Status`] occupies its
    /// listing for its dates.
    #[must_use]
    pub const fn is_occupying(self) -> bool {
        matches!(self, Self::Confirmed | Self::InProgress)
    }
}

/// Event moving a [`Booking`] from one [`Status`] into another.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Event {
    /// Owner approves a requested [`Booking`].
    #[display("approve")]
    Approve,

    /// Owner declines a requested [`Booking`].
    #[display("decline")]
    Decline,

    /// Either party cancels a [`Booking`].
    #[display("cancel")]
    Cancel,

    /// Owner hands the equipment over.
    #[display("start")]
    Start,

    /// Owner marks the rental finished.
    #[display("complete")]
    Complete,
}

impl Event {
    /// Indicates whether the provided [`Party`] may trigger this [`Event`].
    #[must_use]
    pub const fn is_permitted_for(self, party: Party) -> bool {
        match self {
            Self::Cancel => true,
            Self::Approve | Self::Decline | Self::Start | Self::Complete => {
                matches!(party, Party::Owner)
            }
        }
    }
}

define_kind! {
    #[doc = "Party participating in a [`Booking`]."]
    enum Party {
        #[doc = "User renting the equipment."]
        Renter = 1,

        #[doc = "User owning the equipment."]
        Owner = 2,
    }
}

impl Party {
    /// Returns the other [`Party`] of a [`Booking`].
    #[must_use]
    pub const fn counterparty(self) -> Self {
        match self {
            Self::Renter => Self::Owner,
            Self::Owner => Self::Renter,
        }
    }
}

/// Error of applying an [`Event`] to a [`Booking`].
#[derive(Clone, Copy, Debug, Display, Eq, Error, PartialEq)]
pub enum TransitionError {
    /// Actor doesn't participate in the [`Booking`].
    #[display("actor doesn't participate in the booking")]
    NotParticipant,

    /// Actor's [`Party`] may not trigger the [`Event`].
    #[display("`{_0}` may not {_1} the booking")]
    NotPermitted(#[error(not(source))] Party, Event),

    /// [`Event`] is not allowed in the current [`Status`].
    #[display("cannot {_1} a `{_0}` booking")]
    InvalidState(#[error(not(source))] Status, Event),
}
