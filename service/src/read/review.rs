//! [`Review`] read model definitions.

use common::Date;

#[cfg(doc)]
use crate::domain::{Booking, Review};

/// Selector of unpublished [`Review`]s of completed [`Booking`]s ended on or
/// before the provided [`Date`].
#[derive(Clone, Copy, Debug)]
pub struct Overdue {
    /// Latest end [`Date`] of the [`Booking`]s.
    pub ended_by: Date,
}
