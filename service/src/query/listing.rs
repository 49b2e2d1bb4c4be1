//! [`Query`] collection related to a single [`Listing`].

use crate::domain::{listing, Listing};
#[cfg(doc)]
use crate::Query;

use super::Lookup;

/// Queries a [`Listing`] by its [`listing::Id`].
pub type ById = Lookup<Option<Listing>, listing::Id>;
