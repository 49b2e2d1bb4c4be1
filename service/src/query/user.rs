//! [`Query`] collection related to a user.

use crate::domain::{user, Rating};
#[cfg(doc)]
use crate::Query;

use super::Lookup;

/// Queries the [`Rating`] of a user by its [`user::Id`].
pub type RatingById = Lookup<Rating, user::Id>;
