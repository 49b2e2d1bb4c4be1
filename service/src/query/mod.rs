//! [`Query`] definition.

pub mod booking;
pub mod fee;
pub mod listing;
pub mod review;
pub mod user;

use common::operations::{By, Select};
use tracerr::Traced;

use crate::{
    infra::{database, Database},
    Service,
};

/// [`Query`] of the [`Service`].
pub use common::Handler as Query;

/// [`Query`] looking up the `What` values stored under the `Key` in the
/// [`Database`].
#[derive(Clone, Copy, Debug)]
pub struct Lookup<What, Key>(By<What, Key>);

impl<What, Key> Lookup<What, Key> {
    /// Creates a [`Lookup`] by the provided `key`.
    #[must_use]
    pub fn by(key: Key) -> Self {
        Self(By::new(key))
    }
}

impl<Db, Pg, Nt, What, Key> Query<Lookup<What, Key>> for Service<Db, Pg, Nt>
where
    Db: Database<
        Select<By<What, Key>>,
        Ok = What,
        Err = Traced<database::Error>,
    >,
{
    type Ok = What;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lookup(by): Lookup<What, Key>,
    ) -> Result<Self::Ok, Self::Err> {
        self.database()
            .execute(Select(by))
            .await
            .map_err(tracerr::wrap!())
    }
}
