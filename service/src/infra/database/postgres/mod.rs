//! Postgres [`Database`] implementation.

mod client;
pub mod connection;
mod impls;

use deadpool_postgres::Runtime;
use derive_more::{Deref, Display, Error as StdError, From};
use tokio_postgres::{error::SqlState, NoTls};
use tracerr::Traced;

use crate::infra::database;
#[cfg(doc)]
use crate::infra::Database;

pub use refinery::embed_migrations;

pub use self::{
    client::{NonTx, Tx},
    connection::Connection,
};

pub use deadpool_postgres::Config;

/// Postgres [`Database`] client.
#[derive(Clone, Copy, Debug, Deref)]
pub struct Postgres<T = NonTx>(T);

impl Postgres {
    /// Creates a new [`Postgres`] client with the provided [`Config`].
    ///
    /// # Errors
    ///
    /// If failed to create a new [`Postgres`] client.
    pub fn new(conf: &Config) -> Result<Self, Traced<database::Error>> {
        let pool = conf
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(tracerr::from_and_wrap!(=> Error))
            .map_err(tracerr::map_from)?;
        Ok(Self(NonTx::from_pool(pool)))
    }

    /// Applies the migrations of the provided [`refinery::Runner`] which
    /// are not applied yet.
    ///
    /// # Errors
    ///
    /// If no connection can be acquired, or any migration fails.
    pub async fn migrate(
        &self,
        runner: &refinery::Runner,
    ) -> Result<refinery::Report, Traced<database::Error>> {
        let mut client = self.0.acquire().await.map_err(tracerr::wrap!())?;
        runner
            .run_async(&mut **client)
            .await
            .map_err(tracerr::from_and_wrap!(=> Error))
            .map_err(tracerr::map_from)
    }
}

/// Error of the [`Postgres`] client.
#[derive(Debug, Display, StdError, From)]
pub enum Error {
    /// Statement failed on the server or the connection broke.
    #[display("Postgres error: {_0}")]
    Connection(connection::Error),

    /// [`connection::Pool`] cannot be created from the [`Config`].
    #[display("Invalid Postgres pool config: {_0}")]
    PoolCreation(connection::PoolCreationError),

    /// No connection could be acquired from the [`connection::Pool`].
    #[display("Postgres pool exhausted: {_0}")]
    Pool(connection::PoolError),

    /// Schema migration failed.
    #[display("Migration failed: {_0}")]
    Migration(refinery::Error),
}

impl Error {
    /// Checks whether this [`Error`] is a unique violation, of the provided
    /// `constraint` if it's specified.
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        self.violates(&SqlState::UNIQUE_VIOLATION, constraint)
    }

    /// Checks whether this [`Error`] is an exclusion violation, of the
    /// provided `constraint` if it's specified.
    ///
    /// Overlapping rental periods of a listing are rejected this way.
    #[must_use]
    pub fn is_exclusion_violation(&self, constraint: Option<&str>) -> bool {
        self.violates(&SqlState::EXCLUSION_VIOLATION, constraint)
    }

    fn violates(&self, state: &SqlState, constraint: Option<&str>) -> bool {
        let Self::Connection(e) = self else {
            return false;
        };
        let violated = e.as_db_error().and_then(|db| db.constraint());
        e.code() == Some(state)
            && constraint.map_or(true, |c| violated == Some(c))
    }
}
