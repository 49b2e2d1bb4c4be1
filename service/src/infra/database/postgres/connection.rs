//! Raw Postgres connections and the [`Connection`] abstraction over them.

use std::{fmt, future::Future};

use futures::{FutureExt as _, TryFutureExt as _};
use ouroboros::self_referencing;
use tokio_postgres::{types::ToSql, Row, ToStatement};
use tracerr::Traced;

use crate::infra::database::{self, postgres};

pub use deadpool_postgres::{
    Client as NonTx, CreatePoolError as PoolCreationError, Pool, PoolError,
};
pub use tokio_postgres::Error;

/// Parameters bound to a SQL statement.
pub type Params<'p> = [&'p (dyn ToSql + Sync)];

/// Pooled connection with an open transaction.
#[self_referencing]
pub struct Tx {
    /// Pooled connection the transaction is open on.
    client: NonTx,

    /// Open transaction, taken out once committed.
    #[borrows(mut client)]
    #[not_covariant]
    open: Option<deadpool_postgres::Transaction<'this>>,
}

impl fmt::Debug for Tx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let open = self.with_open(|tx| tx.is_some());
        f.debug_struct("Tx").field("open", &open).finish_non_exhaustive()
    }
}

impl Tx {
    /// Opens a new transaction on the provided pooled `client`.
    ///
    /// # Errors
    ///
    /// If Postgres refuses to `BEGIN` the transaction.
    pub async fn begin(client: NonTx) -> Result<Self, Traced<database::Error>> {
        Self::try_new_async_send(client, |c| c.transaction().map_ok(Some).boxed())
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }

    /// Returns the open transaction.
    pub(super) fn open(&self) -> &deadpool_postgres::Transaction<'_> {
        self.with_open(|tx| tx.as_ref().expect("`Tx` is consumed on commit"))
    }

    /// Commits the open transaction, releasing the pooled connection.
    ///
    /// # Errors
    ///
    /// If Postgres fails to `COMMIT` the transaction.
    pub async fn commit(mut self) -> Result<(), Traced<database::Error>> {
        #[expect(
            clippy::redundant_closure_for_method_calls,
            reason = "`Option::take` doesn't fit the borrowed lifetime"
        )]
        let Some(tx) = self.with_open_mut(|tx| tx.take()) else {
            return Ok(());
        };
        tx.commit()
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }
}

/// Postgres client able to run SQL statements.
pub trait Connection {
    /// Runs the provided `stmt` returning all the resulting [`Row`]s.
    ///
    /// # Errors
    ///
    /// If the connection cannot be established or the statement fails.
    fn query<T>(
        &self,
        stmt: &T,
        params: &Params<'_>,
    ) -> impl Future<Output = Result<Vec<Row>, Traced<database::Error>>>
    where
        T: ToStatement + ?Sized;

    /// Runs the provided `stmt` returning at most one resulting [`Row`].
    ///
    /// # Errors
    ///
    /// If the connection cannot be established, the statement fails or
    /// returns more than one [`Row`].
    fn query_opt<T>(
        &self,
        stmt: &T,
        params: &Params<'_>,
    ) -> impl Future<Output = Result<Option<Row>, Traced<database::Error>>>
    where
        T: ToStatement + ?Sized;

    /// Runs the provided `stmt` returning the number of affected rows.
    ///
    /// # Errors
    ///
    /// If the connection cannot be established or the statement fails.
    fn exec<T>(
        &self,
        stmt: &T,
        params: &Params<'_>,
    ) -> impl Future<Output = Result<u64, Traced<database::Error>>>
    where
        T: ToStatement + ?Sized;
}
