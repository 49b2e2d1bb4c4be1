//! Lazily connected Postgres clients.

use std::{future::Future, sync::Arc};

use tokio::sync::{RwLock, RwLockReadGuard};
use tokio_postgres::{Row, ToStatement};
use tracerr::Traced;

use crate::infra::database::{
    self,
    postgres::{
        self,
        connection::{self, Params},
        Connection,
    },
};

/// Slot of a connection established on first use.
#[derive(Debug)]
struct Slot<C>(RwLock<Option<C>>);

impl<C> Default for Slot<C> {
    fn default() -> Self {
        Self(RwLock::new(None))
    }
}

impl<C> Slot<C> {
    /// Returns the held connection, establishing it via `connect` if the
    /// [`Slot`] is empty.
    async fn get_or_connect<F, Fut>(
        &self,
        connect: F,
    ) -> Result<RwLockReadGuard<'_, C>, Traced<database::Error>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<C, Traced<database::Error>>>,
    {
        match RwLockReadGuard::try_map(self.0.read().await, Option::as_ref) {
            Ok(held) => return Ok(held),
            Err(empty) => drop(empty),
        }

        let mut held = self.0.write().await;
        if held.is_none() {
            *held = Some(connect().await.map_err(tracerr::wrap!())?);
        }
        Ok(RwLockReadGuard::map(held.downgrade(), |c| {
            c.as_ref().expect("filled under the write lock")
        }))
    }

    /// Takes the held connection out, leaving the [`Slot`] empty.
    async fn take(&self) -> Option<C> {
        self.0.write().await.take()
    }
}

/// Postgres client running every statement in its own implicit
/// transaction.
#[derive(Clone, Debug)]
pub struct NonTx {
    /// [`connection::Pool`] to acquire connections from.
    pool: connection::Pool,

    /// Connection shared by all the clones of this [`NonTx`].
    slot: Arc<Slot<connection::NonTx>>,
}

impl NonTx {
    /// Creates a new [`NonTx`] client over the provided [`connection::Pool`].
    #[must_use]
    pub(crate) fn from_pool(pool: connection::Pool) -> Self {
        Self {
            pool,
            slot: Arc::default(),
        }
    }

    /// Acquires a fresh connection from the [`connection::Pool`], bypassing
    /// the one held by this [`NonTx`] client.
    pub(crate) async fn acquire(
        &self,
    ) -> Result<connection::NonTx, Traced<database::Error>> {
        self.pool
            .get()
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }

    /// Starts a [`Tx`] client.
    ///
    /// The transaction is opened on the first statement, reusing the
    /// connection held by this [`NonTx`] client if there is one.
    #[must_use]
    pub fn transaction(&self) -> Tx {
        Tx {
            origin: self.clone(),
            slot: Arc::default(),
        }
    }

    async fn connection(
        &self,
    ) -> Result<RwLockReadGuard<'_, connection::NonTx>, Traced<database::Error>>
    {
        self.slot.get_or_connect(|| self.acquire()).await
    }
}

/// Postgres client running all its statements in a single transaction,
/// until [`Tx::commit()`]ed.
///
/// Dropping the last clone without committing rolls the transaction back.
#[derive(Clone, Debug)]
pub struct Tx {
    /// [`NonTx`] client this [`Tx`] was started from.
    origin: NonTx,

    /// Open transaction shared by all the clones of this [`Tx`].
    slot: Arc<Slot<connection::Tx>>,
}

impl Tx {
    /// Commits the open transaction, if any.
    ///
    /// Statements issued after committing run in a new transaction.
    ///
    /// # Errors
    ///
    /// If Postgres fails to `COMMIT`.
    pub async fn commit(&self) -> Result<(), Traced<database::Error>> {
        match self.slot.take().await {
            Some(tx) => tx.commit().await.map_err(tracerr::wrap!()),
            None => Ok(()),
        }
    }

    async fn connection(
        &self,
    ) -> Result<RwLockReadGuard<'_, connection::Tx>, Traced<database::Error>>
    {
        self.slot
            .get_or_connect(|| async {
                let client = match self.origin.slot.take().await {
                    Some(held) => held,
                    None => self.origin.acquire().await?,
                };
                connection::Tx::begin(client).await
            })
            .await
    }
}

/// Implements [`Connection`] for a lazily connected client, running
/// statements on the raw client `$raw` obtained from the held connection.
macro_rules! impl_connection {
    ($client:ty, |$held:ident| $raw:expr) => {
        impl Connection for $client {
            async fn query<T>(
                &self,
                stmt: &T,
                params: &Params<'_>,
            ) -> Result<Vec<Row>, Traced<database::Error>>
            where
                T: ToStatement + ?Sized,
            {
                let $held = self.connection().await.map_err(tracerr::wrap!())?;
                $raw.query(stmt, params)
                    .await
                    .map_err(tracerr::from_and_wrap!(=> postgres::Error))
                    .map_err(tracerr::map_from)
            }

            async fn query_opt<T>(
                &self,
                stmt: &T,
                params: &Params<'_>,
            ) -> Result<Option<Row>, Traced<database::Error>>
            where
                T: ToStatement + ?Sized,
            {
                let $held = self.connection().await.map_err(tracerr::wrap!())?;
                $raw.query_opt(stmt, params)
                    .await
                    .map_err(tracerr::from_and_wrap!(=> postgres::Error))
                    .map_err(tracerr::map_from)
            }

            async fn exec<T>(
                &self,
                stmt: &T,
                params: &Params<'_>,
            ) -> Result<u64, Traced<database::Error>>
            where
                T: ToStatement + ?Sized,
            {
                let $held = self.connection().await.map_err(tracerr::wrap!())?;
                $raw.execute(stmt, params)
                    .await
                    .map_err(tracerr::from_and_wrap!(=> postgres::Error))
                    .map_err(tracerr::map_from)
            }
        }
    };
}

impl_connection!(NonTx, |held| held);
impl_connection!(Tx, |held| held.open());
