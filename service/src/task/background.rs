//! Background environment for running [`Task`]s.

use std::{
    error::Error as StdError,
    future::{Future, IntoFuture},
};

use derive_more::{Display, Error};
use futures::{
    future::{self, LocalBoxFuture},
    FutureExt as _, TryFutureExt as _,
};
use tokio::task;
use tracing as log;

#[cfg(doc)]
use crate::Task;

/// Background environment running named [`Task`]s on the current thread.
///
/// Resolves once every [`Task`] is finished, or as soon as any of them
/// fails.
#[derive(Debug, Default)]
pub struct Background {
    /// Local set driving the spawned [`Task`]s.
    set: task::LocalSet,

    /// Names and handles of the spawned [`Task`]s.
    handles: Vec<(&'static str, task::JoinHandle<Result<(), String>>)>,
}

impl Background {
    /// Spawns the provided [`Task`] `future` under the provided `name`.
    pub fn spawn<F, E>(&mut self, name: &'static str, future: F)
    where
        F: Future<Output = Result<(), E>> + 'static,
        E: StdError + 'static,
    {
        log::debug!("spawning `{name}` background task");
        let handle = self.set.spawn_local(future.map_err(|e| e.to_string()));
        self.handles.push((name, handle));
    }
}

/// Failure of a [`Task`] running in a [`Background`].
#[derive(Clone, Debug, Display, Error)]
#[display("`{name}` task stopped: {reason}")]
pub struct Failure {
    /// Name of the failed [`Task`].
    pub name: &'static str,

    /// Description of the failure.
    #[error(not(source))]
    pub reason: String,
}

impl IntoFuture for Background {
    type Output = Result<(), Failure>;
    type IntoFuture = LocalBoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        let Self { set, handles } = self;

        let tasks = handles.into_iter().map(|(name, handle)| {
            handle.map(move |res| match res {
                Ok(Ok(())) => Ok(()),
                Ok(Err(reason)) => Err(Failure { name, reason }),
                Err(e) => Err(Failure {
                    name,
                    reason: e.to_string(),
                }),
            })
        });

        // `LocalSet` makes no progress on its tasks unless polled itself.
        future::try_join(set.map(Ok), future::try_join_all(tasks))
            .map_ok(drop)
            .boxed_local()
    }
}
