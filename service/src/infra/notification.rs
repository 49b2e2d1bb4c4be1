//! Notification [`Dispatcher`] definitions.

use std::collections::BTreeMap;
#[cfg(test)]
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use common::{define_kind, operations::Dispatch};
use derive_more::{Display, Error as StdError};
#[cfg(test)]
use tokio::sync::Mutex;
use tracerr::Traced;
use tracing as log;

use crate::domain::user;

/// Dispatcher of [`Notification`]s to the external fan-out.
pub use common::Handler as Dispatcher;

/// Notification of a user.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Notification {
    /// ID of the notified user.
    pub user_id: user::Id,

    /// [`Template`] to render the [`Notification`] with.
    pub template: Template,

    /// Data to render the [`Template`] with.
    pub data: Data,
}

/// Data of a [`Notification`].
pub type Data = BTreeMap<&'static str, String>;

define_kind! {
    #[doc = "Template of a [`Notification`]."]
    enum Template {
        #[doc = "Booking is confirmed."]
        BookingConfirmed = 1,

        #[doc = "Booking is requested and awaits approval."]
        BookingRequested = 2,

        #[doc = "Booking is declined by the owner."]
        BookingDeclined = 3,

        #[doc = "Booking is cancelled by the counterparty."]
        BookingCancelled = 4,

        #[doc = "Owner earnings are being paid out."]
        Payout = 5,

        #[doc = "Booking may be reviewed now."]
        ReviewReminder = 6,

        #[doc = "Review is published."]
        ReviewPublished = 7,
    }
}

/// [`Dispatcher`] error.
#[derive(Clone, Debug, Display, StdError)]
pub enum Error {
    /// Notification service is unavailable.
    #[display("notification service is unavailable: {_0}")]
    Unavailable(#[error(not(source))] String),
}

/// [`Dispatcher`] emitting a structured log line per [`Notification`], which
/// is handed to the external fan-out by log shipping.
#[derive(Clone, Copy, Debug, Default)]
pub struct Log;

impl Dispatcher<Dispatch<Notification>> for Log {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Dispatch(notification): Dispatch<Notification>,
    ) -> Result<Self::Ok, Self::Err> {
        let Notification {
            user_id,
            template,
            data,
        } = notification;
        log::info!(
            target: "notification",
            user_id = %user_id,
            template = %template,
            data = ?data,
            "notification dispatched"
        );
        Ok(())
    }
}

/// [`Dispatcher`] remembering all the dispatched [`Notification`]s.
#[cfg(test)]
#[derive(Clone, Debug, Default)]
pub struct Recorder {
    /// Dispatched [`Notification`]s.
    sent: Arc<Mutex<Vec<Notification>>>,

    /// Indicator whether dispatching fails.
    failing: Arc<AtomicBool>,
}

#[cfg(test)]
impl Recorder {
    /// Makes all the following dispatches fail (or succeed).
    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Returns all the dispatched [`Notification`]s.
    pub(crate) async fn sent(&self) -> Vec<Notification> {
        self.sent.lock().await.clone()
    }

    /// Returns the [`Template`]s dispatched to the provided user.
    pub(crate) async fn templates_of(&self, user_id: user::Id) -> Vec<Template> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|n| n.user_id == user_id)
            .map(|n| n.template)
            .collect()
    }
}

#[cfg(test)]
impl Dispatcher<Dispatch<Notification>> for Recorder {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Dispatch(notification): Dispatch<Notification>,
    ) -> Result<Self::Ok, Self::Err> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(tracerr::new!(Error::Unavailable("recorder".into())));
        }
        self.sent.lock().await.push(notification);
        Ok(())
    }
}

#[cfg(test)]
mod spec {
    use common::operations::Dispatch;

    use crate::domain::user;

    use super::{Data, Dispatcher as _, Log, Notification, Recorder, Template};

    fn notification(user_id: user::Id) -> Notification {
        Notification {
            user_id,
            template: Template::Payout,
            data: Data::from([("amount", "120.00".to_owned())]),
        }
    }

    #[tokio::test]
    async fn log_dispatch_never_fails() {
        Log.execute(Dispatch(notification(user::Id::new())))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn recorder_fails_while_told_to() {
        let recorder = Recorder::default();
        let user_id = user::Id::new();

        recorder.set_failing(true);
        assert!(recorder
            .execute(Dispatch(notification(user_id)))
            .await
            .is_err());
        assert!(recorder.sent().await.is_empty());

        recorder.set_failing(false);
        recorder
            .execute(Dispatch(notification(user_id)))
            .await
            .unwrap();
        assert_eq!(recorder.templates_of(user_id).await, [Template::Payout]);
    }
}
