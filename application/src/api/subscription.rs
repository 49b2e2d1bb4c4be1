//! GraphQL [`Subscription`]s definitions.

use std::{future, time::Duration};

use futures::{
    stream::{self, BoxStream},
    StreamExt as _,
};
use juniper::graphql_subscription;
use service::{query, Query as _};

use crate::{api, AsError as _, Context, Error};

/// Interval of polling a `Booking` for its status changes.
const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Root of all GraphQL subscription.
#[derive(Clone, Copy, Debug)]
pub struct Subscription;

#[graphql_subscription(context = Context)]
impl Subscription {
    /// Streams the `BookingStatus` of the `Booking` with the specified ID.
    ///
    /// Emits the current status first and then every change of it, ending
    /// once the `Booking` reaches a terminal status.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - if the current session is not
    ///                              authenticated or session expired;
    /// - `BOOKING_NOT_EXISTS` - the `Booking` does not exist;
    /// - `NOT_PARTICIPANT` - the current `User` doesn't participate in it.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "bookingStatus",
            id = %id,
            otel.name = "GraphQL subscription",
        ),
    )]
    pub async fn booking_status(
        &self,
        id: api::booking::Id,
        ctx: &Context,
    ) -> Result<
        BoxStream<'static, Result<api::booking::Status, Error>>,
        Error,
    > {
        let current = super::query::participant_booking(id, ctx).await?.status;
        let service = ctx.service().clone();

        let changes = stream::unfold(Some(current), move |last| {
            let service = service.clone();
            async move {
                let last = last.filter(|s| !s.is_terminal())?;
                loop {
                    tokio::time::sleep(POLL_INTERVAL).await;
                    match service.execute(query::booking::ById::by(id.into())).await
                    {
                        Ok(Some(b)) if b.status == last => {}
                        Ok(Some(b)) => {
                            return Some((Ok(b.status.into()), Some(b.status)));
                        }
                        Ok(None) => return None,
                        Err(e) => return Some((Err(e.into_error()), None)),
                    }
                }
            }
        });

        Ok(stream::once(future::ready(Ok(current.into())))
            .chain(changes)
            .boxed())
    }
}
