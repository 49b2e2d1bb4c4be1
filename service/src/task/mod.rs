//! [`Task`] definitions.

mod background;
pub mod publish_overdue_reviews;
pub mod release_pending_deposits;

pub use common::Handler as Task;

pub use self::{
    background::{Background, Failure},
    publish_overdue_reviews::PublishOverdueReviews,
    release_pending_deposits::ReleasePendingDeposits,
};
