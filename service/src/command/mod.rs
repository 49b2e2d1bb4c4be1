//! [`Command`] definition.

pub mod approve_booking;
pub mod authorize_user_session;
pub mod cancel_booking;
pub mod capture_deposit;
pub mod complete_booking;
pub mod create_booking;
pub mod create_listing;
pub mod decline_booking;
pub mod flag_review;
pub mod record_listing_view;
pub mod respond_to_review;
pub mod start_booking;
pub mod submit_review;
pub mod update_rating;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    approve_booking::ApproveBooking,
    authorize_user_session::AuthorizeUserSession,
    cancel_booking::CancelBooking, capture_deposit::CaptureDeposit,
    complete_booking::CompleteBooking, create_booking::CreateBooking,
    create_listing::CreateListing, decline_booking::DeclineBooking,
    flag_review::FlagReview, record_listing_view::RecordListingView,
    respond_to_review::RespondToReview, start_booking::StartBooking,
    submit_review::SubmitReview, update_rating::UpdateRating,
};
