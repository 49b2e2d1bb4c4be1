//! Domain definitions.

pub mod booking;
pub mod fee;
pub mod listing;
pub mod payment;
pub mod rating;
pub mod review;
pub mod user;

pub use self::{
    booking::Booking, listing::Listing, rating::Rating, review::Review,
};
