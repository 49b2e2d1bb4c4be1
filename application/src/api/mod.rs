//! GraphQL API definitions.

/// Defines a GraphQL enum mirroring the provided domain kind, convertible
/// both ways.
macro_rules! mirror_kind {
    (
        #[doc = $doc:literal]
        #[graphql(name = $gql_name:literal)]
        enum $name:ident: $domain:path {
            $(
                #[doc = $variant_doc:literal]
                $variant:ident
            ),* $(,)?
        }
    ) => {
        #[doc = $doc]
        #[derive(Clone, Copy, Debug, Eq, ::juniper::GraphQLEnum, PartialEq)]
        #[graphql(name = $gql_name)]
        pub enum $name {
            $(
                #[doc = $variant_doc]
                $variant,
            )*
        }

        impl From<$domain> for $name {
            fn from(kind: $domain) -> Self {
                match kind {
                    $( <$domain>::$variant => Self::$variant, )*
                }
            }
        }

        impl From<$name> for $domain {
            fn from(kind: $name) -> Self {
                match kind {
                    $( $name::$variant => Self::$variant, )*
                }
            }
        }
    };
}

pub mod booking;
pub mod fee;
pub mod listing;
mod mutation;
mod query;
pub mod rating;
pub mod review;
pub mod scalar;
mod subscription;
pub mod user;

use crate::define_error;

pub use self::{
    booking::Booking, listing::Listing, mutation::Mutation, query::Query,
    rating::Rating, review::Review, subscription::Subscription,
};

/// GraphQL schema.
pub type Schema = juniper::RootNode<'static, Query, Mutation, Subscription>;

define_error! {
    enum PrivilegeError {
        #[code = "NOT_PARTICIPANT"]
        #[status = FORBIDDEN]
        #[message = "Authenticated `User` doesn't participate in the `Booking`"]
        Participant,

        #[code = "NOT_PERMITTED"]
        #[status = FORBIDDEN]
        #[message = "Authenticated `User` may not perform this action"]
        Permitted,
    }
}

define_error! {
    enum ConflictError {
        #[code = "STATUS_CHANGED"]
        #[status = CONFLICT]
        #[message = "`Booking` status was changed concurrently, retry"]
        StatusChanged,

        #[code = "INVALID_STATUS"]
        #[status = CONFLICT]
        #[message = "Action is not allowed in the current `Booking` status"]
        InvalidStatus,

        #[code = "LISTING_UNAVAILABLE"]
        #[status = CONFLICT]
        #[message = "`Listing` is already booked for the requested dates"]
        ListingUnavailable,
    }
}
