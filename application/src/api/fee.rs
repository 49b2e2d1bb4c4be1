//! Marketplace [`Fees`] definitions.

use common::Money;
use derive_more::From;
use juniper::graphql_object;
use service::domain;

use crate::Context;

/// Fees of a rental amount.
#[derive(Clone, Copy, Debug, From)]
pub struct Fees(domain::fee::Fees);

/// Fees of a rental amount.
#[graphql_object(name = "FeeQuote", context = Context)]
impl Fees {
    /// Fee kept by the platform.
    #[must_use]
    pub fn platform_fee(&self) -> Money {
        self.0.platform_fee
    }

    /// Fee charged by the payment processor.
    #[must_use]
    pub fn processor_fee(&self) -> Money {
        self.0.processor_fee
    }

    /// Amount the owner receives.
    #[must_use]
    pub fn owner_earnings(&self) -> Money {
        self.0.owner_earnings
    }

    /// Fee the renter pays on top of the rental amount.
    #[must_use]
    pub fn service_fee(&self) -> Money {
        self.0.service_fee
    }

    /// Amount charged from the renter.
    #[must_use]
    pub fn total_charge(&self) -> Money {
        self.0.total_charge
    }
}
