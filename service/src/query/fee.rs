//! [`Query`] of marketplace fees.

use std::convert::Infallible;

use common::Money;

use crate::{domain::fee, Service};

use super::Query;

/// [`Query`] quoting the [`fee::Fees`] of a rental amount with the
/// configured [`fee::Calculator`].
#[derive(Clone, Copy, Debug)]
pub struct Quote {
    /// Rental amount to quote the [`fee::Fees`] of.
    pub amount: Money,
}

impl<Db, Pg, Nt> Query<Quote> for Service<Db, Pg, Nt> {
    type Ok = fee::Fees;
    type Err = Infallible;

    async fn execute(
        &self,
        Quote { amount }: Quote,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.config().fees.calculate(amount))
    }
}

#[cfg(test)]
mod spec {
    use crate::{
        fixture::{self, usd},
        Query as _,
    };

    use super::Quote;

    #[tokio::test]
    async fn quotes_configured_fees() {
        let svc = fixture::service();

        let fees = svc.execute(Quote { amount: usd("610") }).await.unwrap();

        assert_eq!(fees.platform_fee, usd("73.20"));
        assert_eq!(fees.processor_fee, usd("17.99"));
        assert_eq!(fees.owner_earnings, usd("536.80"));
        assert_eq!(fees.total_charge, usd("627.99"));
    }
}
