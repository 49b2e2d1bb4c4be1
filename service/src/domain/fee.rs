//! Marketplace fees calculation.

use common::{money::round_to_cents, Money, Percent};
use rust_decimal::Decimal;

/// Calculator of the marketplace [`Fees`] charged on top of (or deducted
/// from) a rental amount.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Calculator {
    /// Share of a rental amount kept by the platform (deducted from the
    /// owner's earnings).
    pub platform_percent: Percent,

    /// Variable share of a rental amount charged by the payment processor.
    pub processor_percent: Percent,

    /// Fixed amount charged by the payment processor per transaction.
    pub processor_fixed_fee: Decimal,
}

impl Default for Calculator {
    fn default() -> Self {
        #[expect(unsafe_code, reason = "constants are in range")]
        let (platform_percent, processor_percent) = unsafe {
            (
                Percent::new_unchecked(Decimal::new(12, 0)),
                Percent::new_unchecked(Decimal::new(29, 1)),
            )
        };
        Self {
            platform_percent,
            processor_percent,
            processor_fixed_fee: Decimal::new(30, 2),
        }
    }
}

impl Calculator {
    /// Calculates the [`Fees`] of the provided `rental` amount.
    ///
    /// Every resulting amount is rounded to cents (half-up).
    #[must_use]
    pub fn calculate(&self, rental: Money) -> Fees {
        let Money { amount, currency } = rental;
        let money = |amount| Money { amount, currency };

        let platform_fee = round_to_cents(self.platform_percent.of(amount));
        let processor_fee = round_to_cents(
            self.processor_percent.of(amount) + self.processor_fixed_fee,
        );

        Fees {
            platform_fee: money(platform_fee),
            processor_fee: money(processor_fee),
            owner_earnings: money(round_to_cents(amount - platform_fee)),
            service_fee: money(processor_fee),
            total_charge: money(round_to_cents(amount + processor_fee)),
        }
    }
}

/// Fees of a rental amount.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Fees {
    /// Fee kept by the platform.
    pub platform_fee: Money,

    /// Fee charged by the payment processor.
    pub processor_fee: Money,

    /// Amount the owner receives: the rental amount without the
    /// `platform_fee`.
    pub owner_earnings: Money,

    /// Fee the renter pays on top of the rental amount (the
    /// `processor_fee` passed through).
    pub service_fee: Money,

    /// Amount charged from the renter: the rental amount with the
    /// `service_fee`.
    pub total_charge: Money,
}
