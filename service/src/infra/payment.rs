//! Payment [`Gateway`] definitions.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use common::{
    operations::{Authorize, Capture, Refund, Release},
    Money,
};
use derive_more::{Display, Error as StdError};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracerr::Traced;
use tracing as log;
use uuid::Uuid;

use crate::domain::{
    booking,
    payment::{IntentId, MethodRef},
    user,
};

/// Payment processor operation.
pub use common::Handler as Gateway;

/// Authorization of a renter charge.
#[derive(Clone, Debug)]
pub struct Charge {
    /// ID of the paid [`Booking`], used as an idempotency key.
    ///
    /// [`Booking`]: crate::domain::Booking
    pub booking_id: booking::Id,

    /// ID of the paying user.
    pub payer_id: user::Id,

    /// [`MethodRef`] to pay with.
    pub method: MethodRef,

    /// Amount to authorize.
    pub amount: Money,
}

/// Manual-capture hold of a security deposit.
#[derive(Clone, Debug)]
pub struct Hold {
    /// ID of the secured [`Booking`], used as an idempotency key.
    ///
    /// [`Booking`]: crate::domain::Booking
    pub booking_id: booking::Id,

    /// ID of the paying user.
    pub payer_id: user::Id,

    /// [`MethodRef`] to hold the amount on.
    pub method: MethodRef,

    /// Amount to hold.
    pub amount: Money,
}

/// Capture of (a part of) a [`Hold`].
#[derive(Clone, Debug)]
pub struct Claim {
    /// [`IntentId`] of the [`Hold`].
    pub intent_id: IntentId,

    /// Amount to capture.
    pub amount: Money,
}

/// Refund of (a part of) a [`Charge`].
#[derive(Clone, Debug)]
pub struct Reimbursement {
    /// [`IntentId`] of the [`Charge`].
    pub intent_id: IntentId,

    /// Amount to refund.
    pub amount: Money,

    /// Human-readable reason of the refund.
    pub reason: &'static str,
}

/// Payment [`Gateway`] error.
#[derive(Clone, Debug, Display, StdError)]
pub enum Error {
    /// Payment processor is temporarily unavailable, the operation may be
    /// retried.
    #[display("payment processor is unavailable: {_0}")]
    Transient(#[error(not(source))] String),

    /// Payment processor declined the operation.
    #[display("payment declined: {_0}")]
    Declined(#[error(not(source))] String),
}

/// Kind of an [`Intent`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum IntentKind {
    /// Authorized [`Charge`].
    Charge,

    /// Authorized [`Hold`].
    Hold,
}

/// Payment intent tracked by the [`Sandbox`].
#[derive(Clone, Debug)]
pub struct Intent {
    /// [`IntentKind`] of this [`Intent`].
    pub kind: IntentKind,

    /// Authorized amount.
    pub amount: Money,

    /// Captured amount, if any.
    pub captured: Option<Money>,

    /// Total refunded amount.
    pub refunded: Decimal,

    /// Indicator whether the authorization was released.
    pub released: bool,
}

/// [`Sandbox`] configuration.
#[derive(Clone, Copy, Debug, Default)]
pub struct SandboxConfig {
    /// Amount above which authorizations are declined, if any.
    pub decline_above: Option<Decimal>,
}

/// In-process simulated payment processor.
#[derive(Clone, Debug, Default)]
pub struct Sandbox {
    /// [`SandboxConfig`] of this [`Sandbox`].
    config: SandboxConfig,

    /// Indicator whether the simulated processor is unreachable.
    unavailable: Arc<AtomicBool>,

    /// Authorized [`Intent`]s.
    intents: Arc<Mutex<HashMap<IntentId, Intent>>>,

    /// Idempotency keys of the authorized [`Intent`]s.
    keys: Arc<Mutex<HashMap<(booking::Id, IntentKind), IntentId>>>,
}

impl Sandbox {
    /// Creates a new [`Sandbox`] with the provided [`SandboxConfig`].
    #[must_use]
    pub fn new(config: SandboxConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Simulates an outage (or a recovery) of the payment processor.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Returns the [`Intent`] with the provided [`IntentId`], if any.
    pub async fn intent(&self, id: &IntentId) -> Option<Intent> {
        self.intents.lock().await.get(id).cloned()
    }

    /// Returns all the [`Intent`]s authorized by this [`Sandbox`].
    pub async fn intents(&self) -> Vec<Intent> {
        self.intents.lock().await.values().cloned().collect()
    }

    /// Fails with [`Error::Transient`] if the processor is unavailable.
    fn ensure_available(&self) -> Result<(), Traced<Error>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(tracerr::new!(Error::Transient(
                "sandbox is offline".into()
            )));
        }
        Ok(())
    }

    /// Authorizes a new [`Intent`] idempotently.
    async fn authorize(
        &self,
        booking_id: booking::Id,
        kind: IntentKind,
        amount: Money,
    ) -> Result<IntentId, Traced<Error>> {
        self.ensure_available()?;

        let mut keys = self.keys.lock().await;
        if let Some(id) = keys.get(&(booking_id, kind)) {
            return Ok(id.clone());
        }
        if amount.is_negative() {
            return Err(tracerr::new!(Error::Declined(
                "negative amount".into()
            )));
        }
        if self.config.decline_above.is_some_and(|max| amount.amount > max) {
            return Err(tracerr::new!(Error::Declined(
                "card declined".into()
            )));
        }

        let prefix = match kind {
            IntentKind::Charge => "ch",
            IntentKind::Hold => "hold",
        };
        #[expect(unsafe_code, reason = "issued by the processor")]
        let id = unsafe {
            IntentId::new_unchecked(format!(
                "{prefix}_{}",
                Uuid::new_v4().simple(),
            ))
        };
        _ = self.intents.lock().await.insert(
            id.clone(),
            Intent {
                kind,
                amount,
                captured: None,
                refunded: Decimal::ZERO,
                released: false,
            },
        );
        _ = keys.insert((booking_id, kind), id.clone());

        log::debug!("sandbox authorized {kind:?} `{id}` of {amount}");
        Ok(id)
    }
}

impl Gateway<Authorize<Charge>> for Sandbox {
    type Ok = IntentId;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Authorize(charge): Authorize<Charge>,
    ) -> Result<Self::Ok, Self::Err> {
        self.authorize(charge.booking_id, IntentKind::Charge, charge.amount)
            .await
    }
}

impl Gateway<Authorize<Hold>> for Sandbox {
    type Ok = IntentId;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Authorize(hold): Authorize<Hold>,
    ) -> Result<Self::Ok, Self::Err> {
        self.authorize(hold.booking_id, IntentKind::Hold, hold.amount)
            .await
    }
}

impl Gateway<Capture<Claim>> for Sandbox {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Capture(claim): Capture<Claim>,
    ) -> Result<Self::Ok, Self::Err> {
        self.ensure_available()?;

        let Claim { intent_id, amount } = claim;
        let mut intents = self.intents.lock().await;
        let intent = intents
            .get_mut(&intent_id)
            .filter(|i| i.kind == IntentKind::Hold)
            .ok_or_else(|| {
                tracerr::new!(Error::Declined(format!(
                    "unknown hold `{intent_id}`"
                )))
            })?;
        if intent.released || intent.captured.is_some() {
            return Err(tracerr::new!(Error::Declined(format!(
                "hold `{intent_id}` is settled already"
            ))));
        }
        if amount.currency != intent.amount.currency
            || amount.amount > intent.amount.amount
        {
            return Err(tracerr::new!(Error::Declined(format!(
                "cannot capture {amount} of hold `{intent_id}`"
            ))));
        }
        intent.captured = Some(amount);
        Ok(())
    }
}

impl Gateway<Release<IntentId>> for Sandbox {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Release(intent_id): Release<IntentId>,
    ) -> Result<Self::Ok, Self::Err> {
        self.ensure_available()?;

        if let Some(intent) = self.intents.lock().await.get_mut(&intent_id) {
            // Captured holds have nothing left to release.
            if intent.captured.is_none() {
                intent.released = true;
            }
        }
        Ok(())
    }
}

impl Gateway<Refund<Reimbursement>> for Sandbox {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Refund(refund): Refund<Reimbursement>,
    ) -> Result<Self::Ok, Self::Err> {
        self.ensure_available()?;

        let Reimbursement {
            intent_id,
            amount,
            reason,
        } = refund;
        let mut intents = self.intents.lock().await;
        let intent = intents
            .get_mut(&intent_id)
            .filter(|i| i.kind == IntentKind::Charge && !i.released)
            .ok_or_else(|| {
                tracerr::new!(Error::Declined(format!(
                    "unknown charge `{intent_id}`"
                )))
            })?;
        if amount.currency != intent.amount.currency
            || intent.refunded + amount.amount > intent.amount.amount
        {
            return Err(tracerr::new!(Error::Declined(format!(
                "cannot refund {amount} of charge `{intent_id}`"
            ))));
        }
        intent.refunded += amount.amount;

        log::debug!("sandbox refunded {amount} of `{intent_id}`: {reason}");
        Ok(())
    }
}
