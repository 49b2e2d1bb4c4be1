//! Abstract operations and their [`Handler`]s.

use std::{future::Future, marker::PhantomData};

/// Executor of an operation described by its `Args`.
///
/// Commands, queries, tasks and infrastructure adapters are all [`Handler`]s
/// of the operations they support.
pub trait Handler<Args = ()> {
    /// Result of a successful execution.
    type Ok;

    /// Error of a failed execution.
    type Err;

    /// Executes the operation described by the provided `args`.
    fn execute(
        &self,
        args: Args,
    ) -> impl Future<Output = Result<Self::Ok, Self::Err>>;
}

/// Defines operations wrapping the value they are applied to.
macro_rules! define_operations {
    ($( $(#[doc = $doc:literal])+ $name:ident; )*) => {$(
        $(#[doc = $doc])+
        #[derive(Clone, Copy, Debug)]
        pub struct $name<T>(pub T);
    )*};
}

define_operations! {
    /// Storing a new value.
    Insert;

    /// Overwriting a stored value.
    Update;

    /// Reading a stored value.
    Select;

    /// Reading a stored value and locking it until the end of the current
    /// transaction.
    Lock;

    /// Spawning a long-running process.
    Start;

    /// Running a single iteration of a process.
    Perform;

    /// Reserving funds without settling them.
    Authorize;

    /// Settling previously [`Authorize`]d funds.
    Capture;

    /// Returning previously [`Authorize`]d funds without settling them.
    Release;

    /// Returning settled funds.
    Refund;

    /// Delivering a value to its recipient.
    Dispatch;
}

/// Opening a transaction, so the following operations are applied
/// atomically once [`Commit`]ted.
#[derive(Clone, Copy, Debug)]
pub struct Transact;

/// [`Handler`] resulting from a [`Transact`] operation.
pub type Transacted<T> = <T as Handler<Transact>>::Ok;

/// Applying the operations of a [`Transact`]ed [`Handler`].
#[derive(Clone, Copy, Debug)]
pub struct Commit;

/// Selector of the `What` values by the `B` key.
#[derive(Clone, Copy, Debug)]
pub struct By<What, B> {
    /// Kind of the selected values.
    _what: PhantomData<What>,

    /// Key to select by.
    key: B,
}

impl<What, B> By<What, B> {
    /// Creates a selector by the provided `key`.
    #[must_use]
    pub fn new(key: B) -> Self {
        Self {
            _what: PhantomData,
            key,
        }
    }

    /// Returns the key to select by.
    #[must_use]
    pub fn into_inner(self) -> B {
        self.key
    }
}
