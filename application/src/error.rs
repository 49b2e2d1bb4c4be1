//! [`Error`]-related definitions.

use std::fmt;

use axum_extra::typed_header::TypedHeaderRejection;
use derive_more::Error as StdError;
use itertools::Itertools as _;
use juniper::IntoFieldError;
use service::infra::{database, payment};
use tracerr::{Trace, Traced};

/// Defines a fieldless enum of API errors, each convertible into an
/// [`Error`] with its own code, HTTP status and message.
///
/// ```rust,ignore
/// define_error! {
///     enum ListingError {
///         #[code = "LISTING_NOT_EXISTS"]
///         #[status = NOT_FOUND]
///         #[message = "`Listing` with the specified ID does not exist"]
///         NotExists,
///     }
/// }
/// ```
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_error {
    (
        enum $name:ident {
            $(
                #[code = $code:literal]
                #[status = $status_code:ident]
                #[message = $message:literal]
                $variant:ident
            ),* $(,)?
        }
    ) => {
        /// Error of the GraphQL API.
        #[derive(
            Clone,
            Copy,
            Debug,
            ::derive_more::Display,
            Eq,
            ::derive_more::Error,
            PartialEq,
        )]
        pub enum $name {
            $(
                #[display($message)]
                #[doc = $message]
                $variant,
            )*
        }

        impl From<$name> for $crate::Error {
            fn from(err: $name) -> Self {
                let (code, status_code) = match err {
                    $( $name::$variant => {
                        ($code, ::http::StatusCode::$status_code)
                    } )*
                };
                Self::new(code, status_code, &err)
            }
        }
    };
}

/// Error returned by the GraphQL API.
///
/// Its [`Error::code`] is exposed in the `extensions` of a GraphQL error, so
/// clients can react to it without parsing the [`Error::message`].
#[derive(Clone, Debug, StdError)]
pub struct Error {
    /// Machine-readable code, like `BOOKING_NOT_EXISTS`.
    pub code: Code,

    /// [`http::StatusCode`] to respond with.
    pub status_code: http::StatusCode,

    /// [`Trace`] of the place this [`Error`] was raised at, if any.
    #[error(not(backtrace))]
    pub backtrace: Option<Trace>,

    /// Human-readable message.
    pub message: String,
}

impl Error {
    /// Creates a new [`Error`] without a [`Trace`].
    #[must_use]
    pub fn new(
        code: Code,
        status_code: http::StatusCode,
        message: &impl ToString,
    ) -> Self {
        Self {
            code,
            status_code,
            backtrace: None,
            message: message.to_string(),
        }
    }

    /// Creates a new `INTERNAL_SERVER_ERROR` [`Error`].
    #[must_use]
    pub fn internal(msg: &impl ToString) -> Self {
        Self::new(
            "INTERNAL_SERVER_ERROR",
            http::StatusCode::INTERNAL_SERVER_ERROR,
            msg,
        )
    }

    /// Creates a new `BAD_REQUEST` [`Error`] rejecting a malformed request.
    #[must_use]
    pub fn bad_request(msg: &impl ToString) -> Self {
        Self::new("BAD_REQUEST", http::StatusCode::BAD_REQUEST, msg)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]: {}", self.code, self.message)?;
        if let Some(trace) = &self.backtrace {
            write!(f, "\n{}", trace.iter().join("\n"))?;
        }
        Ok(())
    }
}

impl<S> IntoFieldError<S> for Error
where
    S: From<String>,
{
    fn into_field_error(self) -> juniper::FieldError<S> {
        let Self {
            code,
            status_code: _,
            backtrace,
            message,
        } = self;

        let mut ext = juniper::Object::with_capacity(2);
        _ = ext.add_field("code", juniper::Value::scalar(code.to_owned()));
        if let Some(trace) = backtrace {
            let frames = trace
                .iter()
                .map(|frame| juniper::Value::scalar(frame.to_string()))
                .collect();
            _ = ext.add_field("backtrace", juniper::Value::list(frames));
        }
        juniper::FieldError::new(message, juniper::Value::object(ext))
    }
}

/// Machine-readable code of an [`Error`].
pub type Code = &'static str;

/// Helper trait for converting types into [`Error`]s.
pub trait AsError {
    /// Tries to convert the type into an [`Error`].
    ///
    /// [`None`] is returned if the type cannot be converted into an [`Error`].
    fn try_as_error(&self) -> Option<Error>;

    /// Converts the type into an [`Error`].
    fn as_error(&self) -> Error
    where
        Self: fmt::Display,
    {
        self.try_as_error().unwrap_or_else(|| {
            tracing::error!("internal error: {self}");
            Error::internal(&"Internal server error")
        })
    }

    /// Converts the type into an [`Error`] by consuming it.
    fn into_error(self) -> Error
    where
        Self: fmt::Display + Sized,
    {
        self.as_error()
    }
}

impl<E: AsError> AsError for Traced<E> {
    fn try_as_error(&self) -> Option<Error> {
        let mut error = self.as_ref().try_as_error()?;
        error.backtrace = Some(self.trace().clone());
        Some(error)
    }
}

impl AsError for TypedHeaderRejection {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error::bad_request(self))
    }
}

impl AsError for database::Error {
    fn try_as_error(&self) -> Option<Error> {
        None
    }
}

impl AsError for payment::Error {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum PaymentError {
                #[code = "PAYMENT_DECLINED"]
                #[status = PAYMENT_REQUIRED]
                #[message = "Payment was declined"]
                Declined,

                #[code = "PAYMENT_UNAVAILABLE"]
                #[status = SERVICE_UNAVAILABLE]
                #[message = "Payment processor is unavailable, retry later"]
                Unavailable,
            }
        }

        Some(match self {
            Self::Declined(_) => PaymentError::Declined.into(),
            Self::Transient(_) => PaymentError::Unavailable.into(),
        })
    }
}

#[cfg(test)]
mod spec {
    use service::infra::payment;

    use super::{AsError as _, Error};

    #[test]
    fn maps_payment_errors() {
        let declined = payment::Error::Declined("insufficient funds".into())
            .try_as_error()
            .unwrap();
        assert_eq!(declined.code, "PAYMENT_DECLINED");
        assert_eq!(declined.status_code, http::StatusCode::PAYMENT_REQUIRED);

        let transient = payment::Error::Transient("timeout".into())
            .try_as_error()
            .unwrap();
        assert_eq!(transient.code, "PAYMENT_UNAVAILABLE");
        assert_eq!(
            transient.status_code,
            http::StatusCode::SERVICE_UNAVAILABLE,
        );
    }

    #[test]
    fn hides_internal_details() {
        let err = Error::internal(&"connection reset").to_string();
        let unknown = "connection reset".to_owned();

        assert_eq!(err, "[INTERNAL_SERVER_ERROR]: connection reset");
        assert_eq!(
            Unmapped(unknown).as_error().to_string(),
            "[INTERNAL_SERVER_ERROR]: Internal server error",
        );
    }

    #[derive(Debug, derive_more::Display)]
    struct Unmapped(String);

    impl super::AsError for Unmapped {
        fn try_as_error(&self) -> Option<Error> {
            None
        }
    }
}
