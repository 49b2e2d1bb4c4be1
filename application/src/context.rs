//! [`Context`] of a GraphQL request.

use std::sync::atomic::{AtomicU16, Ordering};

use axum::{async_trait, extract::FromRequestParts, RequestPartsExt as _};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use juniper::{
    http::{GraphQLBatchResponse, GraphQLResponse},
    IntoFieldError as _,
};
use service::{
    command::{self, Command as _},
    domain::user::{self, session, Session},
};
use tokio::sync::OnceCell;

use crate::{define_error, AsError, Error, JuniperResponse, Service};

/// Context of a single GraphQL request, or of a whole GraphQL subscription
/// connection.
#[derive(Debug)]
pub struct Context {
    /// [`Service`] executing the request.
    service: Service,

    /// HTTP status code to respond with if the request fails.
    error_status_code: AtomicU16,

    /// Parts of the HTTP request carrying the credentials.
    parts: http::request::Parts,

    /// Outcome of authenticating the request, resolved on first demand.
    session: OnceCell<Result<Session, Error>>,
}

impl Context {
    /// Returns the [`Service`] executing the request.
    #[must_use]
    pub fn service(&self) -> &Service {
        &self.service
    }

    /// Returns the HTTP status code to respond with if the request fails.
    #[must_use]
    pub fn error_status_code(&self) -> http::StatusCode {
        http::StatusCode::from_u16(
            self.error_status_code.load(Ordering::Relaxed),
        )
        .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Remembers the [`Error::status_code`] of the provided [`Error`] to
    /// respond with, passing the [`Error`] through.
    ///
    /// Meant to be used in [`Result::map_err()`].
    pub fn error(&self) -> impl FnOnce(Error) -> Error + '_ {
        move |err| {
            self.error_status_code
                .store(err.status_code.as_u16(), Ordering::Relaxed);
            err
        }
    }

    /// Returns the ID of the authenticated [`user`] making the request.
    ///
    /// # Errors
    ///
    /// - `AUTHORIZATION_REQUIRED` if no valid bearer token is provided.
    pub async fn current_user(&self) -> Result<user::Id, Error> {
        self.session()
            .await
            .map(|s| s.user_id)
            .map_err(self.error())
    }

    /// Returns the ID of the [`user`] making the request, if it's
    /// authenticated.
    ///
    /// # Errors
    ///
    /// If a bearer token is provided, but it's invalid or expired.
    pub async fn viewer(&self) -> Result<Option<user::Id>, Error> {
        match self.session().await {
            Ok(s) => Ok(Some(s.user_id)),
            Err(_) if !self.has_credentials() => Ok(None),
            Err(e) => Err(e).map_err(self.error()),
        }
    }

    /// Places the `authToken` variable of a GraphQL subscription
    /// initialization into the `Authorization` header, so the connection is
    /// authenticated the same way as a plain HTTP request.
    ///
    /// # Errors
    ///
    /// `INVALID_VARIABLES` if the `authToken` is not a valid token string.
    pub(crate) fn apply_subscription_variables(
        &mut self,
        vars: &juniper::Variables,
    ) -> Result<(), Error> {
        let Some(token) = vars.get("authToken") else {
            return Ok(());
        };
        let header = token
            .as_string_value()
            .and_then(|t| format!("Bearer {t}").parse().ok())
            .ok_or_else(|| Error::from(AuthError::InvalidVariables))?;
        _ = self.parts.headers.insert(http::header::AUTHORIZATION, header);
        Ok(())
    }

    /// Indicates whether the request carries an `Authorization` header.
    fn has_credentials(&self) -> bool {
        self.parts.headers.contains_key(http::header::AUTHORIZATION)
    }

    /// Returns the [`Session`] of the request, authenticating it once.
    async fn session(&self) -> Result<Session, Error> {
        self.session
            .get_or_init(|| self.authenticate())
            .await
            .clone()
    }

    /// Authorizes the bearer token of the request.
    async fn authenticate(&self) -> Result<Session, Error> {
        let TypedHeader(Authorization(bearer)) = self
            .parts
            .clone()
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|e| {
                if e.is_missing() {
                    AuthError::AuthorizationRequired.into()
                } else {
                    e.into_error()
                }
            })?;

        let token = bearer
            .token()
            .parse::<session::Token>()
            .map_err(|_| Error::from(AuthError::AuthorizationRequired))?;
        self.service
            .execute(command::AuthorizeUserSession { token })
            .await
            .map_err(AsError::into_error)
    }
}

impl juniper::Context for Context {}

#[async_trait]
impl<S> FromRequestParts<S> for Context
where
    S: Send + Sync,
{
    type Rejection = JuniperResponse;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _: &S,
    ) -> Result<Self, Self::Rejection> {
        let Some(service) = parts.extensions.get::<Service>().cloned() else {
            let err = Error::internal(&"missing `Service` extension");
            return Err(JuniperResponse {
                status_code: err.status_code,
                response: GraphQLBatchResponse::Single(GraphQLResponse::error(
                    err.into_field_error(),
                )),
            });
        };

        Ok(Self {
            service,
            error_status_code: AtomicU16::new(
                http::StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            ),
            parts: parts.clone(),
            session: OnceCell::new(),
        })
    }
}

impl AsError for command::authorize_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::JsonWebTokenDecodeError(_) => {
                Some(AuthError::AuthorizationRequired.into())
            }
        }
    }
}

define_error! {
    enum AuthError {
        #[code = "AUTHORIZATION_REQUIRED"]
        #[status = UNAUTHORIZED]
        #[message = "Authorization required"]
        AuthorizationRequired,

        #[code = "INVALID_VARIABLES"]
        #[status = BAD_REQUEST]
        #[message = "Invalid subscription authorization variables"]
        InvalidVariables,
    }
}

#[cfg(test)]
mod spec {
    use jsonwebtoken::errors::ErrorKind;
    use service::command::authorize_user_session::ExecutionError;

    use crate::AsError as _;

    #[test]
    fn rejected_token_requires_authorization() {
        for kind in [ErrorKind::ExpiredSignature, ErrorKind::InvalidSignature] {
            let err = ExecutionError::from(jsonwebtoken::errors::Error::from(
                kind,
            ))
            .into_error();

            assert_eq!(err.code, "AUTHORIZATION_REQUIRED");
            assert_eq!(err.status_code, http::StatusCode::UNAUTHORIZED);
        }
    }
}
