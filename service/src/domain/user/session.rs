//! [`Session`] definitions.

use std::str::FromStr;

#[cfg(doc)]
use common::DateTime;
use common::DateTimeOf;
use derive_more::{AsRef, Display, Error};
use serde::{Deserialize, Serialize};

use crate::domain::user;

/// Claims of a JSON Web Token issued by the external identity provider.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct Session {
    /// ID of the authenticated user.
    pub user_id: user::Id,

    /// [`DateTime`] after which the token is rejected.
    #[serde(rename = "exp", with = "common::datetime::serde::unix_timestamp")]
    pub expires_at: ExpirationDateTime,
}

/// Compact JSON Web Token carrying the [`Session`] claims.
///
/// Only its shape is checked on parsing: the signature and the claims are
/// verified when the [`Session`] is authorized.
#[derive(AsRef, Clone, Debug, Display)]
pub struct Token(String);

/// [`Token`] which is not a `header.payload.signature` triple of base64url
/// segments.
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("malformed JSON Web Token")]
pub struct MalformedToken;

impl FromStr for Token {
    type Err = MalformedToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments = s.split('.').collect::<Vec<_>>();
        let base64url = |seg: &&str| {
            !seg.is_empty()
                && seg
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        };
        if segments.len() == 3 && segments.iter().all(base64url) {
            Ok(Self(s.to_owned()))
        } else {
            Err(MalformedToken)
        }
    }
}

/// Marker of a [`Session`] expiration moment.
#[derive(Clone, Copy, Debug)]
pub struct Expiration;

/// [`DateTime`] of a [`Session`] expiration.
pub type ExpirationDateTime = DateTimeOf<(Session, Expiration)>;

#[cfg(test)]
mod spec {
    use super::Token;

    #[test]
    fn parses_compact_tokens_only() {
        assert!("eyJhbGciOiJIUzI1NiJ9.eyJleHAiOjB9.c2lnbmF0dXJl"
            .parse::<Token>()
            .is_ok());

        for malformed in ["", "abc", "a.b", "a..c", "a.b.c.d", "a.b.c=", "a b.c.d"]
        {
            assert!(malformed.parse::<Token>().is_err(), "{malformed}");
        }
    }
}
