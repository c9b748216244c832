//! Custom Extractors
//!
//! Axum extractors for authentication and request parsing.

use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
    RequestPartsExt,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::application::dto::ConnectQuery;

/// Raw access token presented by the caller, if any.
///
/// Looks at `Authorization: Bearer` first, then the `token` query parameter.
/// Never rejects; validation is left to the caller.
#[derive(Debug, Clone)]
pub struct AccessToken(pub Option<String>);

impl<S> FromRequestParts<S> for AccessToken
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Ok(TypedHeader(Authorization(bearer))) =
            parts.extract::<TypedHeader<Authorization<Bearer>>>().await
        {
            return Ok(Self(Some(bearer.token().to_owned())));
        }

        let token = parts
            .extract::<Query<ConnectQuery>>()
            .await
            .ok()
            .and_then(|Query(query)| query.token)
            .filter(|token| !token.is_empty());

        Ok(Self(token))
    }
}
