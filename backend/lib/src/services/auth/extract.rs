use axum::{
    extract::{FromRef, FromRequestParts},
    http::{
        header::{HeaderName, HOST, ORIGIN},
        request::Parts,
    },
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use tracing::debug;
use url::Url;

use crate::{error::Error, models::auth::JwtClaims, services::Services};

/// Axum extractor for the allow-listed origin of the request
///
/// Rejects the request with 403 if the origin is not allowed to sign in.
pub struct RequestOrigin(pub Url);

impl<S> FromRequestParts<S> for RequestOrigin
where
    Services: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let services = Services::from_ref(state);

        let origin = services
            .auth
            .resolve_origin(header_str(parts, ORIGIN), header_str(parts, HOST))?;

        Ok(Self(origin))
    }
}

fn header_str(parts: &Parts, name: HeaderName) -> Option<&str> {
    parts.headers.get(name).and_then(|value| value.to_str().ok())
}

/// Axum extractor for a user holding a valid session token
///
/// Will error if the JWT is missing, expired or otherwise invalid
pub struct AuthenticatedUser {
    pub claims: JwtClaims,
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Services: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let services = Services::from_ref(state);

        let TypedHeader(authorization) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|e| {
                    debug!(target: "auth_service::from_request_parts", error = %e, "Missing bearer token");
                    Error::Unauthorized("No authentication token provided.".to_owned())
                })?;

        let claims = services.auth.decode_jwt(authorization.token())?;

        Ok(Self { claims })
    }
}
