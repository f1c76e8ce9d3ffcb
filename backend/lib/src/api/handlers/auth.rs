use axum::{extract::State, response::IntoResponse, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::debug;

use crate::{
    constants::auth::SESSION_COOKIE,
    error::Error,
    models::auth::{NonceRequest, VerifyRequest},
    services::{
        auth::{AuthenticatedUser, RequestOrigin},
        Services,
    },
};

pub async fn nonce(
    State(services): State<Services>,
    RequestOrigin(origin): RequestOrigin,
    jar: CookieJar,
    Json(payload): Json<NonceRequest>,
) -> Result<impl IntoResponse, Error> {
    debug!(address = %payload.address, chain_id = payload.chain_id, "POST auth nonce");
    let (session_id, response) = services
        .auth
        .challenge(&payload.address, payload.chain_id, &origin)
        .await?;

    let cookie = Cookie::build((SESSION_COOKIE, session_id))
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(origin.scheme() == "https")
        .path("/");

    Ok((jar.add(cookie), Json(response)))
}

pub async fn verify(
    State(services): State<Services>,
    RequestOrigin(origin): RequestOrigin,
    jar: CookieJar,
    Json(payload): Json<VerifyRequest>,
) -> Result<impl IntoResponse, Error> {
    debug!(origin = %origin, "POST auth verify");
    let session_id = jar.get(SESSION_COOKIE).map(|cookie| cookie.value().to_owned());

    let response = services
        .auth
        .login(
            &payload.message,
            &payload.signature,
            &origin,
            session_id.as_deref(),
        )
        .await?;

    // the nonce behind the cookie has been consumed
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));

    Ok((jar, Json(response)))
}

pub async fn session(
    State(services): State<Services>,
    AuthenticatedUser { claims }: AuthenticatedUser,
) -> Result<impl IntoResponse, Error> {
    debug!(user = %claims.address, "GET auth session");
    Ok(Json(services.auth.session(&claims)))
}
