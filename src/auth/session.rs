use std::time::Duration;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::COOKIE, request::Parts, HeaderMap, HeaderValue},
};
use tracing::warn;
use uuid::Uuid;

use crate::{auth::jwt::JwtKeys, error::ApiError, state::AppState, users::repo_types::User};

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "token";

/// Single rejection message for every authentication failure on protected
/// routes, never distinguishing cause.
const UNAUTHORIZED: &str = "Not authorized, please log in.";

/// Clearing value: empty token, expiry at the epoch.
const CLEARED_COOKIE: &str =
    "token=; Path=/; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; SameSite=None; Secure";

/// Build the `Set-Cookie` value carrying a freshly signed session token.
pub fn session_cookie(token: &str, ttl: Duration) -> anyhow::Result<HeaderValue> {
    let value = format!(
        "{SESSION_COOKIE}={token}; Path=/; Max-Age={}; HttpOnly; SameSite=None; Secure",
        ttl.as_secs()
    );
    Ok(HeaderValue::from_str(&value)?)
}

/// Build the `Set-Cookie` value that clears the session cookie.
pub fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static(CLEARED_COOKIE)
}

/// Pull the session token out of the request's `Cookie` header, if any.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(COOKIE)?.to_str().ok()?;
    for pair in value.split(';') {
        let mut parts = pair.trim().splitn(2, '=');
        let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
            continue;
        };
        if key.trim() == SESSION_COOKIE {
            return Some(val.trim().to_string());
        }
    }
    None
}

/// Authenticated identity: a valid session cookie naming a user that still
/// exists.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from_headers(&parts.headers)
            .ok_or_else(|| ApiError::Auth(UNAUTHORIZED.into()))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(&token).map_err(|_| {
            warn!("session token rejected");
            ApiError::Auth(UNAUTHORIZED.into())
        })?;

        // a token can outlive its account
        if User::find_by_id(&state.db, claims.sub).await?.is_none() {
            warn!(user_id = %claims.sub, "session token for unknown user");
            return Err(ApiError::Auth(UNAUTHORIZED.into()));
        }

        Ok(AuthUser(claims.sub))
    }
}
