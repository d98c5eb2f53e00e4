//! Session extractors.
//!
//! Both read the `auth_token` cookie and validate it with the [`SessionKeys`]
//! found in application state. A token that fails validation counts as no
//! token at all.

use axum::extract::{FromRef, FromRequestParts};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use http::StatusCode;
use http::request::Parts;
use schoolhub_core::error::ErrorEnvelope;

use crate::cookie::SESSION_COOKIE;
use crate::token::{SessionKeys, SessionUser};

/// An authenticated caller. Rejects with 401 when there is no valid session.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub SessionUser);

/// The caller's session, if any. Never rejects.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<SessionUser>);

/// Rejection for [`CurrentUser`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticationRequired;

impl IntoResponse for AuthenticationRequired {
    fn into_response(self) -> Response {
        ErrorEnvelope::new("AUTHENTICATION_REQUIRED", "Authentication required")
            .into_response_with(StatusCode::UNAUTHORIZED)
    }
}

fn session_from_parts(parts: &Parts, keys: &SessionKeys) -> Option<SessionUser> {
    let jar = CookieJar::from_headers(&parts.headers);
    let token = jar.get(SESSION_COOKIE)?.value();
    if token.is_empty() {
        return None;
    }
    keys.verify(token)
}

impl<S> FromRequestParts<S> for MaybeUser
where
    SessionKeys: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    // Resolve synchronously so the returned future does not borrow `parts`.
    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let keys = SessionKeys::from_ref(state);
        let user = session_from_parts(parts, &keys);
        async move { Ok(Self(user)) }
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    SessionKeys: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthenticationRequired;

    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let keys = SessionKeys::from_ref(state);
        let user = session_from_parts(parts, &keys);
        async move { user.map(Self).ok_or(AuthenticationRequired) }
    }
}
