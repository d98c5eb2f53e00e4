//! Session token issuance and validation.
//!
//! Tokens are stateless HS256 JWTs. Nothing is stored server-side, so a token
//! stays valid until `exp` unless the secret is rotated.

use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session lifetime in seconds (7 days). Also used as the cookie Max-Age.
pub const SESSION_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Identity carried by a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub is_admin: bool,
}

/// JWT claims payload.
///
/// | Field | JWT claim | Meaning |
/// |-------|-----------|---------|
/// | `user_id` | `userId` | user UUID |
/// | `email` | `email` | login address |
/// | `name` | `name` | display name |
/// | `is_admin` | `isAdmin` | admin flag |
/// | `iat` | `iat` | issued at, seconds since epoch |
/// | `exp` | `exp` | expiration, seconds since epoch |
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub is_admin: bool,
    pub iat: u64,
    pub exp: u64,
}

impl From<SessionClaims> for SessionUser {
    fn from(claims: SessionClaims) -> Self {
        Self {
            id: claims.user_id,
            email: claims.email,
            name: claims.name,
            is_admin: claims.is_admin,
        }
    }
}

/// Errors returned by [`SessionKeys::decode`].
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("malformed token")]
    Malformed,
}

/// A freshly signed token and its expiry (seconds since epoch).
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub exp: u64,
}

/// HMAC keys plus token lifetime. Cheap to clone.
#[derive(Clone)]
pub struct SessionKeys {
    inner: Arc<Keys>,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: u64,
}

impl fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKeys")
            .field("ttl_secs", &self.inner.ttl_secs)
            .finish_non_exhaustive()
    }
}

impl SessionKeys {
    pub fn new(secret: &str) -> Self {
        Self::with_ttl(secret, SESSION_TTL_SECS)
    }

    pub fn with_ttl(secret: &str, ttl_secs: u64) -> Self {
        Self {
            inner: Arc::new(Keys {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
                ttl_secs,
            }),
        }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.inner.ttl_secs
    }

    /// Sign a token for `user`, valid for [`Self::ttl_secs`] from now.
    pub fn issue(&self, user: &SessionUser) -> Result<IssuedToken, jsonwebtoken::errors::Error> {
        self.issue_at(user, now_secs())
    }

    /// Sign a token as if the current time were `iat`.
    pub fn issue_at(
        &self,
        user: &SessionUser,
        iat: u64,
    ) -> Result<IssuedToken, jsonwebtoken::errors::Error> {
        let exp = iat + self.inner.ttl_secs;
        let claims = SessionClaims {
            user_id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            is_admin: user.is_admin,
            iat,
            exp,
        };
        let token = encode(&Header::default(), &claims, &self.inner.encoding)?;
        Ok(IssuedToken { token, exp })
    }

    /// Decode and validate a token, returning raw claims.
    ///
    /// Validation: HS256, `exp` required and checked with zero leeway.
    pub fn decode(&self, token: &str) -> Result<SessionClaims, AuthError> {
        let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.required_spec_claims.clear();
        validation.set_required_spec_claims(&["exp"]);

        let data = decode::<SessionClaims>(token, &self.inner.decoding, &validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::Malformed,
            },
        )?;
        Ok(data.claims)
    }

    /// Validate a cookie value. Any failure yields `None`; the reason is only logged.
    pub fn verify(&self, token: &str) -> Option<SessionUser> {
        match self.decode(token) {
            Ok(claims) => Some(claims.into()),
            Err(reason) => {
                tracing::debug!(%reason, "rejected session token");
                None
            }
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
