//! Session helpers for integration tests.
//!
//! `MockSession` signs a real session token with the test secret, so requests
//! go through the same cookie validation as production traffic.

use http::{HeaderName, HeaderValue, header};
use schoolhub_auth_types::cookie::SESSION_COOKIE;
use schoolhub_auth_types::token::{SessionKeys, SessionUser};
use uuid::Uuid;

/// Secret shared by test app state and `MockSession`.
pub const TEST_JWT_SECRET: &str = "schoolhub-test-secret";

/// A signed-in user for test requests.
pub struct MockSession {
    pub user: SessionUser,
    keys: SessionKeys,
}

impl MockSession {
    pub fn new(email: &str) -> Self {
        Self::with_keys(email, SessionKeys::new(TEST_JWT_SECRET))
    }

    pub fn with_keys(email: &str, keys: SessionKeys) -> Self {
        let name = email.split('@').next().unwrap_or(email).to_owned();
        Self {
            user: SessionUser {
                id: Uuid::now_v7(),
                email: email.to_owned(),
                name,
                is_admin: false,
            },
            keys,
        }
    }

    pub fn token(&self) -> String {
        self.keys.issue(&self.user).unwrap().token
    }

    /// `Cookie: auth_token=<token>` as a header pair.
    pub fn cookie_header(&self) -> (HeaderName, HeaderValue) {
        let value = format!("{SESSION_COOKIE}={}", self.token());
        (header::COOKIE, HeaderValue::from_str(&value).unwrap())
    }
}
