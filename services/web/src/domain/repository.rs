#![allow(async_fn_in_trait)]

use chrono::{DateTime, Utc};

use crate::domain::types::{ImageUpload, OtpCode, OtpMessage, School, User};
use crate::error::WebServiceError;

/// Repository for user accounts.
pub trait UserRepository: Send + Sync {
    /// Create the account on first login, otherwise refresh `last_login`.
    ///
    /// `name` is only used when the account is created; an existing account keeps its name.
    async fn record_login(&self, email: &str, name: &str) -> Result<User, WebServiceError>;
}

/// Repository for one-time login codes.
pub trait OtpRepository: Send + Sync {
    /// Delete every code stored for `code.email`, then insert `code`. Atomic.
    async fn replace(&self, code: &OtpCode) -> Result<(), WebServiceError>;

    /// Delete the code matching `email` and `code` if it is still live at `now`.
    ///
    /// Returns `true` only for the caller whose delete removed the row, so concurrent
    /// attempts with the same code cannot both succeed.
    async fn consume(
        &self,
        email: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, WebServiceError>;
}

/// Repository for the school directory.
pub trait SchoolRepository: Send + Sync {
    async fn create(&self, school: &School) -> Result<(), WebServiceError>;

    /// All schools, most recently created first.
    async fn list_latest_first(&self) -> Result<Vec<School>, WebServiceError>;
}

// ── Collaborators ─────────────────────────────────────────────────────────────

/// Delivers login codes.
pub trait OtpMailer: Send + Sync {
    async fn send_code(&self, message: OtpMessage<'_>) -> anyhow::Result<()>;
}

/// Persists accepted images and hands back a public reference.
pub trait ImageStorage: Send + Sync {
    async fn store(&self, image: ImageUpload<'_>) -> anyhow::Result<String>;

    /// Best-effort removal of a reference previously returned by [`Self::store`].
    async fn remove(&self, reference: &str) -> anyhow::Result<()>;
}
