use std::path::Path;

use chrono::{DateTime, Utc};
use schoolhub_auth_types::token::SessionUser;
use schoolhub_domain::image::ImageFormat;
use uuid::Uuid;

/// Number of decimal digits in a login code.
pub const OTP_DIGITS: usize = 6;

/// Default code lifetime in minutes.
pub const DEFAULT_OTP_TTL_MINUTES: i64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub is_admin: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn session_user(&self) -> SessionUser {
        SessionUser {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            is_admin: self.is_admin,
        }
    }
}

/// A stored login code. At most one exists per email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpCode {
    pub id: Uuid,
    pub email: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl OtpCode {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// What the mail collaborator needs to deliver a code.
#[derive(Debug, Clone, Copy)]
pub struct OtpMessage<'a> {
    pub to: &'a str,
    pub code: &'a str,
    pub expires_at: DateTime<Utc>,
    pub valid_minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct School {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub contact: String,
    pub email: String,
    /// Path or URL handed back by the image store.
    pub image: String,
    pub created_at: DateTime<Utc>,
}

/// An accepted image waiting on local disk to be handed to the image store.
#[derive(Debug, Clone, Copy)]
pub struct ImageUpload<'a> {
    pub path: &'a Path,
    pub format: ImageFormat,
    pub len: u64,
}
