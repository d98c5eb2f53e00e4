use anyhow::Context as _;
use chrono::{DateTime, Duration, Utc};
use rand::RngExt;
use schoolhub_auth_types::token::{IssuedToken, SessionKeys};
use schoolhub_domain::email::{is_valid_email, local_part};
use uuid::Uuid;

use crate::domain::repository::{OtpMailer, OtpRepository, UserRepository};
use crate::domain::types::{OtpCode, OtpMessage, User};
use crate::error::WebServiceError;

/// Uniform over 100000..=999999, so never zero-padded.
fn generate_code() -> String {
    rand::rng().random_range(100_000..=999_999u32).to_string()
}

// ── RequestCode ───────────────────────────────────────────────────────────────

pub struct RequestCodeInput {
    pub email: Option<String>,
}

/// Outcome of handing the code to the mail collaborator.
#[derive(Debug)]
pub enum Delivery {
    Sent,
    Failed(anyhow::Error),
}

/// A stored code plus its delivery outcome. The code is valid either way.
#[derive(Debug)]
pub struct IssuedCode {
    pub email: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub delivery: Delivery,
}

pub struct RequestCodeUseCase<O, M>
where
    O: OtpRepository,
    M: OtpMailer,
{
    pub codes: O,
    pub mailer: M,
    pub ttl: Duration,
}

impl<O, M> RequestCodeUseCase<O, M>
where
    O: OtpRepository,
    M: OtpMailer,
{
    pub async fn execute(&self, input: RequestCodeInput) -> Result<IssuedCode, WebServiceError> {
        let email = input
            .email
            .map(|e| e.trim().to_owned())
            .filter(|e| is_valid_email(e))
            .ok_or_else(|| WebServiceError::Validation("Valid email is required".to_owned()))?;

        let now = Utc::now();
        let code = OtpCode {
            id: Uuid::now_v7(),
            email,
            code: generate_code(),
            expires_at: now + self.ttl,
            created_at: now,
        };
        self.codes.replace(&code).await?;

        let message = OtpMessage {
            to: &code.email,
            code: &code.code,
            expires_at: code.expires_at,
            valid_minutes: self.ttl.num_minutes(),
        };
        let delivery = match self.mailer.send_code(message).await {
            Ok(()) => Delivery::Sent,
            Err(e) => {
                tracing::warn!(
                    email = %code.email,
                    error = format!("{e:#}"),
                    "otp delivery failed"
                );
                Delivery::Failed(e)
            }
        };

        Ok(IssuedCode {
            email: code.email,
            code: code.code,
            expires_at: code.expires_at,
            delivery,
        })
    }
}

// ── VerifyCode (login) ────────────────────────────────────────────────────────

pub struct VerifyCodeInput {
    pub email: Option<String>,
    pub otp: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug)]
pub struct LoginOutcome {
    pub user: User,
    pub session: IssuedToken,
}

pub struct VerifyCodeUseCase<O, U>
where
    O: OtpRepository,
    U: UserRepository,
{
    pub codes: O,
    pub users: U,
    pub keys: SessionKeys,
}

impl<O, U> VerifyCodeUseCase<O, U>
where
    O: OtpRepository,
    U: UserRepository,
{
    pub async fn execute(&self, input: VerifyCodeInput) -> Result<LoginOutcome, WebServiceError> {
        let email = non_blank(input.email);
        let otp = non_blank(input.otp);
        let (Some(email), Some(otp)) = (email, otp) else {
            return Err(WebServiceError::Validation(
                "Email and OTP are required".to_owned(),
            ));
        };

        // Wrong, expired and already used codes all look the same from outside.
        if !self.codes.consume(&email, &otp, Utc::now()).await? {
            return Err(WebServiceError::InvalidOrExpiredCode);
        }

        let name = non_blank(input.name).unwrap_or_else(|| local_part(&email).to_owned());
        let user = self.users.record_login(&email, &name).await?;

        let session = self
            .keys
            .issue(&user.session_user())
            .context("sign session token")?;

        tracing::info!(user_id = %user.id, "login succeeded");
        Ok(LoginOutcome { user, session })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
