//! Login code delivery.

use anyhow::Context as _;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::{MailSettings, SmtpSettings};
use crate::domain::repository::OtpMailer;
use crate::domain::types::OtpMessage;

const SUBJECT: &str = "Your Login OTP Code";

/// Mail transport chosen once at startup.
#[derive(Clone)]
pub enum Mailer {
    /// Writes codes to the log. Development only.
    Console,
    Smtp(SmtpMailer),
}

impl Mailer {
    pub fn from_settings(settings: &MailSettings) -> anyhow::Result<Self> {
        match settings {
            MailSettings::Console => Ok(Self::Console),
            MailSettings::Smtp(smtp) => Ok(Self::Smtp(SmtpMailer::new(smtp)?)),
        }
    }
}

impl OtpMailer for Mailer {
    async fn send_code(&self, message: OtpMessage<'_>) -> anyhow::Result<()> {
        match self {
            Self::Console => {
                tracing::info!(
                    to = message.to,
                    code = message.code,
                    valid_minutes = message.valid_minutes,
                    "otp code (console transport)"
                );
                Ok(())
            }
            Self::Smtp(smtp) => smtp.send(message).await,
        }
    }
}

#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> anyhow::Result<Self> {
        let builder = if settings.implicit_tls() {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
        }
        .with_context(|| format!("configure smtp relay {}", settings.host))?;

        let transport = builder
            .port(settings.port)
            .credentials(Credentials::new(
                settings.user.clone(),
                settings.pass.clone(),
            ))
            .build();
        let from = settings
            .from
            .parse::<Mailbox>()
            .with_context(|| format!("parse EMAIL_FROM {:?}", settings.from))?;

        Ok(Self { transport, from })
    }

    async fn send(&self, message: OtpMessage<'_>) -> anyhow::Result<()> {
        let email = build_message(&self.from, message)?;
        self.transport
            .send(email)
            .await
            .context("send otp email")?;
        tracing::info!(to = message.to, "otp email sent");
        Ok(())
    }
}

fn build_message(from: &Mailbox, message: OtpMessage<'_>) -> anyhow::Result<Message> {
    let to = message
        .to
        .parse::<Mailbox>()
        .context("parse recipient address")?;
    let expiry = message.expires_at.format("%H:%M UTC");
    let minutes = message.valid_minutes;
    let code = message.code;

    let text = format!(
        "Your OTP code is: {code}\n\n\
         This code will expire at {expiry} (valid for {minutes} minutes).\n\n\
         If you did not request this code, please ignore this email."
    );
    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;
  padding: 20px;">
  <h2 style="color: #3b82f6; text-align: center;">{SUBJECT}</h2>
  <h1 style="font-size: 32px; letter-spacing: 8px; text-align: center; color: #1e40af;">{code}</h1>
  <p>Please use the above code to login to your School Management System account.</p>
  <p>This code will expire at <strong>{expiry}</strong> (valid for {minutes} minutes).</p>
  <p style="font-size: 12px; color: #666;">
    If you did not request this code, please ignore this email.
  </p>
</div>"#
    );

    Message::builder()
        .from(from.clone())
        .to(to)
        .subject(SUBJECT)
        .multipart(MultiPart::alternative_plain_html(text, html))
        .context("build otp email")
}
