//! Web service configuration loaded from environment variables.

use std::path::PathBuf;

use schoolhub_core::config::Config;
use schoolhub_core::tracing::LogFormat;
use serde::Deserialize;

use crate::domain::types::DEFAULT_OTP_TTL_MINUTES;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppEnv {
    Development,
    #[default]
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailTransport {
    Console,
    Smtp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageBackend {
    Local,
    Cloudinary,
}

/// Raw environment. Field `database_url` is read from `DATABASE_URL` and so on.
#[derive(Clone, Deserialize)]
pub struct WebConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,
    #[serde(default = "default_acquire_timeout_secs")]
    pub database_acquire_timeout_secs: u64,
    #[serde(default = "default_true")]
    pub run_migrations: bool,
    /// HMAC secret for session tokens.
    pub jwt_secret: String,
    #[serde(default)]
    pub app_env: AppEnv,
    /// TCP port to listen on. Env var: `PORT`.
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_otp_expiry_minutes")]
    pub otp_expiry_minutes: i64,
    #[serde(default)]
    pub log_format: LogFormat,

    pub mail_transport: Option<MailTransport>,
    pub email_host: Option<String>,
    #[serde(default = "default_email_port")]
    pub email_port: u16,
    pub email_user: Option<String>,
    pub email_pass: Option<String>,
    pub email_from: Option<String>,

    pub image_storage: Option<ImageBackend>,
    #[serde(default)]
    pub use_cloudinary: bool,
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    #[serde(default = "default_upload_url_prefix")]
    pub upload_url_prefix: String,
    #[serde(default = "default_upload_staging_dir")]
    pub upload_staging_dir: PathBuf,
    pub cloudinary_cloud_name: Option<String>,
    pub cloudinary_api_key: Option<String>,
    pub cloudinary_api_secret: Option<String>,
    #[serde(default = "default_cloudinary_folder")]
    pub cloudinary_folder: String,
}

impl Config for WebConfig {}

impl std::fmt::Debug for WebConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebConfig")
            .field("app_env", &self.app_env)
            .field("port", &self.port)
            .field("database_max_connections", &self.database_max_connections)
            .field("mail_transport", &self.mail_transport)
            .field("image_storage", &self.image_storage)
            .finish_non_exhaustive()
    }
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_port() -> u16 {
    3000
}

fn default_otp_expiry_minutes() -> i64 {
    DEFAULT_OTP_TTL_MINUTES
}

fn default_email_port() -> u16 {
    587
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("public/schoolImages")
}

fn default_upload_url_prefix() -> String {
    "/schoolImages".to_owned()
}

fn default_upload_staging_dir() -> PathBuf {
    PathBuf::from("tmp/uploads")
}

fn default_cloudinary_folder() -> String {
    "school-management/schools".to_owned()
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} is required when {when}")]
    Missing {
        key: &'static str,
        when: &'static str,
    },
    #[error("OTP_EXPIRY_MINUTES must be positive")]
    InvalidOtpExpiry,
}

/// SMTP sender settings.
#[derive(Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
}

impl std::fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("from", &self.from)
            .finish_non_exhaustive()
    }
}

impl SmtpSettings {
    /// Port 465 speaks TLS from the first byte; everything else upgrades via STARTTLS.
    pub fn implicit_tls(&self) -> bool {
        self.port == 465
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailSettings {
    Console,
    Smtp(SmtpSettings),
}

#[derive(Clone, PartialEq, Eq)]
pub struct CloudinarySettings {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub folder: String,
}

impl std::fmt::Debug for CloudinarySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinarySettings")
            .field("cloud_name", &self.cloud_name)
            .field("folder", &self.folder)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSettings {
    Local { dir: PathBuf, url_prefix: String },
    Cloudinary(CloudinarySettings),
}

impl WebConfig {
    pub fn is_development(&self) -> bool {
        self.app_env == AppEnv::Development
    }

    pub fn otp_ttl(&self) -> Result<chrono::Duration, ConfigError> {
        if self.otp_expiry_minutes <= 0 {
            return Err(ConfigError::InvalidOtpExpiry);
        }
        Ok(chrono::Duration::minutes(self.otp_expiry_minutes))
    }

    /// Resolve the mail collaborator. Defaults to the console in development.
    pub fn mail_settings(&self) -> Result<MailSettings, ConfigError> {
        let transport = self.mail_transport.unwrap_or(if self.is_development() {
            MailTransport::Console
        } else {
            MailTransport::Smtp
        });
        match transport {
            MailTransport::Console => Ok(MailSettings::Console),
            MailTransport::Smtp => {
                const WHEN: &str = "MAIL_TRANSPORT=smtp";
                let host = required(&self.email_host, "EMAIL_HOST", WHEN)?;
                let user = required(&self.email_user, "EMAIL_USER", WHEN)?;
                let pass: String = required(&self.email_pass, "EMAIL_PASS", WHEN)?
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .collect();
                let from = self
                    .email_from
                    .clone()
                    .filter(|f| !f.trim().is_empty())
                    .unwrap_or_else(|| format!("\"School Management System\" <{user}>"));
                Ok(MailSettings::Smtp(SmtpSettings {
                    host,
                    port: self.email_port,
                    user,
                    pass,
                    from,
                }))
            }
        }
    }

    /// Resolve the image collaborator. Cloudinary is the default in production.
    pub fn image_settings(&self) -> Result<ImageSettings, ConfigError> {
        let backend = self.image_storage.unwrap_or(
            if self.use_cloudinary || !self.is_development() {
                ImageBackend::Cloudinary
            } else {
                ImageBackend::Local
            },
        );
        match backend {
            ImageBackend::Local => Ok(ImageSettings::Local {
                dir: self.upload_dir.clone(),
                url_prefix: self.upload_url_prefix.trim_end_matches('/').to_owned(),
            }),
            ImageBackend::Cloudinary => {
                const WHEN: &str = "IMAGE_STORAGE=cloudinary";
                Ok(ImageSettings::Cloudinary(CloudinarySettings {
                    cloud_name: required(
                        &self.cloudinary_cloud_name,
                        "CLOUDINARY_CLOUD_NAME",
                        WHEN,
                    )?,
                    api_key: required(&self.cloudinary_api_key, "CLOUDINARY_API_KEY", WHEN)?,
                    api_secret: required(
                        &self.cloudinary_api_secret,
                        "CLOUDINARY_API_SECRET",
                        WHEN,
                    )?,
                    folder: self.cloudinary_folder.clone(),
                }))
            }
        }
    }
}

fn required(
    value: &Option<String>,
    key: &'static str,
    when: &'static str,
) -> Result<String, ConfigError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .ok_or(ConfigError::Missing { key, when })
}
