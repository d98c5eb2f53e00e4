use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use schoolhub_core::error::ErrorEnvelope;
use schoolhub_domain::image::ImageRejection;
use schoolhub_domain::school::FieldErrors;

/// Web service error variants.
#[derive(Debug, thiserror::Error)]
pub enum WebServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("Validation failed")]
    InvalidFields(FieldErrors),
    #[error("Invalid or expired OTP. Please request a new one.")]
    InvalidOrExpiredCode,
    #[error("Failed to send OTP email. Please try again or contact support.")]
    DeliveryFailed(#[source] anyhow::Error),
    #[error("Failed to store school image")]
    StorageFailed(#[source] anyhow::Error),
    #[error("Internal server error")]
    Persistence(#[from] anyhow::Error),
}

impl WebServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) | Self::InvalidFields(_) => "VALIDATION",
            Self::InvalidOrExpiredCode => "INVALID_OR_EXPIRED_CODE",
            Self::DeliveryFailed(_) | Self::StorageFailed(_) => "UPSTREAM_DELIVERY_FAILURE",
            Self::Persistence(_) => "PERSISTENCE",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidFields(_) | Self::InvalidOrExpiredCode => {
                StatusCode::BAD_REQUEST
            }
            Self::DeliveryFailed(_) | Self::StorageFailed(_) | Self::Persistence(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ImageRejection> for WebServiceError {
    fn from(rejection: ImageRejection) -> Self {
        Self::Validation(rejection.to_string())
    }
}

impl From<JsonRejection> for WebServiceError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<MultipartRejection> for WebServiceError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl IntoResponse for WebServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        // TraceLayer already records every status; only 5xx carry a cause worth logging.
        match &self {
            Self::DeliveryFailed(e) | Self::StorageFailed(e) | Self::Persistence(e) => {
                tracing::error!(error = format!("{e:#}"), kind = self.kind(), "request failed");
            }
            _ => {}
        }
        let envelope = ErrorEnvelope::new(self.kind(), self.to_string());
        let envelope = match self {
            Self::InvalidFields(errors) => envelope.with_errors(errors),
            _ => envelope,
        };
        envelope.into_response_with(status)
    }
}
