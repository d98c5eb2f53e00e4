use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// JSON body of every failed response.
///
/// `success` is always `false` so clients can branch on a single field regardless
/// of the status code. `errors` carries field-level messages and is omitted when empty.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    success: bool,
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, String>>,
}

impl ErrorEnvelope {
    pub fn new(kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            kind,
            message: message.into(),
            errors: None,
        }
    }

    pub fn with_errors<K, V>(mut self, errors: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let errors: BTreeMap<String, String> = errors
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        if !errors.is_empty() {
            self.errors = Some(errors);
        }
        self
    }

    /// Render the envelope with the given status.
    pub fn into_response_with(self, status: StatusCode) -> Response {
        (status, axum::Json(self)).into_response()
    }
}
