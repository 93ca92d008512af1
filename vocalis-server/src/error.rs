//! Relay errors and their JSON wire shape

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("message must be a non-empty string")]
    InvalidMessage,

    #[error("chat provider credential is not configured")]
    MissingCredential { hint: String },

    #[error("chat provider returned HTTP {status}: {detail}")]
    ChatProviderFailed { status: u16, detail: String },

    #[error("failed to initialise relay: {0}")]
    Setup(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Stable code sent to the client in the `error` field.
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::InvalidMessage => "invalid_message",
            RelayError::MissingCredential { .. } => "missing_credential",
            RelayError::ChatProviderFailed { .. } => "chat_provider_failed",
            RelayError::Setup(_) | RelayError::Internal(_) => "internal_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::InvalidMessage => StatusCode::BAD_REQUEST,
            RelayError::ChatProviderFailed { .. } => StatusCode::BAD_GATEWAY,
            RelayError::MissingCredential { .. }
            | RelayError::Setup(_)
            | RelayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Response body. Internal details never leave the process.
    pub fn body(&self) -> Value {
        match self {
            RelayError::MissingCredential { hint } => json!({
                "error": self.code(),
                "hint": hint,
            }),
            RelayError::ChatProviderFailed { status, detail } => json!({
                "error": self.code(),
                "status": status,
                "detail": detail,
            }),
            _ => json!({ "error": self.code() }),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.body())).into_response()
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
