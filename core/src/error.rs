//! Error types and HTTP status mapping

use serde::Serialize;
use thiserror::Error;

/// Result type alias for API operations
pub type Result<T> = std::result::Result<T, ApiError>;

/// API error with HTTP status code mapping
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("payload too large: {message}")]
    PayloadTooLarge { message: String },

    #[error("invalid token: {message}")]
    InvalidToken { message: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("token verification failed: {message}")]
    TokenVerificationFailed { message: String },

    #[error("service unavailable: {message}")]
    Misconfigured { message: String },

    #[error("signing failed: {message}")]
    SigningFailed { message: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl ApiError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::PayloadTooLarge {
            message: message.into(),
        }
    }

    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn token_verification_failed(message: impl Into<String>) -> Self {
        Self::TokenVerificationFailed {
            message: message.into(),
        }
    }

    pub fn misconfigured(message: impl Into<String>) -> Self {
        Self::Misconfigured {
            message: message.into(),
        }
    }

    pub fn signing_failed(message: impl Into<String>) -> Self {
        Self::SigningFailed {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidRequest { .. } => 400,
            Self::PayloadTooLarge { .. } => 413,
            Self::InvalidToken { .. } => 400,
            Self::Unauthorized { .. } => 401,
            Self::TokenVerificationFailed { .. } => 401,
            Self::Misconfigured { .. } => 503,
            Self::SigningFailed { .. } => 500,
            Self::Internal { .. } => 500,
        }
    }

    /// Get the error key for this error
    pub fn error_key(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "invalid_request",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::InvalidToken { .. } => "invalid_token",
            Self::Unauthorized { .. } => "unauthorized",
            Self::TokenVerificationFailed { .. } => "token_verification_failed",
            Self::Misconfigured { .. } => "service_unavailable",
            Self::SigningFailed { .. } => "minting_failed",
            Self::Internal { .. } => "internal_error",
        }
    }

    /// Message that is safe to return to the caller.
    ///
    /// Server-side failures carry diagnostic detail (key parse errors, library
    /// messages) that must stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::SigningFailed { .. } => "failed to mint token".to_string(),
            Self::Internal { .. } => "internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Whether this is a server-side failure rather than a caller error
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl From<&ApiError> for ErrorResponse {
    fn from(err: &ApiError) -> Self {
        Self {
            error: err.public_message(),
            code: err.error_key(),
        }
    }
}
