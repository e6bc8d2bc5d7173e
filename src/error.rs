//! Error types for skillroute
//!
//! Every pipeline stage returns its own typed error; [`AppError`] wraps them so
//! the top-level handler can map each kind to a gateway status code. Detailed
//! causes are for logs only. Callers see the generic [`AppError::public_message`].

use crate::classifier::ClassificationError;
use crate::dispatch::DispatchError;
use crate::ingress::NormalizationError;
use crate::invoker::InvocationError;
use crate::response::{GatewayResponse, ResponseBody};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Public body for 400 responses
pub const BAD_REQUEST_MESSAGE: &str = "bad request";
/// Public body for 401 responses
pub const UNAUTHORIZED_MESSAGE: &str = "unauthorized";
/// Public body for 403 responses
pub const FORBIDDEN_MESSAGE: &str = "forbidden";
/// Public body for 500 responses
pub const INTERNAL_ERROR_MESSAGE: &str = "internal server error";

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file {path}: {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration in {path}: {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    #[error("Credential environment variable {env_var} is not set or blank")]
    MissingCredential { env_var: String },

    #[error("Bad request: {0}")]
    BadRequest(#[from] NormalizationError),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Classification failed: {0}")]
    Classification(#[from] ClassificationError),

    #[error("Dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Invocation failed: {0}")]
    Invocation(#[from] InvocationError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status the gateway answers with for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Config(_)
            | Self::ConfigFileRead { .. }
            | Self::ConfigParseFailed { .. }
            | Self::ConfigValidationFailed { .. }
            | Self::MissingCredential { .. }
            | Self::Classification(_)
            | Self::Dispatch(_)
            | Self::Invocation(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message placed in the `{"error": ...}` body
    ///
    /// Never includes upstream details (endpoints, model output, function names).
    pub fn public_message(&self) -> &'static str {
        match self.status_code() {
            StatusCode::BAD_REQUEST => BAD_REQUEST_MESSAGE,
            StatusCode::UNAUTHORIZED => UNAUTHORIZED_MESSAGE,
            StatusCode::FORBIDDEN => FORBIDDEN_MESSAGE,
            _ => INTERNAL_ERROR_MESSAGE,
        }
    }

    /// Shape this error as a gateway response
    pub fn to_gateway_response(&self) -> GatewayResponse {
        crate::response::build(
            self.status_code(),
            ResponseBody::Error(self.public_message().to_string()),
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_gateway_response().into_response()
    }
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;
