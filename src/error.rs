//! Error types for the intake engine.

use crate::wizard::Step;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors talking to the inference backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Request to {endpoint} failed: {reason}")]
    Request { endpoint: String, reason: String },

    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A blocked step transition. Carries the single message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    pub step: Step,
    pub message: String,
}

impl ValidationError {
    pub fn new(step: Step, message: impl Into<String>) -> Self {
        Self {
            step,
            message: message.into(),
        }
    }
}

/// Result type alias for the intake engine.
pub type Result<T> = std::result::Result<T, Error>;
