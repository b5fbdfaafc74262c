//! Collaborator error taxonomy
//!
//! Every call to the inference service ends in either a usable JSON value or one of
//! these errors. None of them is fatal to a batch run: the pipeline maps each one to
//! "stage skipped for this file" and moves on.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Errors that can occur while talking to the inference service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendError {
    /// The service answered with a non-success status
    ApiError {
        message: String,
        status_code: Option<u16>,
    },

    /// The call did not finish within the stage timeout (in seconds)
    TimeoutError { seconds: u64 },

    /// The service could not be reached
    NetworkError { message: String },

    /// The service answered, but not with the shape the stage expects
    InvalidResponse {
        message: String,
        raw_response: Option<String>,
    },

    /// The client itself is misconfigured (bad base URL, TLS setup, ...)
    ConfigurationError { message: String },

    /// Generic error for other cases
    Other { message: String },
}

impl BackendError {
    pub fn timeout(duration: Duration) -> Self {
        BackendError::TimeoutError {
            seconds: duration.as_secs(),
        }
    }

    pub fn invalid_response(message: impl Into<String>, raw: Option<String>) -> Self {
        BackendError::InvalidResponse {
            message: message.into(),
            raw_response: raw,
        }
    }

    /// Short machine-friendly label, used in progress events and run statistics
    pub fn kind(&self) -> &'static str {
        match self {
            BackendError::ApiError { .. } => "api",
            BackendError::TimeoutError { .. } => "timeout",
            BackendError::NetworkError { .. } => "network",
            BackendError::InvalidResponse { .. } => "invalid_response",
            BackendError::ConfigurationError { .. } => "configuration",
            BackendError::Other { .. } => "other",
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::ApiError {
                message,
                status_code,
            } => {
                if let Some(code) = status_code {
                    write!(f, "API error ({}): {}", code, message)
                } else {
                    write!(f, "API error: {}", message)
                }
            }
            BackendError::TimeoutError { seconds } => {
                write!(f, "Request timed out after {} seconds", seconds)
            }
            BackendError::NetworkError { message } => {
                write!(f, "Network error: {}", message)
            }
            BackendError::InvalidResponse { message, .. } => {
                write!(f, "Invalid response from inference service: {}", message)
            }
            BackendError::ConfigurationError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            BackendError::Other { message } => {
                write!(f, "Error: {}", message)
            }
        }
    }
}

impl std::error::Error for BackendError {}
