//! Error types for ExamVault
//!
//! Provides a single error enum with:
//! - Distinct variants for transport failures vs store rejections
//! - Client-local validation and conflict states
//! - Machine-readable error codes for presentation layers

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    InvalidPaperCode,
    InvalidUpload,

    // Authorization errors (3xxx)
    Forbidden,

    // Conflict errors (5xxx)
    Conflict,
    InFlight,
    InvalidState,

    // Remote store errors (8xxx)
    NetworkError,
    ApplicationError,
    MalformedResponse,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,
            ErrorCode::InvalidPaperCode => 1002,
            ErrorCode::InvalidUpload => 1003,

            ErrorCode::Forbidden => 3001,

            ErrorCode::Conflict => 5001,
            ErrorCode::InFlight => 5002,
            ErrorCode::InvalidState => 5003,

            ErrorCode::NetworkError => 8001,
            ErrorCode::ApplicationError => 8002,
            ErrorCode::MalformedResponse => 8003,

            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Client-local validation, never reaches the gateway
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Invalid paper code '{code}': expected PREFIX-NNNN with a known prefix")]
    InvalidPaperCode { code: String },

    #[error("Invalid upload: {message}")]
    InvalidUpload { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    // Duplicate found by the existence check
    #[error("Paper already exists for branches: {}", .branches.join(", "))]
    Conflict { branches: Vec<String> },

    #[error("Record {id} already has an operation in flight")]
    InFlight { id: String },

    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    // Transport failure, no response from the store
    #[error("Network error: {message}")]
    Network { message: String },

    // The store answered and rejected the request
    #[error("Remote store rejected the request: {}", .message.as_deref().unwrap_or("request failed"))]
    Application { message: Option<String> },

    #[error("Malformed response from remote store: {message}")]
    MalformedResponse { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Store rejection with the store's own message
    pub fn application(message: impl Into<String>) -> Self {
        AppError::Application {
            message: Some(message.into()),
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::InvalidPaperCode { .. } => ErrorCode::InvalidPaperCode,
            AppError::InvalidUpload { .. } => ErrorCode::InvalidUpload,
            AppError::Forbidden { .. } => ErrorCode::Forbidden,
            AppError::Conflict { .. } => ErrorCode::Conflict,
            AppError::InFlight { .. } => ErrorCode::InFlight,
            AppError::InvalidState { .. } => ErrorCode::InvalidState,
            AppError::Network { .. } => ErrorCode::NetworkError,
            AppError::Application { .. } => ErrorCode::ApplicationError,
            AppError::MalformedResponse { .. } => ErrorCode::MalformedResponse,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Transport failure (no response from the store)
    pub fn is_network(&self) -> bool {
        matches!(self, AppError::Network { .. })
    }

    /// Caught before any network call
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::Validation { .. }
                | AppError::InvalidPaperCode { .. }
                | AppError::InvalidUpload { .. }
        )
    }

    /// Whether presenting a retry affordance makes sense. Nothing is retried automatically.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Network { .. } | AppError::InFlight { .. } | AppError::MalformedResponse { .. }
        )
    }

    /// Message suitable for a notification, falling back to a generic notice
    pub fn user_message(&self) -> String {
        match self {
            AppError::Network { .. } => "Could not reach the paper store. Check your connection and retry.".to_string(),
            AppError::Application { message: None } => "The request failed. Please try again later.".to_string(),
            AppError::Application { message: Some(m) } => m.clone(),
            AppError::Internal { .. } | AppError::Other(_) | AppError::Serialization(_) => {
                "Something went wrong.".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::MalformedResponse {
                message: err.to_string(),
            }
        } else {
            AppError::Network {
                message: err.to_string(),
            }
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        let field = err.field_errors().keys().next().map(|f| f.to_string());
        AppError::Validation {
            message: err.to_string(),
            field,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::Network { message: "connection refused".into() };
        assert_eq!(err.code(), ErrorCode::NetworkError);
        assert_eq!(err.code().as_code(), 8001);
        assert!(err.is_network());
        assert!(err.is_retryable());
    }

    #[test]
    fn test_application_error_message() {
        let err = AppError::application("Row not found");
        assert_eq!(err.user_message(), "Row not found");
        assert!(!err.is_network());
        assert!(!err.is_retryable());

        let generic = AppError::Application { message: None };
        assert_eq!(generic.user_message(), "The request failed. Please try again later.");
    }

    #[test]
    fn test_validation_errors_block() {
        let err = AppError::InvalidPaperCode { code: "XYZ".into() };
        assert!(err.is_validation());
        assert_eq!(err.code(), ErrorCode::InvalidPaperCode);
    }

    #[test]
    fn test_conflict_lists_branches() {
        let err = AppError::Conflict {
            branches: vec!["CSE".into(), "IT".into()],
        };
        assert_eq!(err.to_string(), "Paper already exists for branches: CSE, IT");
    }
}
