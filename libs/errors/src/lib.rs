//! Unified error handling for the sensor monitoring services
//!
//! Every service maps its failures onto [`MonitorError`] so that the request
//! boundary can turn any of them into a structured JSON response with a
//! stable error code and HTTP status.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

// ============================================================================
// ErrorInfo - API error response type
// ============================================================================

/// Standard error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// HTTP status code
    pub code: u16,
    /// Error message
    pub message: String,
    /// Detailed error description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Field-specific errors for validation
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub field_errors: HashMap<String, Vec<String>>,
}

impl ErrorInfo {
    /// Create a new ErrorInfo with just a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: 500,
            message: message.into(),
            details: None,
            field_errors: HashMap::new(),
        }
    }

    /// Set the error code
    pub fn with_code(mut self, code: u16) -> Self {
        self.code = code;
        self
    }

    /// Add details
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Add a field error
    pub fn add_field_error(mut self, field: impl Into<String>, error: impl Into<String>) -> Self {
        self.field_errors
            .entry(field.into())
            .or_default()
            .push(error.into());
        self
    }
}

// ============================================================================
// AuthFailure - why a credential was rejected
// ============================================================================

/// Reason a credential check failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthFailure {
    /// No bearer token was presented
    Missing,
    /// Token structure or signature is invalid
    Malformed,
    /// Token is past its embedded expiry instant
    Expired,
    /// Username/password pair did not match
    InvalidCredentials,
}

impl AuthFailure {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Missing => "AUTH_MISSING",
            Self::Malformed => "AUTH_MALFORMED",
            Self::Expired => "AUTH_EXPIRED",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
        }
    }
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Missing => "missing bearer token",
            Self::Malformed => "malformed or tampered token",
            Self::Expired => "token expired",
            Self::InvalidCredentials => "invalid credentials",
        };
        f.write_str(text)
    }
}

// ============================================================================
// MonitorError - Main error type
// ============================================================================

/// Main error type for all monitoring services
#[derive(Debug, Error)]
pub enum MonitorError {
    // ======================================
    // Validation Errors
    // ======================================
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid parameter: {param}: {reason}")]
    InvalidParameter { param: String, reason: String },

    // ======================================
    // Auth Errors
    // ======================================
    #[error("Unauthorized: {0}")]
    Auth(AuthFailure),

    // ======================================
    // Storage Errors
    // ======================================
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] sqlx::Error),

    // ======================================
    // Configuration Errors
    // ======================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ======================================
    // File & I/O Errors
    // ======================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // ======================================
    // Service & Runtime Errors
    // ======================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using MonitorError
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Error category enum - used for classification and log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Permission,
    Database,
    Configuration,
    Internal,
}

impl MonitorError {
    /// Get the appropriate HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self.category() {
            ErrorCategory::Validation => 400,
            ErrorCategory::Permission => 401,
            ErrorCategory::Database | ErrorCategory::Configuration | ErrorCategory::Internal => {
                500
            },
        }
    }

    /// Get error code (for API, logs, monitoring)
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidParameter { .. } => "INVALID_PARAMETER",
            Self::Auth(failure) => failure.error_code(),
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Sqlite(_) => "SQLITE_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Other(_) => "OTHER_ERROR",
        }
    }

    /// Get error category (for classification)
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) | Self::InvalidParameter { .. } => ErrorCategory::Validation,
            Self::Auth(_) => ErrorCategory::Permission,
            Self::Storage(_) | Self::Sqlite(_) => ErrorCategory::Database,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Io(_) | Self::Serialization(_) | Self::Internal(_) | Self::Other(_) => {
                ErrorCategory::Internal
            },
        }
    }

    /// Auth failure reason, if this is an auth error
    pub fn auth_failure(&self) -> Option<AuthFailure> {
        match self {
            Self::Auth(failure) => Some(*failure),
            _ => None,
        }
    }

    /// Log level used when this error crosses the request boundary
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;
        match self.category() {
            ErrorCategory::Database | ErrorCategory::Internal | ErrorCategory::Configuration => {
                Level::ERROR
            },
            ErrorCategory::Permission => Level::INFO,
            ErrorCategory::Validation => Level::DEBUG,
        }
    }

    /// Convert to API ErrorInfo
    pub fn to_error_info(&self) -> ErrorInfo {
        let mut error_info = ErrorInfo::new(self.to_string()).with_code(self.status_code());

        match self {
            Self::InvalidParameter { param, reason } => {
                error_info = error_info.add_field_error(param, reason);
            },
            Self::Validation(msg) => {
                error_info = error_info.with_details(msg.clone());
            },
            _ => {},
        }

        error_info
    }

    /// Shorthand for a missing/invalid field
    pub fn invalid_field(param: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            param: param.into(),
            reason: reason.into(),
        }
    }

    /// Message exposed to API clients. Storage and internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self.category() {
            ErrorCategory::Database => "Storage unavailable".to_string(),
            ErrorCategory::Internal | ErrorCategory::Configuration => {
                "Internal server error".to_string()
            },
            ErrorCategory::Validation | ErrorCategory::Permission => self.to_string(),
        }
    }
}

impl From<AuthFailure> for MonitorError {
    fn from(failure: AuthFailure) -> Self {
        Self::Auth(failure)
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

// Helper macros for creating errors
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::MonitorError::Configuration($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::MonitorError::Configuration(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! validation_error {
    ($msg:expr) => {
        $crate::MonitorError::Validation($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::MonitorError::Validation(format!($fmt, $($arg)*))
    };
}

// ============================================================================
// HTTP response conversion for Axum
// ============================================================================

#[cfg(feature = "axum-support")]
impl axum::response::IntoResponse for MonitorError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;
        use axum::Json;

        match self.log_level() {
            tracing::Level::ERROR => tracing::error!(code = self.error_code(), "{}", self),
            tracing::Level::INFO => tracing::info!(code = self.error_code(), "{}", self),
            _ => tracing::debug!(code = self.error_code(), "{}", self),
        }

        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = Json(serde_json::json!({
            "error": self.public_message(),
            "code": self.error_code(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
