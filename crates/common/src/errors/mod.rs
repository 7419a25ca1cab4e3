//! Error types for Siga o Dinheiro services
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for different failure modes
//! - HTTP status code mapping
//! - Structured error responses with field-level validation details
//! - Error codes for client handling

use crate::articles::Violation;
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::DbErr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationFailed,
    InvalidFormat,

    // Authentication errors (2xxx)
    Unauthenticated,

    // Authorization errors (3xxx)
    Unauthorized,

    // Resource errors (4xxx)
    NotFound,

    // Conflict errors (5xxx)
    DuplicateId,
    Conflict,

    // Rate limiting (6xxx)
    RateLimited,

    // Store errors (7xxx)
    DatabaseError,
    StoreUnavailable,

    // Internal errors (9xxx)
    IdGenerationFailed,
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationFailed => 1001,
            ErrorCode::InvalidFormat => 1002,

            ErrorCode::Unauthenticated => 2001,

            ErrorCode::Unauthorized => 3001,

            ErrorCode::NotFound => 4001,

            ErrorCode::DuplicateId => 5001,
            ErrorCode::Conflict => 5002,

            ErrorCode::RateLimited => 6001,

            ErrorCode::DatabaseError => 7001,
            ErrorCode::StoreUnavailable => 7002,

            ErrorCode::IdGenerationFailed => 9001,
            ErrorCode::InternalError => 9002,
            ErrorCode::ConfigurationError => 9003,
            ErrorCode::SerializationError => 9004,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {}", summarize(.violations))]
    ValidationFailed { violations: Vec<Violation> },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    // Authentication errors
    #[error("Unauthenticated: {message}")]
    Unauthenticated { message: String },

    // Authorization errors
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    // Resource errors
    #[error("Article not found: {id}")]
    ArticleNotFound { id: String },

    // Conflict errors
    #[error("Duplicate article id: {id}")]
    DuplicateId { id: String },

    #[error("Version conflict on article {id}: expected {expected}, found {actual}")]
    Conflict { id: String, expected: i32, actual: i32 },

    // Rate limiting
    #[error("Rate limit exceeded, retry later")]
    RateLimited,

    // Store errors
    #[error("Database error: {0}")]
    Database(DbErr),

    #[error("Article store unavailable: {message}")]
    StoreUnavailable { message: String },

    // Internal errors
    #[error("Could not generate a unique article id after {attempts} attempts")]
    IdGenerationFailed { attempts: u32 },

    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn summarize(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl AppError {
    /// Shorthand for a single-violation validation failure
    pub fn invalid(violation: Violation) -> Self {
        AppError::ValidationFailed {
            violations: vec![violation],
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            AppError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            AppError::Unauthenticated { .. } => ErrorCode::Unauthenticated,
            AppError::Unauthorized { .. } => ErrorCode::Unauthorized,
            AppError::ArticleNotFound { .. } => ErrorCode::NotFound,
            AppError::DuplicateId { .. } => ErrorCode::DuplicateId,
            AppError::Conflict { .. } => ErrorCode::Conflict,
            AppError::RateLimited => ErrorCode::RateLimited,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::StoreUnavailable { .. } => ErrorCode::StoreUnavailable,
            AppError::IdGenerationFailed { .. } => ErrorCode::IdGenerationFailed,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::ValidationFailed { .. } | AppError::InvalidFormat { .. } => {
                StatusCode::BAD_REQUEST
            }

            // 401 Unauthorized
            AppError::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,

            // 403 Forbidden
            AppError::Unauthorized { .. } => StatusCode::FORBIDDEN,

            // 404 Not Found
            AppError::ArticleNotFound { .. } => StatusCode::NOT_FOUND,

            // 409 Conflict
            AppError::DuplicateId { .. } | AppError::Conflict { .. } => StatusCode::CONFLICT,

            // 429 Too Many Requests
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,

            // 500 Internal Server Error
            AppError::Database(_)
            | AppError::IdGenerationFailed { .. }
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 503 Service Unavailable
            AppError::StoreUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Machine-readable details attached to the response body
    fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::ValidationFailed { violations } => serde_json::to_value(violations).ok(),
            AppError::Conflict { expected, actual, .. } => Some(serde_json::json!({
                "expectedVersion": expected,
                "currentVersion": actual,
            })),
            _ => None,
        }
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        match err {
            DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => AppError::StoreUnavailable {
                message: err.to_string(),
            },
            other => AppError::Database(other),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidFormat {
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidFormat {
            message: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::InvalidFormat {
            message: rejection.body_text(),
        }
    }
}
