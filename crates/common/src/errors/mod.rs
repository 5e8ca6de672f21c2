//! Error types for PressForge services
//!
//! One enum shared by the gateway and the workers. Each variant maps to an
//! HTTP status and a client-facing code; responses are
//! `{"error": {"code", "message", "details?"}}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Machine-readable error code sent to clients
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    MissingField,
    InvalidFormat,
    Unauthorized,
    NotFound,
    ArticleNotFound,
    CategoryNotFound,
    Conflict,
    RateLimited,
    DatabaseError,
    ConnectionError,
    UpstreamError,
    UnparseableResponse,
    InvalidTopic,
    ImageUnavailable,
    InternalError,
    ConfigurationError,
    SerializationError,
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Required field missing: {field}")]
    MissingField { field: String },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    // Authentication errors
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    #[error("Article not found: {key}")]
    ArticleNotFound { key: String },

    #[error("Category not found: {slug}")]
    CategoryNotFound { slug: String },

    // Conflict errors
    #[error("Duplicate resource: {message}")]
    Duplicate { message: String },

    // Rate limiting
    #[error("Rate limit exceeded: {limit} requests per second")]
    RateLimited { limit: u32 },

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    // External service errors
    #[error("{service} call failed: {message}")]
    Upstream { service: String, message: String },

    #[error("Unparseable model response: {message}")]
    UnparseableResponse { message: String },

    #[error("The requested topic could not be generated: {topic}")]
    InvalidTopic { topic: String },

    #[error("No image available for prompt: {prompt}")]
    ImageUnavailable { prompt: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    /// Shorthand for an upstream provider failure
    pub fn upstream(service: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Upstream {
            service: service.into(),
            message: message.into(),
        }
    }

    fn classify(&self) -> (StatusCode, ErrorCode) {
        use AppError::*;

        match self {
            Validation { .. } => (StatusCode::BAD_REQUEST, ErrorCode::ValidationError),
            MissingField { .. } => (StatusCode::BAD_REQUEST, ErrorCode::MissingField),
            InvalidFormat { .. } => (StatusCode::BAD_REQUEST, ErrorCode::InvalidFormat),
            Unauthorized { .. } => (StatusCode::UNAUTHORIZED, ErrorCode::Unauthorized),
            NotFound { .. } => (StatusCode::NOT_FOUND, ErrorCode::NotFound),
            ArticleNotFound { .. } => (StatusCode::NOT_FOUND, ErrorCode::ArticleNotFound),
            CategoryNotFound { .. } => (StatusCode::NOT_FOUND, ErrorCode::CategoryNotFound),
            Duplicate { .. } => (StatusCode::CONFLICT, ErrorCode::Conflict),
            InvalidTopic { .. } => (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::InvalidTopic),
            RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, ErrorCode::RateLimited),
            Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::DatabaseError),
            DatabaseConnection { .. } => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::ConnectionError),
            UnparseableResponse { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::UnparseableResponse)
            }
            Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::InternalError),
            Configuration { .. } => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::ConfigurationError),
            Serialization(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::SerializationError),
            Upstream { .. } | HttpClient(_) => (StatusCode::BAD_GATEWAY, ErrorCode::UpstreamError),
            ImageUnavailable { .. } => (StatusCode::BAD_GATEWAY, ErrorCode::ImageUnavailable),
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.classify().1
    }

    pub fn status_code(&self) -> StatusCode {
        self.classify().0
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
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
        let (status, code) = self.classify();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(error = %message, code = ?code, status = status.as_u16(), "Server error");
        } else {
            tracing::warn!(error = %message, code = ?code, status = status.as_u16(), "Client error");
        }

        let details = match &self {
            AppError::Validation { field: Some(field), .. } => Some(serde_json::json!({ "field": field })),
            _ => None,
        };

        let body = ErrorResponse {
            error: ErrorDetails { code, message, details },
        };
        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::ArticleNotFound { key: "missing-slug".into() };
        assert_eq!(err.code(), ErrorCode::ArticleNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_invalid_topic_is_unprocessable() {
        let err = AppError::InvalidTopic { topic: "asdf".into() };
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(!err.is_server_error());
        assert_eq!(serde_json::to_value(err.code()).unwrap(), "INVALID_TOPIC");
    }

    #[test]
    fn test_missing_field_is_bad_request() {
        let err = AppError::MissingField { field: "query".into() };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_server_error());
    }

    #[test]
    fn test_upstream_error() {
        let err = AppError::upstream("groq", "connection reset");
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert!(err.is_server_error());
        assert_eq!(err.to_string(), "groq call failed: connection reset");
    }

    #[test]
    fn test_unparseable_response_is_server_error() {
        let err = AppError::UnparseableResponse { message: "no braces".into() };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
