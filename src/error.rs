//! Error types for the PostgreSQL plugin
//!
//! This module defines the error types used throughout the service and
//! how each one is rendered back to an HTTP caller.

use crate::config::AVAILABLE_ENDPOINTS;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Result type alias for the plugin
pub type Result<T> = std::result::Result<T, PluginError>;

/// Main error type for the plugin
#[derive(Error, Debug)]
pub enum PluginError {
    /// Connection string missing or not a `postgresql://` URI
    #[error("Invalid database URL. Must be a PostgreSQL connection string.")]
    InvalidDatabaseUrl,

    /// Query text empty after trimming
    #[error("Query cannot be empty.")]
    EmptyQuery,

    /// Missing or wrong bearer token
    #[error("Unauthorized")]
    Unauthorized,

    /// Request body was not valid JSON for the endpoint
    #[error("Invalid request body")]
    InvalidRequestBody,

    /// A parameter could not be converted to the type PostgreSQL inferred
    #[error("Invalid value for parameter ${position}: {message}")]
    InvalidParameter { position: usize, message: String },

    /// Parameter array length differs from the statement's placeholders
    #[error("bind message supplies {given} parameters, but prepared statement requires {expected}")]
    ParameterCount { expected: usize, given: usize },

    /// Database-related errors, message passed through verbatim
    #[error("{0}")]
    Database(#[from] sqlx::Error),

    /// Unknown route
    #[error("Not found")]
    NotFound,

    /// Known route, unsupported method
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// IO-related errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The registration endpoint rejected the manifest
    #[error("Registration failed with status {status} (code {code}): {message}")]
    Registration {
        status: u16,
        code: i64,
        message: String,
    },
}

impl PluginError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        PluginError::Config(message.into())
    }

    /// HTTP status code used when this error reaches the façade
    pub fn status_code(&self) -> StatusCode {
        match self {
            PluginError::Unauthorized => StatusCode::UNAUTHORIZED,
            PluginError::NotFound => StatusCode::NOT_FOUND,
            PluginError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            PluginError::InvalidDatabaseUrl
            | PluginError::EmptyQuery
            | PluginError::InvalidRequestBody
            | PluginError::InvalidParameter { .. }
            | PluginError::ParameterCount { .. }
            | PluginError::Database(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// `{success: false, error}` envelope
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// Body of the 404 response
#[derive(Debug, Clone, Serialize)]
pub struct NotFoundResponse {
    pub error: String,
    pub available_endpoints: Vec<String>,
}

impl IntoResponse for PluginError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            PluginError::NotFound => {
                let body = NotFoundResponse {
                    error: self.to_string(),
                    available_endpoints: AVAILABLE_ENDPOINTS.iter().map(|e| e.to_string()).collect(),
                };
                (status, Json(body)).into_response()
            }
            PluginError::MethodNotAllowed => (status, "Method not allowed").into_response(),
            other => (status, Json(ErrorResponse::new(other.to_string()))).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages() {
        assert!(PluginError::InvalidDatabaseUrl
            .to_string()
            .contains("Invalid database URL"));
        assert!(PluginError::EmptyQuery
            .to_string()
            .contains("Query cannot be empty"));
        assert_eq!(
            PluginError::InvalidParameter {
                position: 2,
                message: "expected an integer, got \"x\"".to_string(),
            }
            .to_string(),
            "Invalid value for parameter $2: expected an integer, got \"x\""
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(PluginError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(PluginError::InvalidRequestBody.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(PluginError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            PluginError::MethodNotAllowed.status_code(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            PluginError::Database(sqlx::Error::PoolTimedOut).status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
