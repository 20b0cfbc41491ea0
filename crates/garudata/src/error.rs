//! Error types for conversion, storage and search

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for Garudata operations
pub type Result<T> = std::result::Result<T, Error>;

/// Garudata errors
#[derive(Debug, Error)]
pub enum Error {
    /// Source artifact is missing, unreadable, corrupt, or timed out
    #[error("Source '{source_name}' is unavailable: {message}")]
    SourceUnavailable { source_name: String, message: String },

    /// Source is readable but structurally invalid (no header, no rows)
    #[error("Malformed input in '{source_name}': {message}")]
    MalformedInput { source_name: String, message: String },

    /// Source is valid but the query against it failed (e.g. missing table)
    #[error("Query on table '{table}' in '{source_name}' failed: {message}")]
    QueryFailed {
        source_name: String,
        table: String,
        message: String,
    },

    /// Collection not known to the store
    #[error("Collection not found: {0}")]
    NotFound(String),

    /// Collection name cannot be used as a store key
    #[error("Invalid collection name: {0}")]
    InvalidCollectionName(String),

    /// No converter handles this kind of source
    #[error("Unsupported source: {0}")]
    UnsupportedSource(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Conversion catalog error
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a source unavailable error
    pub fn source_unavailable(source: impl Into<String>, message: impl ToString) -> Self {
        Self::SourceUnavailable {
            source_name: source.into(),
            message: message.to_string(),
        }
    }

    /// Create a malformed input error
    pub fn malformed(source: impl Into<String>, message: impl ToString) -> Self {
        Self::MalformedInput {
            source_name: source.into(),
            message: message.to_string(),
        }
    }

    /// Create a query failed error
    pub fn query_failed(
        source: impl Into<String>,
        table: impl Into<String>,
        message: impl ToString,
    ) -> Self {
        Self::QueryFailed {
            source_name: source.into(),
            table: table.into(),
            message: message.to_string(),
        }
    }

    /// Create a catalog error
    pub fn catalog(message: impl ToString) -> Self {
        Self::Catalog(message.to_string())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Stable machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Error::SourceUnavailable { .. } => "source_unavailable",
            Error::MalformedInput { .. } => "malformed_input",
            Error::QueryFailed { .. } => "query_failed",
            Error::NotFound(_) => "not_found",
            Error::InvalidCollectionName(_) => "invalid_collection_name",
            Error::UnsupportedSource(_) => "unsupported_source",
            Error::Config(_) => "config_error",
            Error::Catalog(_) => "catalog_error",
            Error::Io(_) => "io_error",
            Error::Json(_) => "json_error",
            Error::Internal(_) => "internal_error",
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Catalog(err.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::MalformedInput { .. }
            | Error::QueryFailed { .. }
            | Error::InvalidCollectionName(_)
            | Error::UnsupportedSource(_)
            | Error::Json(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::SourceUnavailable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Config(_)
            | Error::Catalog(_)
            | Error::Io(_)
            | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": {
                "type": self.kind(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = Error::query_failed("shop.db", "orders", "no such table");
        let msg = err.to_string();
        assert!(msg.contains("shop.db"));
        assert!(msg.contains("orders"));
        assert_eq!(err.kind(), "query_failed");
    }

    #[test]
    fn test_status_codes() {
        let resp = Error::NotFound("people".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = Error::malformed("empty.csv", "no header row").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = Error::source_unavailable("gone.xlsx", "missing").into_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
