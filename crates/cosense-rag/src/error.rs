//! Error types for the sync pipeline and the HTTP surface

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for cosense-rag operations
pub type Result<T> = std::result::Result<T, Error>;

/// cosense-rag errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The page listing API answered with a non-success status
    #[error("List API Error: {status}")]
    Listing { status: String },

    /// Page detail could not be fetched or decoded
    #[error("Failed to fetch page '{title}': {message}")]
    PageFetch { title: String, message: String },

    /// Object store error
    #[error("Object store error: {0}")]
    Storage(String),

    /// Invalid object key
    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    /// AI search service error
    #[error("Search error: {0}")]
    Search(String),

    /// Asset backend error
    #[error("Asset backend error: {0}")]
    Asset(String),

    /// Sync run not found
    #[error("Sync run not found: {0}")]
    RunNotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a page fetch error
    pub fn page_fetch(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PageFetch {
            title: title.into(),
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Create a search error
    pub fn search(message: impl Into<String>) -> Self {
        Self::Search(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            Error::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error", msg.clone()),
            Error::Listing { .. } => (StatusCode::BAD_GATEWAY, "listing_error", self.to_string()),
            Error::PageFetch { .. } => (StatusCode::BAD_GATEWAY, "page_error", self.to_string()),
            Error::Storage(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error", msg.clone()),
            Error::InvalidKey(key) => (
                StatusCode::BAD_REQUEST,
                "invalid_key",
                format!("Invalid object key: {}", key),
            ),
            Error::Search(msg) => (StatusCode::BAD_GATEWAY, "search_error", msg.clone()),
            Error::Asset(msg) => (StatusCode::BAD_GATEWAY, "asset_error", msg.clone()),
            Error::RunNotFound(id) => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("Sync run not found: {}", id),
            ),
            Error::Io(err) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error", err.to_string()),
            Error::Json(err) => (StatusCode::BAD_GATEWAY, "json_error", err.to_string()),
            Error::Http(err) => (StatusCode::BAD_GATEWAY, "http_error", err.to_string()),
            Error::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg.clone())
            }
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}
