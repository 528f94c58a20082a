// src/error.rs

//! Unified error handling for the collector.

use std::fmt;

use thiserror::Error;

/// Result type alias for collector operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Transport failure or timeout of an HTTP request
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Resource API answered with a non-2xx status
    #[error("API returned status {status} for {url}")]
    Status { url: String, status: u16 },

    /// Response body could not be decoded
    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    /// Bearer token could not be obtained
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Bulk write to the document store failed
    #[error("Store error on {collection}: {message}")]
    Store { collection: String, message: String },

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Cron expression could not be parsed
    #[error("Invalid schedule '{expression}': {message}")]
    Schedule { expression: String, message: String },

    /// Configuration validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// A spawned task panicked or was cancelled
    #[error("Task error: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl AppError {
    /// Create a decode error for a response body.
    pub fn decode(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Decode {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a store error for a collection.
    pub fn store(collection: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Store {
            collection: collection.into(),
            message: message.to_string(),
        }
    }

    /// Create a schedule parsing error.
    pub fn schedule(expression: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Schedule {
            expression: expression.into(),
            message: message.to_string(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether this error came from a single resource API call.
    pub fn is_fetch(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Status { .. } | Self::Decode { .. } | Self::Auth(_)
        )
    }
}
