// src/error.rs

//! Unified error handling for the watcher.
//!
//! `AppError` is what escapes a pass or the run loop. The collaborator
//! errors (`FetchError`, `AuthError`, `DeliveryError`) stay separate so the
//! fetch retry loop and the alert dispatcher can reason about them directly.

use std::fmt;

use thiserror::Error;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client could not be built
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Logging could not be set up
    #[error("Logging error: {0}")]
    Logging(String),

    /// List page could not be fetched
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Login failed
    #[error("Login failed: {0}")]
    Auth(#[from] AuthError),

    /// Alert delivery failed
    #[error("Notification failed: {0}")]
    Delivery(#[from] DeliveryError),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a logging setup error.
    pub fn logging(message: impl fmt::Display) -> Self {
        Self::Logging(message.to_string())
    }

    /// True for failures caused by the settings rather than the run.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Validation(_) | Self::Toml(_))
    }
}

/// A single list page could not be retrieved.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("timed out fetching {url}")]
    Timeout { url: String },

    #[error("connection error fetching {url}: {message}")]
    Connection { url: String, message: String },

    #[error("HTTP {status} fetching {url}")]
    Status { url: String, status: u16 },
}

impl FetchError {
    /// Build a fetch error from a transport-level reqwest failure.
    pub fn from_transport(url: &str, error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Connection {
                url: url.to_string(),
                message: error.to_string(),
            }
        }
    }

    /// HTTP status, when the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Login form discovery or submission failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("login page {url} unreachable: {message}")]
    Unreachable { url: String, message: String },

    #[error("login at {url} rejected with HTTP {status}")]
    Rejected { url: String, status: u16 },

    #[error("no login form with a password field at {url}")]
    FormNotFound { url: String },
}

/// An alert could not be delivered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("webhook answered HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}
