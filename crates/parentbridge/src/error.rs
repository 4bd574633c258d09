//! Error types for parentbridge.
//!
//! This module defines all error types used throughout the parentbridge crate.
//! The policy evaluator never swallows errors; every failure surfaces to the
//! calling producer, which decides whether to proceed or abort.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for parentbridge operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Policy Errors ===
    /// A notification category outside the four defined values.
    #[error("invalid notification category '{value}' (expected attendance, grade, message or event)")]
    InvalidCategory {
        /// The rejected input.
        value: String,
    },

    /// A quiet-hours bound that does not parse as `HH:mm`.
    #[error("malformed time string '{value}' (expected HH:mm)")]
    MalformedTimeString {
        /// The rejected input.
        value: String,
    },

    /// A sound volume outside `[0, 1]`.
    #[error("invalid volume {value} (expected a value between 0 and 1)")]
    InvalidVolume {
        /// The rejected volume.
        value: f64,
    },

    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// No notification with the given id exists.
    #[error("notification {id} not found")]
    NotificationNotFound {
        /// The notification id.
        id: i64,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for parentbridge operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create an invalid category error.
    #[must_use]
    pub fn invalid_category(value: impl Into<String>) -> Self {
        Self::InvalidCategory {
            value: value.into(),
        }
    }

    /// Create a malformed time string error.
    #[must_use]
    pub fn malformed_time(value: impl Into<String>) -> Self {
        Self::MalformedTimeString {
            value: value.into(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error came from the storage layer.
    #[must_use]
    pub fn is_storage_error(&self) -> bool {
        matches!(
            self,
            Self::DatabaseOpen { .. }
                | Self::DatabaseQuery(_)
                | Self::DatabaseMigration { .. }
                | Self::DirectoryCreate { .. }
        )
    }
}
