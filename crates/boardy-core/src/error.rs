//! Error types module
//!
//! This module provides the core error type used throughout the Boardy catalog.
//! Every failure surfaced by the catalog is an `AppError`; the first five variants
//! are the domain error kinds callers are expected to match on, the rest are
//! infrastructure failures.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.

use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected outcomes like duplicate imports
    Debug,
    /// Warning level - for caller mistakes like unknown ids
    Warn,
    /// Error level - for unexpected failures and store corruption
    Error,
}

/// Metadata describing how an error should be handled by callers.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "ALREADY_EXISTS")
    fn error_code(&self) -> &'static str;

    /// Whether a batch operation may skip this item and continue
    fn is_recoverable(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid file: {0}")]
    InvalidFile(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Thumbnail creation failed: {0}")]
    ThumbnailCreation(String),

    /// The index and the filesystem disagree. Never swallow this one.
    #[error("Integrity violation: {0}")]
    IntegrityViolation(String),

    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

/// Static metadata for each variant: (error_code, recoverable, log_level).
fn app_error_static_metadata(err: &AppError) -> (&'static str, bool, LogLevel) {
    match err {
        AppError::InvalidFile(_) => ("INVALID_FILE", false, LogLevel::Warn),
        AppError::AlreadyExists(_) => ("ALREADY_EXISTS", true, LogLevel::Debug),
        AppError::NotFound(_) => ("NOT_FOUND", false, LogLevel::Warn),
        AppError::ThumbnailCreation(_) => ("THUMBNAIL_CREATION_ERROR", false, LogLevel::Error),
        AppError::IntegrityViolation(_) => ("INTEGRITY_VIOLATION", false, LogLevel::Error),
        AppError::Database(_) => ("DATABASE_ERROR", false, LogLevel::Error),
        AppError::Storage(_) => ("STORAGE_ERROR", false, LogLevel::Error),
        AppError::InvalidInput(_) => ("INVALID_INPUT", false, LogLevel::Warn),
        AppError::Internal(_) => ("INTERNAL_ERROR", false, LogLevel::Error),
        AppError::InternalWithSource { .. } => ("INTERNAL_ERROR", false, LogLevel::Error),
    }
}

impl AppError {
    /// Get the error type name for logging
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::InvalidFile(_) => "InvalidFile",
            AppError::AlreadyExists(_) => "AlreadyExists",
            AppError::NotFound(_) => "NotFound",
            AppError::ThumbnailCreation(_) => "ThumbnailCreation",
            AppError::IntegrityViolation(_) => "IntegrityViolation",
            AppError::Database(_) => "Database",
            AppError::Storage(_) => "Storage",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// True for the dedup outcome batch importers count as a skip.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, AppError::AlreadyExists(_))
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).1
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).2
    }
}
