//! Boardy Core Library
//!
//! This crate provides the domain models, error types, configuration and
//! validation shared by every Boardy component.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{BatchTagReport, MediaKind, MediaLayout, MediaRecord, Pagination, Tag};
pub use validation::{normalize_tag_name, parse_tag_lines, parse_tag_list};

pub type AppResult<T> = Result<T, AppError>;
