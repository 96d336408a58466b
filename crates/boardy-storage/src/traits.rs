//! Storage abstraction trait
//!
//! This module defines the Storage trait for content-addressed blob storage.

use async_trait::async_trait;
use boardy_core::AppError;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// A blob with the same storage filename is already stored.
    #[error("Blob already exists: {0}")]
    AlreadyExists(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::AlreadyExists(name) => AppError::AlreadyExists(name),
            StorageError::NotFound(name) => AppError::NotFound(name),
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// A blob that has just been written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub filename: String,
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Storage abstraction trait
///
/// Blobs are addressed by storage filename (`{hash}{ext}`), never by the name
/// they arrived with. Writes never overwrite: a second write of the same
/// content is refused with [`StorageError::AlreadyExists`], which is how
/// duplicates are detected.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Hash `data`, derive the storage filename from it and `original_name`,
    /// and write it into its shard.
    async fn put(&self, data: Vec<u8>, original_name: &str) -> StorageResult<StoredBlob>;

    /// Copy `source` in under an already computed storage filename, keeping
    /// the source's access and modification times.
    async fn put_file(&self, source: &Path, filename: &str) -> StorageResult<StoredBlob>;

    /// Remove a blob. Absence is reported as `NotFound`, not ignored.
    async fn delete(&self, filename: &str) -> StorageResult<()>;

    async fn exists(&self, filename: &str) -> StorageResult<bool>;

    async fn read(&self, filename: &str) -> StorageResult<Vec<u8>>;

    /// Absolute path the blob lives (or would live) at. No I/O.
    fn path_for(&self, filename: &str) -> StorageResult<PathBuf>;

    /// Absolute path of the blob's thumbnail. No I/O.
    fn thumbnail_path_for(&self, filename: &str) -> StorageResult<PathBuf>;

    /// Write JPEG thumbnail bytes for a blob, replacing any previous one.
    async fn put_thumbnail(&self, filename: &str, jpeg: Vec<u8>) -> StorageResult<PathBuf>;

    async fn delete_thumbnail(&self, filename: &str) -> StorageResult<()>;

    async fn thumbnail_exists(&self, filename: &str) -> StorageResult<bool>;
}
