//! Boardy Storage Library
//!
//! Content-addressed blob storage for the catalog. It includes the `Storage`
//! trait and its local filesystem implementation.
//!
//! # Storage layout
//!
//! Every blob is named after the SHA-256 of its bytes plus the original
//! extension and sharded by the first four hex characters:
//!
//! - **Blobs**: `{media_root}/{hash[0:2]}/{hash[2:4]}/{hash}{ext}`
//! - **Thumbnails**: `{thumbnail_root}/{hash[0:2]}/{hash[2:4]}/sample_{hash}.jpg`
//!
//! Filename derivation and validation live in the `keys` module so the layout
//! stays identical to stores written by other tools.

pub mod keys;
pub mod local;
pub mod traits;

// Re-export commonly used types
pub use keys::{content_hash, hash_file, shard_dir, storage_filename, thumbnail_filename};
pub use local::LocalStorage;
pub use traits::{Storage, StorageError, StorageResult, StoredBlob};
