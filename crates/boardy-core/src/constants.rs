//! Application constants

/// Page size used when a caller passes a non-positive one.
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Maximum number of tags returned by prefix search.
pub const TAG_SEARCH_LIMIT: i64 = 10;

/// Tag attached to media brought in by directory and URL imports.
pub const DEFAULT_IMPORT_TAG: &str = "general";

/// Prefix of every thumbnail filename (`sample_<hash>.jpg`).
pub const THUMBNAIL_PREFIX: &str = "sample_";

/// Thumbnails are always JPEG regardless of the source container.
pub const THUMBNAIL_EXTENSION: &str = ".jpg";

/// Length of a lowercase hex SHA-256 digest.
pub const CONTENT_HASH_LEN: usize = 64;
