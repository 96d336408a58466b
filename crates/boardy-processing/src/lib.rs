//! Boardy Processing Library
//!
//! Media inspection for the catalog:
//! - Content-signature classification (classify)
//! - ffprobe metadata and pixel dimensions (probe)
//! - Video thumbnail extraction through ffmpeg (thumbnail)

pub mod classify;
pub mod error;
pub mod probe;
pub mod thumbnail;

pub use classify::{classify_bytes, classify_path, MediaClass};
pub use error::{ProbeError, ThumbnailError};
pub use probe::{MediaProber, VideoProbe};
pub use thumbnail::{FFmpegThumbnailer, ThumbnailDeriver};
