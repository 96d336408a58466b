//! Processing error types

use std::time::Duration;
use thiserror::Error;

/// Failures while inspecting a media file
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("ffprobe failed: {0}")]
    Failed(String),

    #[error("Failed to parse ffprobe output: {0}")]
    Parse(String),

    #[error("No video stream found")]
    NoVideoStream,

    #[error("Probe timed out after {0:?}")]
    Timeout(Duration),

    #[error("Failed to read image: {0}")]
    Image(#[from] image::ImageError),

    #[error("Probe task failed: {0}")]
    Join(String),
}

/// Failures while deriving a video thumbnail
#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error("Video has no measurable duration")]
    ZeroDuration,

    #[error("FFmpeg thumbnail extraction failed: {0}")]
    Ffmpeg(String),

    #[error("FFmpeg produced no frame at {0:.3}s")]
    EmptyOutput(f64),

    #[error("Thumbnail extraction timed out after {0:?}")]
    Timeout(Duration),
}
