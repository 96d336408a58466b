//! Video thumbnail derivation
//!
//! A thumbnail is one JPEG frame taken a quarter of the way into the video.

use crate::error::ThumbnailError;
use crate::probe::MediaProber;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Fraction of the duration at which the still frame is taken.
const SEEK_FRACTION: f64 = 0.25;

/// Extracts a representative still frame from a video file.
#[async_trait]
pub trait ThumbnailDeriver: Send + Sync {
    /// JPEG bytes of the frame.
    async fn derive(&self, video_path: &Path) -> Result<Vec<u8>, ThumbnailError>;
}

/// Seek position for a video lasting `duration` seconds.
pub fn seek_position(duration: f64) -> Result<f64, ThumbnailError> {
    if !duration.is_finite() || duration <= 0.0 {
        return Err(ThumbnailError::ZeroDuration);
    }
    Ok(duration * SEEK_FRACTION)
}

/// [`ThumbnailDeriver`] backed by the ffprobe and ffmpeg executables
#[derive(Debug, Clone)]
pub struct FFmpegThumbnailer {
    ffmpeg_path: String,
    prober: MediaProber,
}

impl FFmpegThumbnailer {
    pub fn new(ffmpeg_path: impl Into<String>, prober: MediaProber) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            prober,
        }
    }

    fn timeout(&self) -> Duration {
        self.prober.timeout()
    }

    #[tracing::instrument(skip(self), fields(
        process.executable.name = "ffmpeg",
        process.executable.path = %self.ffmpeg_path,
        ffmpeg.operation = "thumbnail"
    ))]
    async fn extract_frame(&self, video_path: &Path, at: f64) -> Result<Vec<u8>, ThumbnailError> {
        let seek = format!("{:.3}", at);
        let mut command = Command::new(&self.ffmpeg_path);
        command
            .args(["-v", "error", "-ss", seek.as_str(), "-i"])
            .arg(video_path)
            .args(["-frames:v", "1", "-f", "image2pipe", "-c:v", "mjpeg", "-q:v", "2", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout(), command.output())
            .await
            .map_err(|_| ThumbnailError::Timeout(self.timeout()))?
            .map_err(|e| ThumbnailError::Ffmpeg(format!("Failed to execute ffmpeg: {}", e)))?;

        if !output.status.success() {
            return Err(ThumbnailError::Ffmpeg(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        if output.stdout.is_empty() {
            return Err(ThumbnailError::EmptyOutput(at));
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl ThumbnailDeriver for FFmpegThumbnailer {
    async fn derive(&self, video_path: &Path) -> Result<Vec<u8>, ThumbnailError> {
        let start = std::time::Instant::now();

        let probe = self.prober.probe_video(video_path).await?;
        let duration = probe.duration_secs().ok_or(ThumbnailError::ZeroDuration)?;
        let at = seek_position(duration)?;

        let jpeg = self.extract_frame(video_path, at).await?;

        tracing::info!(
            path = %video_path.display(),
            video_duration = duration,
            seek_secs = at,
            size_bytes = jpeg.len(),
            duration_ms = start.elapsed().as_millis(),
            "Thumbnail extracted"
        );

        Ok(jpeg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seek_position_is_quarter_of_duration() {
        assert_eq!(seek_position(10.0).unwrap(), 2.5);
        assert_eq!(seek_position(0.4).unwrap(), 0.1);
    }

    #[test]
    fn test_seek_position_rejects_empty_video() {
        assert!(matches!(seek_position(0.0), Err(ThumbnailError::ZeroDuration)));
        assert!(matches!(seek_position(f64::NAN), Err(ThumbnailError::ZeroDuration)));
    }

    #[tokio::test]
    async fn test_derive_without_ffprobe_fails() {
        let prober = MediaProber::new("/nonexistent/bin/ffprobe", Duration::from_secs(5));
        let thumbnailer = FFmpegThumbnailer::new("/nonexistent/bin/ffmpeg", prober);

        let result = thumbnailer.derive(Path::new("clip.mp4")).await;
        assert!(matches!(result, Err(ThumbnailError::Probe(_))));
    }
}
