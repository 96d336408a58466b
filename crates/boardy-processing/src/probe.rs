//! ffprobe-backed video inspection and pixel dimensions

use crate::error::ProbeError;
use boardy_core::models::{MediaKind, MediaLayout};
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    nb_frames: Option<String>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// What the thumbnailer needs to know about a video stream
#[derive(Debug, Clone, PartialEq)]
pub struct VideoProbe {
    pub width: u32,
    pub height: u32,
    pub frame_count: Option<u64>,
    pub frame_rate: Option<f64>,
    /// Container or stream duration in seconds, when reported.
    pub reported_duration: Option<f64>,
}

impl VideoProbe {
    /// Parse `ffprobe -of json` output for the first video stream.
    pub fn from_json(json: &[u8]) -> Result<Self, ProbeError> {
        let output: ProbeOutput =
            serde_json::from_slice(json).map_err(|e| ProbeError::Parse(e.to_string()))?;

        let stream = output
            .streams
            .into_iter()
            .next()
            .ok_or(ProbeError::NoVideoStream)?;

        let parse_secs = |s: Option<&String>| {
            s.and_then(|d| d.parse::<f64>().ok())
                .filter(|d| d.is_finite() && *d > 0.0)
        };

        let reported_duration = parse_secs(stream.duration.as_ref())
            .or_else(|| parse_secs(output.format.as_ref().and_then(|f| f.duration.as_ref())));

        Ok(Self {
            width: stream.width.unwrap_or(0),
            height: stream.height.unwrap_or(0),
            frame_count: stream
                .nb_frames
                .as_deref()
                .and_then(|n| n.parse::<u64>().ok())
                .filter(|n| *n > 0),
            frame_rate: stream.r_frame_rate.as_deref().and_then(parse_frame_rate),
            reported_duration,
        })
    }

    /// Duration in seconds: frame count over frame rate when both are known,
    /// otherwise whatever duration ffprobe reported.
    pub fn duration_secs(&self) -> Option<f64> {
        match (self.frame_count, self.frame_rate) {
            (Some(frames), Some(fps)) => Some(frames as f64 / fps),
            _ => self.reported_duration,
        }
    }
}

/// Parse an ffprobe rational such as `30000/1001`.
pub fn parse_frame_rate(rate: &str) -> Option<f64> {
    let (num, den) = rate.split_once('/')?;
    let num: f64 = num.trim().parse().ok()?;
    let den: f64 = den.trim().parse().ok()?;
    if den == 0.0 || num <= 0.0 {
        return None;
    }
    Some(num / den)
}

/// Runs ffprobe with a bounded wait
#[derive(Debug, Clone)]
pub struct MediaProber {
    ffprobe_path: String,
    timeout: Duration,
}

impl MediaProber {
    pub fn new(ffprobe_path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[tracing::instrument(skip(self), fields(
        process.executable.name = "ffprobe",
        process.executable.path = %self.ffprobe_path,
        ffmpeg.operation = "probe"
    ))]
    pub async fn probe_video(&self, path: &Path) -> Result<VideoProbe, ProbeError> {
        let start = std::time::Instant::now();

        let mut command = Command::new(&self.ffprobe_path);
        command
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height,nb_frames,r_frame_rate,duration:format=duration",
                "-of",
                "json",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| ProbeError::Timeout(self.timeout))?
            .map_err(|source| ProbeError::Spawn {
                program: self.ffprobe_path.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ProbeError::Failed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let probe = VideoProbe::from_json(&output.stdout)?;

        tracing::debug!(
            duration_ms = start.elapsed().as_millis(),
            width = probe.width,
            height = probe.height,
            video_duration = ?probe.duration_secs(),
            "Video probe completed"
        );

        Ok(probe)
    }

    /// Pixel width and height of an image or video.
    pub async fn dimensions(&self, path: &Path, kind: MediaKind) -> Result<(u32, u32), ProbeError> {
        match kind {
            MediaKind::Image => {
                let path = path.to_path_buf();
                tokio::task::spawn_blocking(move || image::image_dimensions(&path))
                    .await
                    .map_err(|e| ProbeError::Join(e.to_string()))?
                    .map_err(ProbeError::from)
            }
            MediaKind::Video => {
                let probe = self.probe_video(path).await?;
                Ok((probe.width, probe.height))
            }
        }
    }

    /// Portrait or landscape framing for a stored file.
    pub async fn layout(&self, path: &Path, kind: MediaKind) -> Result<MediaLayout, ProbeError> {
        let (width, height) = self.dimensions(path, kind).await?;
        Ok(MediaLayout::from_dimensions(width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("25/1"), Some(25.0));
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("garbage"), None);
    }

    #[test]
    fn test_probe_prefers_frame_count() {
        let json = br#"{
            "programs": [],
            "streams": [{"width": 1920, "height": 1080, "r_frame_rate": "25/1", "nb_frames": "250", "duration": "9.8"}],
            "format": {"duration": "10.04"}
        }"#;
        let probe = VideoProbe::from_json(json).unwrap();
        assert_eq!((probe.width, probe.height), (1920, 1080));
        assert_eq!(probe.duration_secs(), Some(10.0));
    }

    #[test]
    fn test_probe_falls_back_to_format_duration() {
        // WebM streams carry neither nb_frames nor a stream duration.
        let json = br#"{
            "streams": [{"width": 720, "height": 1280, "r_frame_rate": "30/1"}],
            "format": {"duration": "4.000000"}
        }"#;
        let probe = VideoProbe::from_json(json).unwrap();
        assert_eq!(probe.frame_count, None);
        assert_eq!(probe.duration_secs(), Some(4.0));
    }

    #[test]
    fn test_probe_without_stream_or_duration() {
        assert!(matches!(
            VideoProbe::from_json(br#"{"streams": [], "format": {}}"#),
            Err(ProbeError::NoVideoStream)
        ));

        let probe = VideoProbe::from_json(br#"{"streams": [{"width": 2, "height": 2}]}"#).unwrap();
        assert_eq!(probe.duration_secs(), None);
    }

    #[tokio::test]
    async fn test_image_dimensions_and_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tall.png");
        image::RgbImage::new(3, 5).save(&path).unwrap();

        let prober = MediaProber::new("ffprobe", Duration::from_secs(5));
        assert_eq!(prober.dimensions(&path, MediaKind::Image).await.unwrap(), (3, 5));
        assert_eq!(
            prober.layout(&path, MediaKind::Image).await.unwrap(),
            MediaLayout::Portrait
        );
    }

    #[tokio::test]
    async fn test_missing_ffprobe_is_spawn_error() {
        let prober = MediaProber::new("/nonexistent/bin/ffprobe", Duration::from_secs(5));
        let result = prober.probe_video(Path::new("clip.mp4")).await;
        assert!(matches!(result, Err(ProbeError::Spawn { .. })));
    }
}
