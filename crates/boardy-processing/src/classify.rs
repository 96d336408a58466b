//! Content-signature media classification
//!
//! Files are classified by their magic bytes, never by extension, so a
//! renamed video is still a video.

use boardy_core::MediaKind;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaClass {
    Image,
    Video,
    Other,
}

impl MediaClass {
    /// The catalog kind for storable classes.
    pub fn kind(self) -> Option<MediaKind> {
        match self {
            MediaClass::Image => Some(MediaKind::Image),
            MediaClass::Video => Some(MediaKind::Video),
            MediaClass::Other => None,
        }
    }
}

fn from_type(kind: Option<infer::Type>) -> (MediaClass, Option<&'static str>) {
    match kind {
        Some(t) => {
            let class = match t.matcher_type() {
                infer::MatcherType::Image => MediaClass::Image,
                infer::MatcherType::Video => MediaClass::Video,
                _ => MediaClass::Other,
            };
            (class, Some(t.extension()))
        }
        None => (MediaClass::Other, None),
    }
}

/// Classify a buffer. Also returns the sniffed extension (without dot), if any.
pub fn classify_bytes(data: &[u8]) -> (MediaClass, Option<&'static str>) {
    from_type(infer::get(data))
}

/// Classify a file by reading its leading bytes.
pub async fn classify_path(path: &Path) -> std::io::Result<(MediaClass, Option<&'static str>)> {
    let path = path.to_path_buf();
    let kind = tokio::task::spawn_blocking(move || infer::get_from_path(&path))
        .await
        .map_err(std::io::Error::other)??;
    Ok(from_type(kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const MP4_HEADER: &[u8] = b"\0\0\0\x18ftypisom\0\0\x02\0isomiso2";

    #[test]
    fn test_classify_bytes() {
        assert_eq!(classify_bytes(PNG_HEADER), (MediaClass::Image, Some("png")));
        assert_eq!(classify_bytes(b"GIF89a\x01\0\x01\0").0, MediaClass::Image);
        assert_eq!(classify_bytes(MP4_HEADER).0, MediaClass::Video);
        assert_eq!(classify_bytes(b"just some text"), (MediaClass::Other, None));
    }

    #[tokio::test]
    async fn test_classify_path_ignores_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("holiday.txt");
        std::fs::write(&path, MP4_HEADER).unwrap();

        let (class, _) = classify_path(&path).await.unwrap();
        assert_eq!(class, MediaClass::Video);
        assert_eq!(class.kind(), Some(MediaKind::Video));
        assert_eq!(MediaClass::Other.kind(), None);
    }
}
